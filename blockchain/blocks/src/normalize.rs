// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde_json::Value;

/// Fields stripped by [`normalize`], version 1 of the canonicalization.
///
/// These are chain-context values the source node recomputes over time
/// (confirmation depth, cumulative work, forward links), so two honest dumps
/// of the same item can disagree on them.
pub const NORMALIZE_V1_STRIP_FIELDS: &[&str] = &[
    "confirmations",
    "chainwork",
    "height",
    "mediantime",
    "nextblockhash",
];

/// Canonicalizes a structured item form for comparison: strips the
/// [`NORMALIZE_V1_STRIP_FIELDS`] and rounds the calculated `difficulty`
/// field to 2 decimal places. Must be applied to both sides of any
/// structured-form equality check. Idempotent.
pub fn normalize(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        for field in NORMALIZE_V1_STRIP_FIELDS {
            map.remove(*field);
        }
        if let Some(difficulty) = map.get_mut("difficulty") {
            if let Some(d) = difficulty.as_f64() {
                if let Some(rounded) = serde_json::Number::from_f64((d * 100.0).round() / 100.0) {
                    *difficulty = Value::Number(rounded);
                }
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_volatile_fields() {
        let raw = json!({
            "hash": "00f0",
            "confirmations": 12,
            "chainwork": "0e11",
            "height": 170,
            "mediantime": 1231469665,
            "nextblockhash": "00f1",
            "time": 1231469665,
        });
        assert_eq!(
            normalize(raw),
            json!({ "hash": "00f0", "time": 1231469665 })
        );
    }

    #[test]
    fn rounds_difficulty() {
        let raw = json!({ "difficulty": 14484.162361 });
        assert_eq!(normalize(raw), json!({ "difficulty": 14484.16 }));
    }

    #[test]
    fn idempotent() {
        let raw = json!({ "difficulty": 3.14159, "height": 9, "nonce": 2083236893 });
        let once = normalize(raw);
        assert_eq!(normalize(once.clone()), once);
    }

    #[test]
    fn non_object_passes_through() {
        assert_eq!(normalize(Value::Null), Value::Null);
        assert_eq!(normalize(json!([1, 2])), json!([1, 2]));
    }
}
