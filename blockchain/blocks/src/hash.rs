// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use cid::Cid;
use multihash::{Code, Multihash, MultihashDigest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multicodec for DAG-CBOR nodes.
pub use fvm_ipld_encoding::DAG_CBOR;
/// Multicodec for raw byte nodes.
pub const RAW: u64 = 0x55;

const DIGEST_LEN: usize = 32;

/// Blake2b-256 content digest of an item's header node. Doubles as the item's
/// globally unique identity; rendered as 64 lowercase hex characters.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ItemHash(#[serde(with = "hex")] pub [u8; DIGEST_LEN]);

impl ItemHash {
    /// Digests arbitrary bytes into an item hash.
    pub fn digest(bytes: &[u8]) -> Self {
        let mh = Code::Blake2b256.digest(bytes);
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(mh.digest());
        ItemHash(digest)
    }
}

impl fmt::Display for ItemHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ItemHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemHash({self})")
    }
}

impl FromStr for ItemHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_LEN * 2 {
            return Err(Error::InvalidHash(format!(
                "expected {} hex characters, got {}",
                DIGEST_LEN * 2,
                s.len()
            )));
        }
        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut digest).map_err(|e| Error::InvalidHash(e.to_string()))?;
        Ok(ItemHash(digest))
    }
}

/// Maps an item hash to the CID addressing its header node. The digest is
/// carried verbatim, so the mapping is injective and reversible.
pub fn hash_to_cid(hash: &ItemHash) -> Cid {
    let mh = Multihash::wrap(Code::Blake2b256.into(), &hash.0)
        .expect("32-byte digest always fits a multihash");
    Cid::new_v1(DAG_CBOR, mh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let hash = ItemHash::digest(b"genesis");
        let parsed: ItemHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
        assert_eq!(hash.to_string().len(), 64);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("deadbeef".parse::<ItemHash>().is_err());
        assert!("zz".repeat(32).parse::<ItemHash>().is_err());
    }

    #[test]
    fn serde_as_hex_string() {
        let hash = ItemHash::digest(b"genesis");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let back: ItemHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn cid_carries_digest() {
        let hash = ItemHash::digest(b"genesis");
        let cid = hash_to_cid(&hash);
        assert_eq!(cid.codec(), DAG_CBOR);
        assert_eq!(cid.hash().digest(), &hash.0);
        assert_eq!(hash_to_cid(&hash), cid);
    }
}
