// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Reads a file into a string, mapping a missing file to a friendlier error.
pub fn read_file_to_string(path: &Path) -> Result<String, io::Error> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => io::Error::new(
            io::ErrorKind::NotFound,
            format!("file {} does not exist", path.display()),
        ),
        _ => e,
    })?;
    let mut string = String::new();
    file.read_to_string(&mut string)?;
    Ok(string)
}

/// Parses TOML from a string slice into the target type.
pub fn read_toml<T>(toml_string: &str) -> Result<T, io::Error>
where
    T: DeserializeOwned,
{
    let toml = toml::from_str(toml_string)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(toml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, PartialEq, Eq, Debug)]
    struct DummyConfig {
        path: String,
        limit: u64,
    }

    #[test]
    fn toml_round_trip() {
        let config: DummyConfig = read_toml("path = \"/tmp/out\"\nlimit = 42\n").unwrap();
        assert_eq!(
            config,
            DummyConfig {
                path: "/tmp/out".into(),
                limit: 42
            }
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = read_file_to_string(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
