// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use chainpack_chunk::{ChunkConfig, DEFAULT_TARGET_SIZE};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Root of the per-item dump (`blocks/`, `index/`) and the `chunks/`
    /// output tree.
    pub data_dir: PathBuf,
    /// Target size of one consolidated archive file, in bytes.
    pub target_chunk_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            target_chunk_size: DEFAULT_TARGET_SIZE,
        }
    }
}

impl Config {
    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig::new(&self.data_dir, self.target_chunk_size)
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "ChainSafe", "chainpack")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpack_utils::io::read_toml;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = read_toml("data_dir = \"/mnt/dump\"\n").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/mnt/dump"));
        assert_eq!(config.target_chunk_size, DEFAULT_TARGET_SIZE);
    }

    #[test]
    fn chunk_dirs_hang_off_data_dir() {
        let config: Config =
            read_toml("data_dir = \"/mnt/dump\"\ntarget_chunk_size = 4096\n").unwrap();
        let chunk = config.chunk_config();
        assert_eq!(chunk.index_dir, PathBuf::from("/mnt/dump/chunks/index"));
        assert_eq!(chunk.car_dir, PathBuf::from("/mnt/dump/chunks/car"));
        assert_eq!(chunk.target_size, 4096);
    }
}
