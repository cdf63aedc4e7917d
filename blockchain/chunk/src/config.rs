// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use chainpack_car::SINGLE_ROOT_HEADER_LEN;
use std::path::{Path, PathBuf};

/// Upper bound on a consolidated archive file, header included.
pub const DEFAULT_TARGET_SIZE: u64 = 1010 * 1024 * 1024;

/// Where chunk artifacts live and how large they may grow.
#[derive(Clone, Debug)]
pub struct ChunkConfig {
    /// Directory holding chunk manifests (`<first>-<last>.json`).
    pub index_dir: PathBuf,
    /// Directory holding consolidated archives (`<first>-<last>.car`).
    pub car_dir: PathBuf,
    /// Target size of one consolidated archive file.
    pub target_size: u64,
}

impl ChunkConfig {
    pub fn new(data_dir: &Path, target_size: u64) -> Self {
        Self {
            index_dir: data_dir.join("chunks").join("index"),
            car_dir: data_dir.join("chunks").join("car"),
            target_size,
        }
    }

    /// Payload budget per chunk: the target size less the archive header.
    pub fn budget(&self) -> u64 {
        self.target_size.saturating_sub(SINGLE_ROOT_HEADER_LEN)
    }
}
