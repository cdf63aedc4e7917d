// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Codec error: {0}")]
    Codec(#[from] chainpack_blocks::Error),
    #[error("Archive error: {0}")]
    Car(#[from] chainpack_car::Error),
    #[error("Item #{index} is not in the store")]
    UnknownItem { index: u64 },
    #[error("Store file {} is missing", path.display())]
    MissingFile { path: PathBuf },
}
