// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid item hash: {0}")]
    InvalidHash(String),
    #[error("Cbor encoding error: {0}")]
    Cbor(#[from] fvm_ipld_encoding::Error),
    #[error("Node {0} not found")]
    MissingNode(Cid),
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}
