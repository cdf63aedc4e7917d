// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Car(#[from] chainpack_car::Error),
    #[error("Store error: {0}")]
    Store(#[from] chainpack_store::Error),
    #[error("Codec error: {0}")]
    Codec(#[from] chainpack_blocks::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Item #{index} alone is {size} bytes, over the {budget} byte chunk budget")]
    ItemOverBudget { index: u64, size: u64, budget: u64 },
    #[error("Archive for item #{index} is {size} bytes, smaller than a CAR header")]
    UndersizedArchive { index: u64, size: u64 },
    #[error("Manifest {} is empty or out of order", path.display())]
    CorruptManifest { path: PathBuf },
    #[error("Archive of item #{index} declares roots {found:?}, expected [{expected}]")]
    ArchiveRootMismatch {
        index: u64,
        expected: Cid,
        found: Vec<Cid>,
    },
    #[error("Chunk {chunk} declares roots {found:?}, expected [{expected}]")]
    ChunkRootMismatch {
        chunk: String,
        expected: Cid,
        found: Vec<Cid>,
    },
    #[error("Chain break at item #{index}: expected root {expected}, found {found}")]
    ContinuityBreak {
        index: u64,
        expected: Cid,
        found: Cid,
    },
    #[error("Node {cid} of item #{index} is not in its chunk archive")]
    MissingNode { index: u64, cid: Cid },
    #[error("Genesis item #{index} carries a parent reference")]
    UnexpectedParent { index: u64 },
    #[error("Item #{index} lacks a parent reference")]
    MissingParent { index: u64 },
    #[error("Structured form of item #{index} does not match its archived header")]
    StructuredMismatch { index: u64 },
    #[error("Reconstructed binary of item #{index} differs from the canonical form")]
    BinaryMismatch { index: u64 },
    #[error("No consolidated archives found")]
    NoChunks,
    #[error("No consolidated archive covers item #{index}")]
    MissingChunk { index: u64 },
}
