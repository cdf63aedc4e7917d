// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Consolidation and verification engine for per-item archives.
//!
//! Three sequential passes over the ingestion store: the index builder packs
//! contiguous item runs into size-bounded chunk manifests, the consolidator
//! merges each chunk's single-item archives into one deduplicated archive,
//! and the verifier replays the whole chain backward, proving that every
//! item's canonical bytes are still derivable from the consolidated archives.

mod config;
mod consolidate;
mod errors;
mod index;
mod verify;

pub use config::*;
pub use consolidate::*;
pub use errors::*;
pub use index::*;
pub use verify::*;
