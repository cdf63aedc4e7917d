// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Content-addressed item encoding.
//!
//! An item is stored as a small DAG: one DAG-CBOR header node linking to the
//! previous item and to an ordered run of raw payload segments. The item's
//! content hash is the digest of the encoded header node, so the header CID
//! and the item identity are the same value.

use crate::{hash_to_cid, Error, ItemHash, RAW};
use async_trait::async_trait;
use cid::Cid;
use fvm_ipld_encoding::{from_slice, to_vec};
use multihash::{Code, MultihashDigest};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum payload bytes carried by one raw segment node.
pub const SEGMENT_SIZE: usize = 256 * 1024;

/// Root node of an item's DAG.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemHeader {
    /// Header CID of the preceding item; `None` only for the genesis item.
    pub parent: Option<Cid>,
    /// Segment CIDs, in canonical binary order.
    pub payload: Vec<Cid>,
    /// Structured form of the item, already normalized.
    pub meta: serde_json::Value,
}

/// Encodes an item into its node set: the header node first, then each
/// distinct payload segment in order. Returns the item's content hash
/// alongside the `(cid, bytes)` pairs ready to be archived.
pub fn encode_item(
    binary: &[u8],
    parent: Option<Cid>,
    meta: serde_json::Value,
) -> Result<(ItemHash, Vec<(Cid, Vec<u8>)>), Error> {
    let mut payload = Vec::new();
    let mut segments = Vec::new();
    for segment in binary.chunks(SEGMENT_SIZE) {
        let cid = Cid::new_v1(RAW, Code::Blake2b256.digest(segment));
        payload.push(cid);
        segments.push((cid, segment.to_vec()));
    }

    let header = ItemHeader {
        parent,
        payload,
        meta,
    };
    let header_bytes = to_vec(&header)?;
    let hash = ItemHash::digest(&header_bytes);

    let mut nodes = Vec::with_capacity(segments.len() + 1);
    nodes.push((hash_to_cid(&hash), header_bytes));
    let mut seen: HashSet<Cid> = HashSet::new();
    for (cid, bytes) in segments {
        // an item may carry repeated segments; the node set stores each once
        if seen.insert(cid) {
            nodes.push((cid, bytes));
        }
    }
    Ok((hash, nodes))
}

/// Decodes a header node.
pub fn decode_header(bytes: &[u8]) -> Result<ItemHeader, Error> {
    Ok(from_slice(bytes)?)
}

/// Node lookup backing [`reconstruct`]; returns `None` when the source does
/// not hold the requested node.
#[async_trait]
pub trait NodeFetch {
    async fn fetch(&mut self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Re-derives an item's canonical binary form from its DAG: fetches the
/// header at `root`, then concatenates its payload segments in declared
/// order. Pure over the supplied fetch.
pub async fn reconstruct<F>(root: &Cid, fetch: &mut F) -> Result<Vec<u8>, Error>
where
    F: NodeFetch + Send,
{
    let header_bytes = fetch
        .fetch(root)
        .await?
        .ok_or(Error::MissingNode(*root))?;
    let header = decode_header(&header_bytes)?;

    let mut binary = Vec::new();
    for cid in &header.payload {
        let segment = fetch.fetch(cid).await?.ok_or(Error::MissingNode(*cid))?;
        binary.extend_from_slice(&segment);
    }
    Ok(binary)
}
