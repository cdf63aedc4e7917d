// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Read-mostly access to the ingestion store: one `.bin`/`.json`/`.car` file
//! triple per item, sharded by hash suffix, plus `index/<n>/<i>.json` pointer
//! files resolving item indices to hashes. Items are published atomically and
//! never mutated afterwards.

mod errors;

use async_std::fs::{self, File};
use async_std::io::BufWriter;
use chainpack_blocks::{encode_item, hash_to_cid, normalize, ItemHash};
use chainpack_car::CarWriter;
use cid::Cid;
pub use errors::*;
use futures::StreamExt;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Items per index shard directory.
const INDEX_SHARD_SPAN: u64 = 1000;

/// One published item, resolved to its on-disk files.
#[derive(Clone, Debug)]
pub struct ItemEntry {
    pub index: u64,
    pub hash: ItemHash,
    pub bin_path: PathBuf,
    pub json_path: PathBuf,
    pub car_path: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct IndexPointer {
    hash: ItemHash,
}

pub struct ItemStore {
    data_dir: PathBuf,
}

impl ItemStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Shard directory for a hash: `blocks/<chars 62..>/<chars 60..62>`.
    pub fn hash_dir(&self, hash: &ItemHash) -> PathBuf {
        let hex = hash.to_string();
        self.data_dir
            .join("blocks")
            .join(&hex[62..])
            .join(&hex[60..62])
    }

    /// Path of an item's single-item archive, derived from its hash alone.
    pub fn single_car_path(&self, hash: &ItemHash) -> PathBuf {
        self.hash_dir(hash).join(format!("{hash}.car"))
    }

    fn index_file(&self, index: u64) -> PathBuf {
        self.data_dir
            .join("index")
            .join((index / INDEX_SHARD_SPAN).to_string())
            .join(format!("{index}.json"))
    }

    /// Resolves an item index to its files. Every referenced file must be
    /// present; a half-published item is an error, never skipped.
    pub async fn lookup(&self, index: u64) -> Result<ItemEntry, Error> {
        let pointer_path = self.index_file(index);
        let pointer = match fs::read(&pointer_path).await {
            Ok(bytes) => serde_json::from_slice::<IndexPointer>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::UnknownItem { index })
            }
            Err(e) => return Err(e.into()),
        };

        let dir = self.hash_dir(&pointer.hash);
        let entry = ItemEntry {
            index,
            hash: pointer.hash,
            bin_path: dir.join(format!("{}.bin", pointer.hash)),
            json_path: dir.join(format!("{}.json", pointer.hash)),
            car_path: dir.join(format!("{}.car", pointer.hash)),
        };
        for path in [&entry.bin_path, &entry.json_path, &entry.car_path] {
            if fs::metadata(path).await.is_err() {
                return Err(Error::MissingFile { path: path.clone() });
            }
        }
        Ok(entry)
    }

    /// Canonical binary form of an item.
    pub async fn read_binary(&self, entry: &ItemEntry) -> Result<Vec<u8>, Error> {
        Ok(fs::read(&entry.bin_path).await?)
    }

    /// Canonical structured form of an item, as the source node reported it.
    pub async fn read_structured(&self, entry: &ItemEntry) -> Result<Value, Error> {
        Ok(serde_json::from_slice(&fs::read(&entry.json_path).await?)?)
    }

    /// Highest published item index, or `None` for an empty store.
    pub async fn best_index(&self) -> Result<Option<u64>, Error> {
        let index_dir = self.data_dir.join("index");
        let best_shard = match max_numeric_entry(&index_dir).await? {
            Some(shard) => shard,
            None => return Ok(None),
        };
        max_numeric_entry(&index_dir.join(best_shard.to_string())).await
    }

    /// Publishes one item: encodes it, writes the `.bin`/`.json` pair, writes
    /// the single-item archive to a dot-prefixed temp name and renames it into
    /// place, and finally records the index pointer. The pointer write is the
    /// commit point; re-publishing an already-archived item skips the encode
    /// output entirely.
    pub async fn publish(
        &self,
        index: u64,
        parent: Option<Cid>,
        meta: Value,
        binary: &[u8],
    ) -> Result<ItemHash, Error> {
        let (hash, nodes) = encode_item(binary, parent, normalize(meta.clone()))?;

        let dir = self.hash_dir(&hash);
        fs::create_dir_all(&dir).await?;
        let car_path = dir.join(format!("{hash}.car"));
        if fs::metadata(&car_path).await.is_ok() {
            debug!("item #{index} already archived as {hash}, skipped");
        } else {
            fs::write(dir.join(format!("{hash}.bin")), binary).await?;
            fs::write(
                dir.join(format!("{hash}.json")),
                serde_json::to_vec_pretty(&meta)?,
            )
            .await?;

            let tmp_path = dir.join(format!(".{hash}.car"));
            if let Err(e) = write_single_car(&tmp_path, &hash, &nodes).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(e);
            }
            fs::rename(&tmp_path, &car_path).await?;
        }

        let pointer_path = self.index_file(index);
        if let Some(shard_dir) = pointer_path.parent() {
            fs::create_dir_all(shard_dir).await?;
        }
        fs::write(
            &pointer_path,
            serde_json::to_vec_pretty(&IndexPointer { hash })?,
        )
        .await?;
        Ok(hash)
    }
}

async fn write_single_car(
    path: &Path,
    hash: &ItemHash,
    nodes: &[(Cid, Vec<u8>)],
) -> Result<(), Error> {
    let file = File::create(path).await?;
    let mut writer = CarWriter::new(BufWriter::new(file), vec![hash_to_cid(hash)]).await?;
    for (cid, bytes) in nodes {
        writer.write(cid, bytes).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Greatest directory entry whose name (file stem) parses as a number, like
/// the original dump layout's zero-pad-and-sort scan.
async fn max_numeric_entry(dir: &Path) -> Result<Option<u64>, Error> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut max = None;
    while let Some(entry) = entries.next().await {
        let path = entry?.path();
        let stem = path.file_stem().and_then(|s| s.to_str());
        if let Some(value) = stem.and_then(|s| s.parse::<u64>().ok()) {
            max = Some(max.map_or(value, |m: u64| m.max(value)));
        }
    }
    Ok(max)
}
