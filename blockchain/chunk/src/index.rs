// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChunkConfig, Error};
use async_std::fs;
use chainpack_blocks::ItemHash;
use chainpack_car::SINGLE_ROOT_HEADER_LEN;
use chainpack_store::ItemStore;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One item's footprint inside a chunk manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: u64,
    pub hash: ItemHash,
    /// Single-item archive size with the fixed CAR header overhead removed.
    pub size: u64,
    /// Canonical binary size, kept for operator reporting only.
    pub original_size: u64,
}

/// Ordered run of items packed into one chunk. Entries are never empty and
/// are index-contiguous ascending; the manifest file is the JSON entry list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkManifest {
    pub entries: Vec<ManifestEntry>,
}

impl ChunkManifest {
    pub fn first(&self) -> &ManifestEntry {
        &self.entries[0]
    }

    pub fn last(&self) -> &ManifestEntry {
        &self.entries[self.entries.len() - 1]
    }

    /// Zero-padded `first-last` span, so lexicographic file order is numeric
    /// chain order.
    pub fn name(&self) -> String {
        format!("{:07}-{:07}", self.first().index, self.last().index)
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.name())
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn total_original_size(&self) -> u64 {
        self.entries.iter().map(|e| e.original_size).sum()
    }
}

/// Greedy bin-packing fold. Feed entries in ascending index order; a
/// completed manifest falls out whenever the next entry would overflow the
/// budget, and [`ChunkAccumulator::finish`] yields the remainder.
pub struct ChunkAccumulator {
    budget: u64,
    entries: Vec<ManifestEntry>,
    size: u64,
}

impl ChunkAccumulator {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            entries: Vec::new(),
            size: 0,
        }
    }

    /// Appends one entry, first flushing the pending manifest if the entry
    /// would push it over budget. An entry that cannot fit in any chunk on
    /// its own is a fatal configuration error.
    pub fn push(&mut self, entry: ManifestEntry) -> Result<Option<ChunkManifest>, Error> {
        if entry.size > self.budget {
            return Err(Error::ItemOverBudget {
                index: entry.index,
                size: entry.size,
                budget: self.budget,
            });
        }
        let flushed = if self.size + entry.size > self.budget {
            self.flush()
        } else {
            None
        };
        self.size += entry.size;
        self.entries.push(entry);
        Ok(flushed)
    }

    /// Flushes whatever remains, possibly well under budget.
    pub fn finish(mut self) -> Option<ChunkManifest> {
        self.flush()
    }

    fn flush(&mut self) -> Option<ChunkManifest> {
        if self.entries.is_empty() {
            return None;
        }
        self.size = 0;
        Some(ChunkManifest {
            entries: std::mem::take(&mut self.entries),
        })
    }
}

/// Packs items `[start, start + count)` into chunk manifests and persists
/// each one as it completes. Returns the written manifest paths.
pub async fn build_index(
    store: &ItemStore,
    cfg: &ChunkConfig,
    start: u64,
    count: u64,
) -> Result<Vec<PathBuf>, Error> {
    fs::create_dir_all(&cfg.index_dir).await?;

    let mut acc = ChunkAccumulator::new(cfg.budget());
    let mut written = Vec::new();
    for index in start..start + count {
        let item = store.lookup(index).await?;
        let car_size = fs::metadata(&item.car_path).await?.len();
        if car_size < SINGLE_ROOT_HEADER_LEN {
            return Err(Error::UndersizedArchive {
                index,
                size: car_size,
            });
        }
        let entry = ManifestEntry {
            index,
            hash: item.hash,
            size: car_size - SINGLE_ROOT_HEADER_LEN,
            original_size: fs::metadata(&item.bin_path).await?.len(),
        };
        if let Some(manifest) = acc.push(entry)? {
            written.push(write_manifest(&cfg.index_dir, &manifest).await?);
        }
    }
    if let Some(manifest) = acc.finish() {
        written.push(write_manifest(&cfg.index_dir, &manifest).await?);
    }
    Ok(written)
}

/// Loads a manifest file, rejecting empty or non-contiguous entry lists.
pub async fn read_manifest(path: &Path) -> Result<ChunkManifest, Error> {
    let manifest: ChunkManifest = serde_json::from_slice(&fs::read(path).await?)?;
    let contiguous = manifest
        .entries
        .windows(2)
        .all(|pair| pair[1].index == pair[0].index + 1);
    if manifest.entries.is_empty() || !contiguous {
        return Err(Error::CorruptManifest {
            path: path.to_path_buf(),
        });
    }
    Ok(manifest)
}

async fn write_manifest(dir: &Path, manifest: &ChunkManifest) -> Result<PathBuf, Error> {
    let path = dir.join(manifest.file_name());
    let tmp_path = dir.join(format!("{}.json.tmp", manifest.name()));
    if let Err(e) = fs::write(&tmp_path, serde_json::to_vec_pretty(manifest)?).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    fs::rename(&tmp_path, &path).await?;
    info!(
        "{} with {} items @ {} vs raw {}",
        manifest.name(),
        manifest.entries.len(),
        size_str(manifest.total_size()),
        size_str(manifest.total_original_size()),
    );
    Ok(path)
}

fn size_str(size: u64) -> String {
    format!("{:.2} MiB", size as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn entry(index: u64, size: u64) -> ManifestEntry {
        ManifestEntry {
            index,
            hash: ItemHash::digest(&index.to_be_bytes()),
            size,
            original_size: size * 2,
        }
    }

    fn pack(budget: u64, sizes: &[u64]) -> Vec<ChunkManifest> {
        let mut acc = ChunkAccumulator::new(budget);
        let mut manifests = Vec::new();
        for (index, size) in sizes.iter().enumerate() {
            if let Some(manifest) = acc.push(entry(index as u64, *size)).unwrap() {
                manifests.push(manifest);
            }
        }
        manifests.extend(acc.finish());
        manifests
    }

    #[test]
    fn packs_three_items_into_two_chunks() {
        let mb = 1024 * 1024;
        let manifests = pack(900 * mb, &[400 * mb, 400 * mb, 400 * mb]);
        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].name(), "0000000-0000001");
        assert_eq!(manifests[0].total_size(), 800 * mb);
        assert_eq!(manifests[1].name(), "0000002-0000002");
        assert_eq!(manifests[1].total_size(), 400 * mb);
    }

    #[test]
    fn exact_budget_fit_is_not_split() {
        let manifests = pack(900, &[900]);
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].total_size(), 900);
    }

    #[test]
    fn exact_fill_then_overflow() {
        let manifests = pack(900, &[500, 400, 200]);
        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].total_size(), 900);
        assert_eq!(manifests[1].entries.len(), 1);
    }

    #[test]
    fn oversized_item_is_fatal() {
        let mut acc = ChunkAccumulator::new(900);
        assert!(matches!(
            acc.push(entry(0, 901)),
            Err(Error::ItemOverBudget {
                index: 0,
                size: 901,
                budget: 900
            })
        ));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(pack(900, &[]).is_empty());
    }

    #[test]
    fn name_is_zero_padded() {
        let manifests = pack(100, &[10; 13]);
        assert_eq!(manifests[0].name(), "0000000-0000009");
        assert_eq!(manifests[1].name(), "0000010-0000012");
    }

    #[quickcheck]
    fn packing_laws(raw_sizes: Vec<u8>) -> bool {
        let budget = 100u64;
        let sizes: Vec<u64> = raw_sizes.iter().map(|s| u64::from(*s) % budget + 1).collect();
        let manifests = pack(budget, &sizes);

        // every chunk respects the budget
        let bounded = manifests.iter().all(|m| m.total_size() <= budget);
        // concatenating all chunks reproduces the input range exactly
        let indices: Vec<u64> = manifests
            .iter()
            .flat_map(|m| m.entries.iter().map(|e| e.index))
            .collect();
        let covering = indices == (0..sizes.len() as u64).collect::<Vec<_>>();
        bounded && covering
    }
}
