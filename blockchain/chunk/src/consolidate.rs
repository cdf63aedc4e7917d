// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{read_manifest, ChunkConfig, ChunkManifest, Error};
use async_std::fs::{self, File};
use async_std::io::{BufReader, BufWriter};
use chainpack_blocks::hash_to_cid;
use chainpack_car::{CarReader, CarWriter};
use chainpack_store::ItemStore;
use cid::Cid;
use futures::StreamExt;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

static MANIFEST_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+-\d+\.json$").expect("manifest name regex"));

/// Outcome of one chunk merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeReport {
    /// Distinct blocks written to the consolidated archive.
    pub blocks: u64,
    /// Blocks skipped because an identical CID was already written.
    pub duplicates: u64,
}

/// Merges chunk manifests into consolidated archives, selecting every
/// `step`-th manifest from offset `start` in name order. Chunks whose
/// archive already exists are skipped, so an interrupted run resumes by
/// re-running the same selection.
pub async fn consolidate(
    store: &ItemStore,
    cfg: &ChunkConfig,
    start: usize,
    step: usize,
) -> Result<(), Error> {
    fs::create_dir_all(&cfg.car_dir).await?;

    let mut names = Vec::new();
    let mut entries = fs::read_dir(&cfg.index_dir).await?;
    while let Some(entry) = entries.next().await {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if MANIFEST_NAME_RE.is_match(&name) {
            names.push(name);
        }
    }
    names.sort();

    for (num, name) in names.iter().enumerate().skip(start).step_by(step.max(1)) {
        let manifest = read_manifest(&cfg.index_dir.join(name)).await?;
        let out_path = cfg.car_dir.join(format!("{}.car", manifest.name()));
        if fs::metadata(&out_path).await.is_ok() {
            info!("chunk #{num} {} already consolidated, skipped", manifest.name());
            continue;
        }
        info!("consolidating chunk #{num} into {}", out_path.display());
        let report = consolidate_chunk(store, &manifest, &out_path).await?;
        info!(
            "{}: {} blocks, {} duplicates",
            manifest.name(),
            report.blocks,
            report.duplicates
        );
    }
    Ok(())
}

/// Merges one manifest's single-item archives into `out_path`. The output is
/// staged as a `.tmp` sibling and renamed into place only after a complete,
/// successful pass; a failed merge leaves nothing at the final path.
pub async fn consolidate_chunk(
    store: &ItemStore,
    manifest: &ChunkManifest,
    out_path: &Path,
) -> Result<MergeReport, Error> {
    let tmp_path = out_path.with_extension("car.tmp");
    match merge_into(store, manifest, &tmp_path).await {
        Ok(report) => {
            fs::rename(&tmp_path, out_path).await?;
            Ok(report)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path).await;
            Err(e)
        }
    }
}

async fn merge_into(
    store: &ItemStore,
    manifest: &ChunkManifest,
    tmp_path: &Path,
) -> Result<MergeReport, Error> {
    // The newest item references only ancestors, so walking newest-first
    // lands the widest node set before any older, mostly-shared ones.
    let root = hash_to_cid(&manifest.last().hash);
    let out = File::create(tmp_path).await?;
    let mut writer = CarWriter::new(BufWriter::new(out), vec![root]).await?;

    let mut seen: HashSet<Cid> = HashSet::new();
    let mut duplicates: u64 = 0;
    for entry in manifest.entries.iter().rev() {
        let expected = hash_to_cid(&entry.hash);
        let source = File::open(store.single_car_path(&entry.hash)).await?;
        let mut reader = CarReader::new(BufReader::new(source)).await?;
        if reader.header.roots != [expected] {
            return Err(Error::ArchiveRootMismatch {
                index: entry.index,
                expected,
                found: reader.header.roots,
            });
        }
        while let Some(block) = reader.next_block().await? {
            if seen.contains(&block.cid) {
                duplicates += 1;
                continue;
            }
            writer.write(&block.cid, &block.data).await?;
            seen.insert(block.cid);
        }
        // source archive closes here; only one is ever open
    }
    writer.flush().await?;
    Ok(MergeReport {
        blocks: seen.len() as u64,
        duplicates,
    })
}
