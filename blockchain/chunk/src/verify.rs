// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChunkConfig, Error};
use async_std::fs::{self, File};
use async_trait::async_trait;
use chainpack_blocks::{decode_header, hash_to_cid, normalize, reconstruct, NodeFetch};
use chainpack_car::CarIndexedReader;
use chainpack_store::ItemStore;
use cid::Cid;
use futures::{AsyncRead, AsyncSeek, StreamExt};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static CHUNK_CAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)-(\d+)\.car$").expect("chunk archive name regex"));

/// One consolidated archive on disk, parsed from its `first-last` file name.
#[derive(Clone, Debug)]
pub struct ChunkFile {
    pub start: u64,
    pub end: u64,
    pub path: PathBuf,
}

impl ChunkFile {
    fn name(&self) -> String {
        format!("{:07}-{:07}", self.start, self.end)
    }
}

/// Lists consolidated archives in ascending chain order; files that do not
/// follow the chunk naming scheme are ignored.
pub async fn ls_chunks(car_dir: &Path) -> Result<Vec<ChunkFile>, Error> {
    let mut entries = match fs::read_dir(car_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut chunks = Vec::new();
    while let Some(entry) = entries.next().await {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if let Some(captures) = CHUNK_CAR_RE.captures(&name) {
            let (start, end) = (captures[1].parse(), captures[2].parse());
            if let (Ok(start), Ok(end)) = (start, end) {
                chunks.push(ChunkFile {
                    start,
                    end,
                    path: car_dir.join(&name),
                });
            }
        }
    }
    chunks.sort_by_key(|c| c.start);
    Ok(chunks)
}

/// Verification summary: how much of the chain was proven.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyReport {
    pub items: u64,
    pub chunks: u64,
}

struct ArchiveFetch<'a, R>(&'a mut CarIndexedReader<R>);

#[async_trait]
impl<R> NodeFetch for ArchiveFetch<'_, R>
where
    R: AsyncRead + AsyncSeek + Send + Unpin,
{
    async fn fetch(&mut self, cid: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.0.get(cid).await?)
    }
}

/// Proves that every item from `start` (default: the newest consolidated
/// item) down to genesis is byte-exactly reconstructible from the chain of
/// consolidated archives, and that the archives form one correctly rooted,
/// unbroken sequence. Aborts on the first mismatch; never repairs.
pub async fn verify(
    store: &ItemStore,
    cfg: &ChunkConfig,
    start: Option<u64>,
) -> Result<VerifyReport, Error> {
    let chunks = ls_chunks(&cfg.car_dir).await?;
    let newest_end = chunks.last().ok_or(Error::NoChunks)?.end;
    let start = start.unwrap_or(newest_end);
    info!("verifying chain from item #{start}");

    let selected: Vec<&ChunkFile> = chunks.iter().filter(|c| c.start <= start).collect();
    if selected.is_empty() {
        return Err(Error::MissingChunk { index: start });
    }

    let mut expected_root = hash_to_cid(&store.lookup(start).await?.hash);
    let mut cursor = start;
    let mut items: u64 = 0;
    let mut reached_genesis = false;

    for chunk in selected.iter().rev() {
        info!("loading chunk archive {}", chunk.path.display());
        let source = File::open(&chunk.path).await?;
        let mut reader = CarIndexedReader::new(source).await?;

        let declared = hash_to_cid(&store.lookup(chunk.end).await?.hash);
        if reader.roots() != [declared] {
            return Err(Error::ChunkRootMismatch {
                chunk: chunk.name(),
                expected: declared,
                found: reader.roots().to_vec(),
            });
        }

        cursor = cursor.min(chunk.end);
        loop {
            let entry = store.lookup(cursor).await?;
            let root = hash_to_cid(&entry.hash);
            if root != expected_root {
                return Err(Error::ContinuityBreak {
                    index: cursor,
                    expected: expected_root,
                    found: root,
                });
            }

            let header_bytes = reader.get(&root).await?.ok_or(Error::MissingNode {
                index: cursor,
                cid: root,
            })?;
            let header = decode_header(&header_bytes)?;

            // structured forms must agree once both are canonicalized
            let supplied = normalize(store.read_structured(&entry).await?);
            if supplied != normalize(header.meta.clone()) {
                return Err(Error::StructuredMismatch { index: cursor });
            }

            let rebuilt = reconstruct(&root, &mut ArchiveFetch(&mut reader))
                .await
                .map_err(|e| match e {
                    chainpack_blocks::Error::MissingNode(cid) => Error::MissingNode {
                        index: cursor,
                        cid,
                    },
                    other => Error::Codec(other),
                })?;
            if rebuilt != store.read_binary(&entry).await? {
                return Err(Error::BinaryMismatch { index: cursor });
            }
            items += 1;

            match header.parent {
                Some(parent) => {
                    if cursor == 0 {
                        return Err(Error::UnexpectedParent { index: cursor });
                    }
                    expected_root = parent;
                }
                None => {
                    if cursor != 0 {
                        return Err(Error::MissingParent { index: cursor });
                    }
                    reached_genesis = true;
                }
            }

            if cursor == chunk.start {
                break;
            }
            cursor -= 1;
        }
        info!("chunk {} verified", chunk.name());

        if chunk.start == 0 {
            break;
        }
        cursor = chunk.start - 1;
    }

    if !reached_genesis {
        return Err(Error::MissingChunk { index: cursor });
    }
    Ok(VerifyReport {
        items,
        chunks: selected.len() as u64,
    })
}
