// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Config;
use anyhow::{anyhow, Context};
use chainpack_chunk::build_index;
use chainpack_store::ItemStore;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct IndexCommand {
    /// First item index to pack
    #[structopt(long, default_value = "0")]
    start: u64,
    /// Number of items to pack; defaults to everything through the newest
    /// published item
    #[structopt(long)]
    count: Option<u64>,
}

impl IndexCommand {
    pub async fn run(&self, config: Config) -> anyhow::Result<()> {
        let store = ItemStore::new(config.data_dir.clone());
        let count = match self.count {
            Some(count) => count,
            None => {
                let best = store.best_index().await?.ok_or_else(|| {
                    anyhow!("no published items under {}", config.data_dir.display())
                })?;
                (best + 1).checked_sub(self.start).ok_or_else(|| {
                    anyhow!("start #{} is beyond the newest item #{best}", self.start)
                })?
            }
        };

        let written = build_index(&store, &config.chunk_config(), self.start, count)
            .await
            .context("chunk indexing failed")?;
        println!("Wrote {} chunk manifests", written.len());
        Ok(())
    }
}
