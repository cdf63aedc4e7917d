// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Config;
use anyhow::Context;
use chainpack_chunk::consolidate;
use chainpack_store::ItemStore;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct ConsolidateCommand {
    /// Offset into the chunk manifest list to begin at
    #[structopt(long, default_value = "0")]
    start: usize,
    /// Merge every `step`-th manifest from the offset; lets several invocations
    /// share one backlog
    #[structopt(long, default_value = "1")]
    step: usize,
}

impl ConsolidateCommand {
    pub async fn run(&self, config: Config) -> anyhow::Result<()> {
        let store = ItemStore::new(config.data_dir.clone());
        consolidate(&store, &config.chunk_config(), self.start, self.step)
            .await
            .context("chunk consolidation failed")?;
        println!("Consolidation complete");
        Ok(())
    }
}
