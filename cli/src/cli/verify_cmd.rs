// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Config;
use anyhow::Context;
use chainpack_chunk::verify;
use chainpack_store::ItemStore;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct VerifyCommand {
    /// Item index to verify from, down to genesis; defaults to the newest
    /// consolidated item
    #[structopt(long)]
    start: Option<u64>,
}

impl VerifyCommand {
    pub async fn run(&self, config: Config) -> anyhow::Result<()> {
        let store = ItemStore::new(config.data_dir.clone());
        let report = verify(&store, &config.chunk_config(), self.start)
            .await
            .context("chain verification failed")?;
        println!(
            "Verified {} items across {} consolidated archives",
            report.items, report.chunks
        );
        Ok(())
    }
}
