// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::cli::{Config, Subcommand};

/// Process CLI sub-command
pub(super) async fn process(command: Subcommand, config: Config) -> anyhow::Result<()> {
    // Run command
    match command {
        Subcommand::Index(cmd) => cmd.run(config).await,
        Subcommand::Consolidate(cmd) => cmd.run(config).await,
        Subcommand::Verify(cmd) => cmd.run(config).await,
    }
}
