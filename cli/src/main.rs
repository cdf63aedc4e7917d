// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod cli;
mod logger;
mod subcommand;

use async_std::task;
use cli::{cli_error_and_die, Cli};
use structopt::StructOpt;

fn main() {
    // Capture Cli inputs
    let Cli { opts, cmd } = Cli::from_args();

    match opts.to_config() {
        Ok(cfg) => {
            logger::setup_logger(&opts.color);
            if let Err(err) = task::block_on(subcommand::process(cmd, cfg)) {
                cli_error_and_die(format!("{err:#}"), 1);
            }
        }
        Err(err) => {
            logger::setup_logger(&Default::default());
            cli_error_and_die(format!("Error parsing config: {err}"), 1);
        }
    };
}
