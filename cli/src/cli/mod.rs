// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod config;
mod consolidate_cmd;
mod index_cmd;
mod verify_cmd;

pub use self::config::*;
pub use self::consolidate_cmd::*;
pub use self::index_cmd::*;
pub use self::verify_cmd::*;

use crate::logger::LoggingColor;
use chainpack_utils::io::{read_file_to_string, read_toml};
use log::error;
use std::io;
use std::path::PathBuf;
use structopt::StructOpt;

/// CLI structure generated when interacting with the chainpack binary
#[derive(StructOpt)]
#[structopt(
    name = "chainpack-cli",
    about = "Consolidates per-item chain archives into bounded, deduplicated archives and verifies them"
)]
pub struct Cli {
    #[structopt(flatten)]
    pub opts: CliOpts,
    #[structopt(subcommand)]
    pub cmd: Subcommand,
}

#[derive(StructOpt, Debug)]
pub enum Subcommand {
    /// Pack a run of items into size-bounded chunk manifests
    Index(IndexCommand),
    /// Merge each chunk's single-item archives into one deduplicated archive
    Consolidate(ConsolidateCommand),
    /// Prove the consolidated chain still reconstructs every item exactly
    Verify(VerifyCommand),
}

/// CLI options
#[derive(StructOpt, Debug)]
pub struct CliOpts {
    /// A TOML file containing relevant configurations
    #[structopt(short, long)]
    pub config: Option<String>,
    /// Root directory holding the item dump and the chunk output
    #[structopt(short, long)]
    pub data_dir: Option<PathBuf>,
    /// Enable or disable colored logging in `stdout`
    #[structopt(long, default_value = "auto")]
    pub color: LoggingColor,
}

impl CliOpts {
    pub fn to_config(&self) -> Result<Config, io::Error> {
        let mut cfg: Config = match &self.config {
            Some(config_file) => {
                // Read from config file
                let toml = read_file_to_string(&PathBuf::from(&config_file))?;
                // Parse and return the configuration file
                read_toml(&toml)?
            }
            None => Config::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            cfg.data_dir = data_dir.clone();
        }
        Ok(cfg)
    }
}

pub fn cli_error_and_die(msg: impl AsRef<str>, code: i32) -> ! {
    error!("{}", msg.as_ref());
    std::process::exit(code);
}
