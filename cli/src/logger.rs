// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use atty::Stream;
use std::str::FromStr;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingColor {
    Always,
    Auto,
    Never,
}

impl LoggingColor {
    fn coloring_enabled(&self) -> bool {
        match self {
            LoggingColor::Auto => atty::is(Stream::Stdout),
            LoggingColor::Always => true,
            LoggingColor::Never => false,
        }
    }
}

impl Default for LoggingColor {
    fn default() -> Self {
        LoggingColor::Auto
    }
}

impl FromStr for LoggingColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(LoggingColor::Auto),
            "always" => Ok(LoggingColor::Always),
            "never" => Ok(LoggingColor::Never),
            _ => Err(Self::Err::msg(
                "Invalid logging color output. Must be one of Auto, Always, Never",
            )),
        }
    }
}

pub fn setup_logger(color: &LoggingColor) {
    let env_filter = EnvFilter::builder().parse_lossy(
        [
            "info".into(),
            std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default(),
        ]
        .join(","),
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::Layer::new()
                .with_ansi(color.coloring_enabled())
                .with_filter(env_filter),
        )
        .init();
}
