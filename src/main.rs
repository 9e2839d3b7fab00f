// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! gock3-lsp language server.
//!
//! Speaks LSP over stdin/stdout; logs go to stderr.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use gock3_lsp::config::Config;
use gock3_lsp::lsp;

/// Command-line arguments for gock3-lsp.
#[derive(Parser, Debug)]
#[command(name = "gock3-lsp")]
#[command(about = "Language server for Crusader Kings III script files")]
#[command(version = env!("GOCK3_VERSION"))]
struct Args {
    /// Path to configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Communicate over stdin/stdout (the only supported transport).
    #[arg(long)]
    stdio: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gock3_lsp=info".parse()?))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if !args.stdio {
        debug!("No transport flag given; defaulting to stdio");
    }

    let config = Config::load(args.config)?;

    info!("Starting gock3-lsp {}", env!("GOCK3_VERSION"));
    info!(
        "Position encoding preference: {:?}, analyzer: {:?}",
        config.position_encoding, config.analyzer
    );

    let exit = lsp::run(config, tokio::io::stdin(), tokio::io::stdout()).await?;
    info!("Exiting ({exit:?})");

    Ok(ExitCode::from(exit.code()))
}
