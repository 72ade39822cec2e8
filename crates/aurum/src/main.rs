// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aurum - a multi-tenant WhatsApp campaign scheduling and delivery engine.
//!
//! This is the binary entry point.

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Aurum - campaign scheduling and delivery for jewellers.
#[derive(Parser, Debug)]
#[command(name = "aurum", version, about, long_about = None)]
struct Cli {
    /// Path to a config file. Defaults to the XDG hierarchy plus
    /// `AURUM_*` environment overrides.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler, dispatcher, and delivery-status webhook server.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => aurum_config::load_config_from_path(path),
        None => aurum_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("aurum: configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("aurum: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("aurum: use --help for available commands");
        }
    }
}
