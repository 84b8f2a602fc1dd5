//! kousei CLI
//!
//! Proofreading language server for markup documents.

mod cli;
mod commands;
mod output;
mod utils;

use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::utils::load_config;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(found_issues) => {
            if found_issues {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Lsp { tcp, host, port } => {
            let tcp = tcp.then_some((*host, *port));
            commands::run_lsp(config, tcp).map(|_| false)
        }
        Commands::Check { file, format } => commands::run_check(&config, file, *format),
    }
}
