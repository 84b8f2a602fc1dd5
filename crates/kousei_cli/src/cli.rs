//! CLI argument definitions

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// kousei - Proofreading language server for markup documents
#[derive(Parser)]
#[command(name = "kousei")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the LSP server
    Lsp {
        /// Listen on a TCP socket instead of stdio
        #[arg(long)]
        tcp: bool,

        /// Address to listen on with --tcp
        #[arg(long, default_value = "127.0.0.1", requires = "tcp")]
        host: IpAddr,

        /// Port to listen on with --tcp
        #[arg(long, default_value_t = 2087, requires = "tcp")]
        port: u16,
    },

    /// Proofread a single file and print the findings
    Check {
        /// File to check
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
