//! CLI utility functions

use miette::{IntoDiagnostic, Result};
use tokio::runtime::Runtime;
use tracing::debug;

use kousei_core::ServerConfig;

use crate::cli::Cli;

pub fn create_tokio_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()
}

/// Loads the configuration named on the command line, or the one found in
/// the working directory, or the defaults.
pub fn load_config(cli: &Cli) -> Result<ServerConfig> {
    if let Some(ref path) = cli.config {
        debug!("Using config {}", path.display());
        return ServerConfig::from_file(path).into_diagnostic();
    }

    let cwd = std::env::current_dir().into_diagnostic()?;
    match ServerConfig::discover(&cwd) {
        Some(path) => {
            debug!("Using config {}", path.display());
            ServerConfig::from_file(&path).into_diagnostic()
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(ServerConfig::default())
        }
    }
}
