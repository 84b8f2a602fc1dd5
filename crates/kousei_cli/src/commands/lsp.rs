//! LSP command implementation

use std::net::{IpAddr, SocketAddr};

use kousei_core::ServerConfig;
use miette::{IntoDiagnostic, Result};

use crate::utils::create_tokio_runtime;

pub fn run_lsp(config: ServerConfig, tcp: Option<(IpAddr, u16)>) -> Result<()> {
    create_tokio_runtime()?.block_on(async {
        match tcp {
            Some((host, port)) => {
                kousei_lsp::run_tcp(config, SocketAddr::new(host, port)).await
            }
            None => kousei_lsp::run(config).await,
        }
    })
    .into_diagnostic()
}
