//! kousei LSP Server
//!
//! Language Server Protocol front end for the kousei proofreading pipeline.
//! Documents are checked in the background as they change; results are
//! published as diagnostics with the checker's suggestions as quick fixes.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, ClientSocket, LanguageServer, LspService, Server};
use tracing::info;

use kousei_core::{Pipeline, ServerConfig};

pub mod conversion;
mod error;
mod handler;
pub mod publisher;
pub mod scheduler;
pub mod session;
pub mod store;

pub use error::{ServerError, StoreError};
pub use publisher::Publisher;
pub use scheduler::{RunExecutor, RunHandle, RunScheduler, RunState};
pub use session::{Analyzer, SessionController};
pub use store::{Document, DocumentStore};

/// The LSP backend for kousei.
#[derive(Clone)]
pub struct Backend {
    /// LSP client for sending notifications.
    client: Client,
    session: Arc<SessionController>,
}

impl Backend {
    /// Creates a backend publishing through `client`.
    pub fn new(client: Client, config: Arc<ServerConfig>, pipeline: Pipeline) -> Self {
        let publisher: Arc<dyn Publisher> = Arc::new(client.clone());
        Self {
            client,
            session: Arc::new(SessionController::new(config, pipeline, publisher)),
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        handler::handle_initialize(self.session.config(), params).await
    }

    async fn initialized(&self, _: InitializedParams) {
        handler::handle_initialized(&self.client).await;
    }

    async fn shutdown(&self) -> Result<()> {
        handler::handle_shutdown().await
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        handler::handle_did_open(&self.session, params);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        handler::handle_did_change(&self.session, params);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        handler::handle_did_save(&self.session, params);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        handler::handle_did_close(&self.session, params).await;
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        handler::handle_code_action(self.session.store(), params)
    }
}

fn service(
    config: ServerConfig,
) -> std::result::Result<(LspService<Backend>, ClientSocket), ServerError> {
    let pipeline = config.pipeline()?;
    let config = Arc::new(config);
    Ok(LspService::new(move |client| {
        Backend::new(client, config, pipeline)
    }))
}

/// Starts the LSP server on stdio.
///
/// This function does not return until the client disconnects.
pub async fn run(config: ServerConfig) -> std::result::Result<(), ServerError> {
    info!("kousei LSP server starting on stdio...");

    let (service, socket) = service(config)?;
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
    Ok(())
}

/// Starts the LSP server on a TCP socket and serves the first client that
/// connects.
pub async fn run_tcp(
    config: ServerConfig,
    addr: SocketAddr,
) -> std::result::Result<(), ServerError> {
    let (service, socket) = service(config)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("kousei LSP server listening on {}", listener.local_addr()?);

    let (stream, peer) = listener.accept().await?;
    info!("Client connected from {}", peer);

    let (read, write) = tokio::io::split(stream);
    Server::new(read, write, socket).serve(service).await;
    Ok(())
}
