//! Initialize and shutdown handlers.

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tracing::info;

use kousei_core::ServerConfig;

/// Handles the `initialize` LSP request.
pub async fn handle_initialize(
    config: &ServerConfig,
    params: InitializeParams,
) -> Result<InitializeResult> {
    info!("kousei LSP server initializing...");
    if let Some(client) = params.client_info {
        info!(
            "Client: {} {}",
            client.name,
            client.version.unwrap_or_default()
        );
    }
    info!(
        "Checking {} via {} (trigger: {:?}, debounce: {} ms)",
        config.language, config.checker.endpoint, config.trigger, config.debounce_ms
    );

    Ok(InitializeResult {
        capabilities: ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::INCREMENTAL),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(false),
                    })),
                    ..Default::default()
                },
            )),
            code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
                code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                resolve_provider: Some(false),
                work_done_progress_options: Default::default(),
            })),
            ..Default::default()
        },
        server_info: Some(ServerInfo {
            name: "kousei-lsp".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    })
}

/// Handles the `initialized` LSP notification.
pub async fn handle_initialized(client: &tower_lsp::Client) {
    client
        .log_message(MessageType::INFO, "kousei LSP server initialized!")
        .await;
}

/// Handles the `shutdown` LSP request.
pub async fn handle_shutdown() -> Result<()> {
    info!("kousei LSP server shutting down...");
    Ok(())
}
