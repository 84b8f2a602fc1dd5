//! Document lifecycle handlers (open, change, save, close).

use tower_lsp::lsp_types::*;
use tracing::{debug, warn};

use crate::session::SessionController;

/// Handles the `textDocument/didOpen` notification.
pub fn handle_did_open(session: &SessionController, params: DidOpenTextDocumentParams) {
    let document = params.text_document;
    session.on_open(document.uri, document.version, document.text);
}

/// Handles the `textDocument/didChange` notification.
pub fn handle_did_change(session: &SessionController, params: DidChangeTextDocumentParams) {
    let uri = params.text_document.uri;
    debug!(
        "Document changed: {} (version {})",
        uri, params.text_document.version
    );

    if let Err(e) = session.on_change(&uri, params.text_document.version, params.content_changes)
    {
        warn!("Rejected change: {}", e);
    }
}

/// Handles the `textDocument/didSave` notification.
pub fn handle_did_save(session: &SessionController, params: DidSaveTextDocumentParams) {
    debug!("Document saved: {}", params.text_document.uri);

    if let Err(e) = session.on_save(&params.text_document.uri) {
        warn!("Rejected save: {}", e);
    }
}

/// Handles the `textDocument/didClose` notification.
pub async fn handle_did_close(session: &SessionController, params: DidCloseTextDocumentParams) {
    session.on_close(&params.text_document.uri).await;
}
