//! Outbound notifications to the editor.

use async_trait::async_trait;
use tower_lsp::Client;
use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

/// Sink for everything the session sends back to the client.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Replaces all diagnostics shown for `uri`.
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    );

    /// Shows a warning message to the user.
    async fn show_warning(&self, message: String);
}

#[async_trait]
impl Publisher for Client {
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    ) {
        Client::publish_diagnostics(self, uri, diagnostics, version).await;
    }

    async fn show_warning(&self, message: String) {
        self.show_message(MessageType::WARNING, message).await;
    }
}
