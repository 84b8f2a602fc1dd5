//! Error types for the LSP layer.

use thiserror::Error;
use tower_lsp::lsp_types::Url;

use kousei_core::ConfigError;

/// Errors from the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An open or change arrived with a version that is not newer than the stored one.
    #[error("Ignoring stale update for {uri}: version {version} is not newer than {current}")]
    StaleUpdateIgnored { uri: Url, version: i32, current: i32 },

    /// The document was never opened, or has been closed.
    #[error("Unknown document: {0}")]
    UnknownDocument(Url),

    /// An incremental change referred to a position outside the document.
    #[error("Change range outside document {0}")]
    InvalidRange(Url),
}

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
