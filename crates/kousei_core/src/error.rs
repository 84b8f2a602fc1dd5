//! Error types for the analysis pipeline and its collaborators.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while translating offsets through an [`OffsetMap`](crate::OffsetMap).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The filtered offset lies outside `[0, filtered_len]`.
    #[error("Offset {offset} is out of bounds (filtered length {len})")]
    OutOfBounds { offset: u32, len: u32 },

    /// The correspondence table violates its ordering or bounds invariants.
    #[error("Inconsistent offset map: {0}")]
    Inconsistent(String),
}

impl MapError {
    /// Creates an inconsistency error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent(message.into())
    }
}

/// Errors from the filtering collaborator.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter program could not be started or talked to.
    #[error("Failed to run filter: {0}")]
    Io(#[from] std::io::Error),

    /// The filter exited unsuccessfully.
    #[error("Filter exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },

    /// The filter output could not be decoded.
    #[error("Invalid filter output: {0}")]
    InvalidOutput(String),

    /// The filter produced an unusable position table.
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Errors from the checker collaborator.
#[derive(Debug, Error)]
pub enum CheckerError {
    /// The checker could not be reached or answered with an error.
    #[error("Checker unavailable: {0}")]
    Unavailable(String),
}

impl CheckerError {
    /// Creates an unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl From<reqwest::Error> for CheckerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Errors that abort a single pipeline run.
///
/// None of these are fatal to the server; the caller reports them and keeps
/// the previously published diagnostics.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The checker collaborator failed.
    #[error(transparent)]
    CheckerUnavailable(#[from] CheckerError),

    /// The checker did not answer within the configured bound.
    #[error("Checker did not respond within {0:?}")]
    CheckerTimeout(Duration),

    /// A checker result could not be mapped back to the original text.
    #[error("Failed to map diagnostic: {0}")]
    Mapping(#[from] MapError),
}

impl PipelineError {
    /// Returns true if the error concerns the checker collaborator.
    pub fn is_checker_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::CheckerUnavailable(_) | PipelineError::CheckerTimeout(_)
        )
    }
}

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSONC or has unexpected fields.
    #[error("Invalid config: {0}")]
    Invalid(String),
}
