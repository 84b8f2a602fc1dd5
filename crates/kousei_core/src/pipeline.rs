//! The analysis pipeline: filter, check, map back.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::checker::Checker;
use crate::diagnostic::{Diagnostic, Severity};
use crate::error::PipelineError;
use crate::filter::Filter;
use crate::span::Span;

/// Rule id of the diagnostic reported when filtering fails.
pub const FILTER_ERROR_RULE: &str = "filter-error";

/// Immutable document contents captured when a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub uri: Url,
    pub version: i32,
    pub text: Arc<str>,
}

impl Snapshot {
    /// Creates a new snapshot.
    pub fn new(uri: Url, version: i32, text: impl Into<Arc<str>>) -> Self {
        Self {
            uri,
            version,
            text: text.into(),
        }
    }
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Diagnostics in original-document coordinates, in checker order.
    Finished(Vec<Diagnostic>),
    /// The run observed cancellation at a checkpoint.
    Cancelled,
}

/// Runs the filter and checker collaborators over a snapshot.
#[derive(Clone)]
pub struct Pipeline {
    filter: Arc<dyn Filter>,
    checker: Arc<dyn Checker>,
    language: String,
    checker_timeout: Duration,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("filter", &"<dyn Filter>")
            .field("checker", &"<dyn Checker>")
            .field("language", &self.language)
            .field("checker_timeout", &self.checker_timeout)
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline.
    pub fn new(
        filter: Arc<dyn Filter>,
        checker: Arc<dyn Checker>,
        language: impl Into<String>,
        checker_timeout: Duration,
    ) -> Self {
        Self {
            filter,
            checker,
            language: language.into(),
            checker_timeout,
        }
    }

    /// Analyzes `snapshot`, observing `token` before and after the checker call.
    ///
    /// A filtering failure does not fail the run: it yields a single
    /// diagnostic at the start of the document. The checker call itself is
    /// not interrupted by cancellation; its result is dropped instead.
    pub async fn run(
        &self,
        snapshot: &Snapshot,
        token: &CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        debug!("Filtering {} (version {})", snapshot.uri, snapshot.version);

        let filtered = match self.filter.filter(&snapshot.text).await {
            Ok(filtered) => filtered,
            Err(e) => {
                warn!("Filter failed for {}: {}", snapshot.uri, e);
                return Ok(RunOutcome::Finished(vec![filter_failure(&e.to_string())]));
            }
        };

        if token.is_cancelled() {
            debug!("Run for {} cancelled before checking", snapshot.uri);
            return Ok(RunOutcome::Cancelled);
        }

        let results = tokio::time::timeout(
            self.checker_timeout,
            self.checker.check(&filtered.text, &self.language),
        )
        .await
        .map_err(|_| PipelineError::CheckerTimeout(self.checker_timeout))??;

        if token.is_cancelled() {
            debug!("Run for {} cancelled after checking", snapshot.uri);
            return Ok(RunOutcome::Cancelled);
        }

        let diagnostics = results
            .into_iter()
            .map(|result| -> Result<Diagnostic, PipelineError> {
                let mapped = filtered.map.translate_span(result.span)?;
                Ok(Diagnostic::from_check(
                    result,
                    mapped.span,
                    mapped.approximate,
                ))
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        debug!(
            "Run for {} (version {}) produced {} diagnostics",
            snapshot.uri,
            snapshot.version,
            diagnostics.len()
        );
        Ok(RunOutcome::Finished(diagnostics))
    }
}

fn filter_failure(message: &str) -> Diagnostic {
    Diagnostic::new(
        FILTER_ERROR_RULE,
        format!("Could not filter markup: {message}"),
        Span::new(0, 0),
    )
    .with_category("MARKUP")
    .with_severity(Severity::Error)
}
