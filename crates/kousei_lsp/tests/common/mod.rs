#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tower_lsp::lsp_types::{Diagnostic, TextDocumentContentChangeEvent, Url};

use kousei_core::{
    CheckResult, Checker, CheckerError, Filter, FilterError, Filtered, Pipeline, PlainFilter,
    Replacement, Severity, Span,
};
use kousei_lsp::Publisher;

/// A `publishDiagnostics` notification as seen by the client.
#[derive(Debug, Clone)]
pub struct Published {
    pub uri: Url,
    pub diagnostics: Vec<Diagnostic>,
    pub version: Option<i32>,
}

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Published>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn versions(&self) -> Vec<Option<i32>> {
        self.published.lock().iter().map(|p| p.version).collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    ) {
        self.published.lock().push(Published {
            uri,
            diagnostics,
            version,
        });
    }

    async fn show_warning(&self, message: String) {
        self.warnings.lock().push(message);
    }
}

/// Flags every "wrold". Texts containing "slow" take `slow` to check.
pub struct TypoChecker {
    pub available: AtomicBool,
    pub calls: AtomicUsize,
    pub slow: Duration,
}

impl Default for TypoChecker {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            slow: Duration::from_millis(200),
        }
    }
}

impl TypoChecker {
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Checker for TypoChecker {
    async fn check(&self, text: &str, _language: &str) -> Result<Vec<CheckResult>, CheckerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("slow") {
            tokio::time::sleep(self.slow).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(CheckerError::unavailable("connection refused"));
        }

        Ok(text
            .match_indices("wrold")
            .map(|(start, matched)| CheckResult {
                rule_id: "morfologik_rule_en_us".to_string(),
                category: "TYPOS".to_string(),
                message: "Possible spelling mistake found.".to_string(),
                severity: Severity::Warning,
                span: Span::new(start as u32, (start + matched.len()) as u32),
                matched: matched.to_string(),
                replacements: vec![Replacement::new("world")],
            })
            .collect())
    }
}

/// Passes text through, except that texts containing `\broken` fail.
pub struct BrokenMarkupFilter;

#[async_trait]
impl Filter for BrokenMarkupFilter {
    async fn filter(&self, text: &str) -> Result<Filtered, FilterError> {
        if text.contains("\\broken") {
            return Err(FilterError::InvalidOutput("unbalanced group".to_string()));
        }
        PlainFilter.filter(text).await
    }
}

pub fn pipeline(checker: Arc<TypoChecker>) -> Pipeline {
    pipeline_with_timeout(checker, Duration::from_secs(2))
}

pub fn pipeline_with_timeout(checker: Arc<TypoChecker>, timeout: Duration) -> Pipeline {
    Pipeline::new(Arc::new(PlainFilter), checker, "en-US", timeout)
}

pub fn markup_pipeline(checker: Arc<TypoChecker>) -> Pipeline {
    Pipeline::new(
        Arc::new(BrokenMarkupFilter),
        checker,
        "en-US",
        Duration::from_secs(2),
    )
}

pub fn uri(name: &str) -> Url {
    Url::parse(&format!("file:///tmp/{name}")).unwrap()
}

pub fn full(text: &str) -> TextDocumentContentChangeEvent {
    TextDocumentContentChangeEvent {
        range: None,
        range_length: None,
        text: text.to_string(),
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
