//! Session controller: maps document lifecycle events onto the store and
//! the scheduler, and publishes what finished runs produce.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};
use tracing::{debug, error, warn};

use kousei_core::{
    CancellationToken, Diagnostic, FILTER_ERROR_RULE, Pipeline, RunOutcome, ServerConfig,
    Snapshot, TriggerMode,
};

use crate::conversion::to_lsp_diagnostic;
use crate::error::StoreError;
use crate::publisher::Publisher;
use crate::scheduler::{RunExecutor, RunScheduler};
use crate::store::DocumentStore;

/// Runs the pipeline for scheduled snapshots and publishes the results.
pub struct Analyzer {
    pipeline: Pipeline,
    store: Arc<DocumentStore>,
    publisher: Arc<dyn Publisher>,
    /// Last published snapshot version per URI.
    published: tokio::sync::Mutex<HashMap<Url, i32>>,
    /// URIs whose checker failure has already been shown to the user.
    warned: Mutex<HashSet<Url>>,
}

impl Analyzer {
    pub fn new(
        pipeline: Pipeline,
        store: Arc<DocumentStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            pipeline,
            store,
            publisher,
            published: tokio::sync::Mutex::new(HashMap::new()),
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Publishes diagnostics for `snapshot` unless a newer version exists.
    async fn publish(&self, snapshot: &Snapshot, diagnostics: Vec<Diagnostic>) {
        let mut published = self.published.lock().await;

        if !self.store.is_current(snapshot) {
            debug!(
                "Discarding result for {} (version {} is stale)",
                snapshot.uri, snapshot.version
            );
            return;
        }
        if published
            .get(&snapshot.uri)
            .is_some_and(|&version| version > snapshot.version)
        {
            debug!(
                "Discarding result for {} (newer version already published)",
                snapshot.uri
            );
            return;
        }

        let lsp_diagnostics = diagnostics
            .iter()
            .filter_map(|d| to_lsp_diagnostic(d, &snapshot.text))
            .collect();

        published.insert(snapshot.uri.clone(), snapshot.version);
        self.publisher
            .publish_diagnostics(snapshot.uri.clone(), lsp_diagnostics, Some(snapshot.version))
            .await;
    }

    /// Clears the client's diagnostics for a closed document.
    pub async fn clear(&self, uri: &Url) {
        let mut published = self.published.lock().await;
        published.remove(uri);
        self.warned.lock().remove(uri);
        self.publisher
            .publish_diagnostics(uri.clone(), Vec::new(), None)
            .await;
    }
}

#[async_trait]
impl RunExecutor for Analyzer {
    async fn execute(&self, snapshot: Snapshot, token: CancellationToken) {
        debug!(
            "Validating document: {} (version {})",
            snapshot.uri, snapshot.version
        );

        match self.pipeline.run(&snapshot, &token).await {
            Ok(RunOutcome::Finished(diagnostics)) => {
                // Only a checker response ends an outage; a filter failure
                // never reached the checker.
                if !diagnostics.iter().any(|d| d.rule_id == FILTER_ERROR_RULE) {
                    self.warned.lock().remove(&snapshot.uri);
                }
                self.publish(&snapshot, diagnostics).await;
            }
            Ok(RunOutcome::Cancelled) => {
                debug!("Run for {} cancelled", snapshot.uri);
            }
            Err(e) if e.is_checker_failure() => {
                warn!("Proofreading {} failed: {}", snapshot.uri, e);
                if !token.is_cancelled() && self.warned.lock().insert(snapshot.uri.clone()) {
                    self.publisher
                        .show_warning(format!("kousei: {e}. Diagnostics were not updated."))
                        .await;
                }
            }
            Err(e) => {
                error!("Run for {} aborted: {}", snapshot.uri, e);
            }
        }
    }
}

/// Top-level orchestrator for one client session.
pub struct SessionController {
    config: Arc<ServerConfig>,
    store: Arc<DocumentStore>,
    scheduler: RunScheduler,
    analyzer: Arc<Analyzer>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl SessionController {
    /// Creates a session around an already configured pipeline.
    pub fn new(
        config: Arc<ServerConfig>,
        pipeline: Pipeline,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let store = Arc::new(DocumentStore::new());
        let analyzer = Arc::new(Analyzer::new(pipeline, Arc::clone(&store), publisher));
        let scheduler = RunScheduler::new(
            config.debounce(),
            Arc::clone(&store),
            Arc::clone(&analyzer) as Arc<dyn RunExecutor>,
        );

        Self {
            config,
            store,
            scheduler,
            analyzer,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn scheduler(&self) -> &RunScheduler {
        &self.scheduler
    }

    /// `textDocument/didOpen`: record the document and schedule a run.
    ///
    /// A repeated open with a version that does not advance is ignored.
    pub fn on_open(&self, uri: Url, version: i32, text: String) {
        debug!("Document opened: {} (version {})", uri, version);
        if let Err(e) = self.store.open(uri.clone(), version, text) {
            debug!("{}", e);
            return;
        }
        self.scheduler.schedule(&uri);
    }

    /// `textDocument/didChange`: apply the change and, in on-change mode,
    /// schedule a run.
    ///
    /// Stale changes are ignored and reported as `Ok`; they are expected
    /// under load.
    pub fn on_change(
        &self,
        uri: &Url,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Result<(), StoreError> {
        match self.store.apply_change(uri, version, changes) {
            Ok(_) => {
                if self.config.trigger == TriggerMode::OnChange {
                    self.scheduler.schedule(uri);
                }
                Ok(())
            }
            Err(e @ StoreError::StaleUpdateIgnored { .. }) => {
                debug!("{}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// `textDocument/didSave`: schedule a run with the save delay, when
    /// saves are allowed to trigger.
    pub fn on_save(&self, uri: &Url) -> Result<(), StoreError> {
        if !self.store.contains(uri) {
            return Err(StoreError::UnknownDocument(uri.clone()));
        }
        if !self.config.check_on_save && self.config.trigger != TriggerMode::OnSaveOnly {
            return Ok(());
        }

        let delay = self.config.save_delay();
        if delay.is_zero() {
            self.scheduler.schedule_now(uri);
        } else {
            self.scheduler.schedule_after(uri, delay);
        }
        Ok(())
    }

    /// `textDocument/didClose`: drop all state and clear the client's view.
    pub async fn on_close(&self, uri: &Url) {
        debug!("Document closed: {}", uri);
        self.store.close(uri);
        self.scheduler.close(uri);
        self.analyzer.clear(uri).await;
    }
}
