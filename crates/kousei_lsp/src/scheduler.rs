//! Per-document run scheduling with debouncing and cooperative cancellation.
//!
//! Each URI moves through `Idle -> Pending -> Running -> Idle`. Scheduling
//! while `Pending` re-arms the debounce timer; scheduling while `Running`
//! cancels the active run's token and arms a new timer. A cancelled run
//! keeps its URI's run lane until it returns, so the next run never talks
//! to the checker at the same time as the one it replaced.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tower_lsp::lsp_types::Url;
use tracing::debug;

use kousei_core::{CancellationToken, Snapshot};

use crate::store::DocumentStore;

/// What a run does once it has a snapshot and a cancellation token.
#[async_trait]
pub trait RunExecutor: Send + Sync {
    async fn execute(&self, snapshot: Snapshot, token: CancellationToken);
}

/// Scheduler state of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// A debounce timer is armed.
    Pending,
    Running,
}

/// Identity of a started run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub id: u64,
    pub uri: Url,
    /// Version of the snapshot the run analyzes.
    pub version: i32,
    token: CancellationToken,
}

impl RunHandle {
    /// Signals the run to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Default)]
struct Slot {
    generation: u64,
    timer: Option<JoinHandle<()>>,
    active: Option<RunHandle>,
    lane: Arc<tokio::sync::Mutex<()>>,
}

struct Inner {
    debounce: Duration,
    store: Arc<DocumentStore>,
    executor: Arc<dyn RunExecutor>,
    slots: Mutex<HashMap<Url, Slot>>,
    next_id: AtomicU64,
}

/// Debounces edits and keeps at most one run per document in flight.
#[derive(Clone)]
pub struct RunScheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RunScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunScheduler")
            .field("debounce", &self.inner.debounce)
            .field("documents", &self.inner.slots.lock().len())
            .finish()
    }
}

impl RunScheduler {
    /// Creates a scheduler reading snapshots from `store`.
    pub fn new(
        debounce: Duration,
        store: Arc<DocumentStore>,
        executor: Arc<dyn RunExecutor>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                debounce,
                store,
                executor,
                slots: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Arms (or re-arms) the debounce timer for `uri`.
    pub fn schedule(&self, uri: &Url) {
        self.schedule_after(uri, self.inner.debounce);
    }

    /// Starts a run for `uri` without waiting for the debounce.
    pub fn schedule_now(&self, uri: &Url) {
        self.schedule_after(uri, Duration::ZERO);
    }

    /// Like [`RunScheduler::schedule`] with an explicit delay.
    ///
    /// A zero delay starts the run as soon as the timer task is polled.
    pub fn schedule_after(&self, uri: &Url, delay: Duration) {
        let mut slots = self.inner.slots.lock();
        let slot = slots.entry(uri.clone()).or_default();

        slot.generation += 1;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        if let Some(active) = &slot.active {
            debug!("Cancelling run {} for {} (superseded)", active.id, uri);
            active.cancel();
        }

        let generation = slot.generation;
        let inner = Arc::clone(&self.inner);
        let uri = uri.clone();
        slot.timer = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            inner.start(uri, generation);
        }));
    }

    /// Cancels any pending or active run and forgets `uri`.
    pub fn close(&self, uri: &Url) {
        let Some(slot) = self.inner.slots.lock().remove(uri) else {
            return;
        };
        if let Some(timer) = slot.timer {
            timer.abort();
        }
        if let Some(active) = slot.active {
            debug!("Cancelling run {} for {} (closed)", active.id, uri);
            active.cancel();
        }
    }

    pub fn state(&self, uri: &Url) -> RunState {
        let slots = self.inner.slots.lock();
        let Some(slot) = slots.get(uri) else {
            return RunState::Idle;
        };
        if slot.timer.as_ref().is_some_and(|timer| !timer.is_finished()) {
            RunState::Pending
        } else if slot.active.is_some() {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    /// The run currently in flight for `uri`, if any.
    pub fn active_run(&self, uri: &Url) -> Option<RunHandle> {
        self.inner
            .slots
            .lock()
            .get(uri)
            .and_then(|slot| slot.active.clone())
    }
}

impl Inner {
    /// Called when a debounce timer fires.
    fn start(self: Arc<Self>, uri: Url, generation: u64) {
        let snapshot = match self.store.snapshot(&uri) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Not starting run: {}", e);
                return;
            }
        };

        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(&uri) else {
            return;
        };
        if slot.generation != generation {
            return;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        slot.timer = None;
        slot.active = Some(RunHandle {
            id,
            uri: uri.clone(),
            version: snapshot.version,
            token: token.clone(),
        });
        let lane = Arc::clone(&slot.lane);
        drop(slots);

        tokio::spawn(async move {
            {
                let _lane = lane.lock_owned().await;
                if token.is_cancelled() {
                    debug!("Run {} for {} cancelled before it started", id, uri);
                } else {
                    debug!(
                        "Starting run {} for {} (version {})",
                        id, uri, snapshot.version
                    );
                    self.executor.execute(snapshot, token).await;
                }
            }
            self.finish(&uri, id);
        });
    }

    fn finish(&self, uri: &Url, id: u64) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(uri)
            && slot.active.as_ref().is_some_and(|active| active.id == id)
        {
            slot.active = None;
        }
    }
}
