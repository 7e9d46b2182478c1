//! Test session state for one provider
//!
//! A [`TestSession`] lives as long as the view that tests one provider. It
//! owns the entry store and the work queue, and tracks whether a bulk run is
//! active together with that run's cancellation token.

pub mod queue;
pub mod store;

pub use queue::{WorkItem, WorkQueue};
pub use store::{Snapshot, SnapshotIter, StatusCounts, TestEntryStore};

use crate::{
    cancel::CancelToken,
    defaults::{MAX_CONCURRENCY, MIN_CONCURRENCY},
    error::{AppError, Result},
    models::Config,
    types::ProviderEngine,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use uuid::Uuid;

/// Where probes for a session are sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTarget {
    pub engine: ProviderEngine,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl ProviderTarget {
    pub fn new(engine: ProviderEngine, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            engine,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

/// Bulk-run bookkeeping, always updated as a unit
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// True from an accepted `start_all` until its last worker exits
    pub running: bool,
    /// Token of the active run; `None` whenever `running` is false
    pub cancel_token: Option<CancelToken>,
    /// Incremented on every accepted `start_all`
    pub run_id: u64,
    /// Worker count of the active run
    pub workers: usize,
    /// Set once the owning view has gone away
    pub closed: bool,
}

/// Clamp a requested worker count into the supported range
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

/// All test state for one provider
#[derive(Debug)]
pub struct TestSession {
    id: Uuid,
    provider: ProviderTarget,
    store: TestEntryStore,
    queue: WorkQueue,
    concurrency: AtomicUsize,
    run: watch::Sender<RunState>,
}

impl TestSession {
    /// Open a session with every model `Pending`
    pub fn new<I, D, U>(provider: ProviderTarget, models: I) -> Self
    where
        I: IntoIterator<Item = (D, U)>,
        D: Into<String>,
        U: Into<String>,
    {
        let (run, _) = watch::channel(RunState::default());
        Self {
            id: Uuid::new_v4(),
            provider,
            store: TestEntryStore::new(models),
            queue: WorkQueue::new(),
            concurrency: AtomicUsize::new(crate::defaults::DEFAULT_CONCURRENCY),
            run,
        }
    }

    /// Open a session for the provider and models described by `config`
    pub fn from_config(config: &Config) -> Self {
        let provider = ProviderTarget::new(config.engine, config.base_url.trim(), config.api_key.clone());
        let session = Self::new(provider, config.model_pairs());
        session.set_concurrency(config.concurrency);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn provider(&self) -> &ProviderTarget {
        &self.provider
    }

    pub fn store(&self) -> &TestEntryStore {
        &self.store
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Worker count the next `start_all` should use
    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::Acquire)
    }

    /// Store a clamped worker count and return it.
    ///
    /// A run already in progress keeps its original worker count.
    pub fn set_concurrency(&self, requested: usize) -> usize {
        let clamped = clamp_concurrency(requested);
        self.concurrency.store(clamped, Ordering::Release);
        clamped
    }

    pub fn is_running(&self) -> bool {
        self.run.borrow().running
    }

    pub fn is_closed(&self) -> bool {
        self.run.borrow().closed
    }

    pub fn run_id(&self) -> u64 {
        self.run.borrow().run_id
    }

    /// Copy of the current run bookkeeping
    pub fn run_state(&self) -> RunState {
        self.run.borrow().clone()
    }

    /// Token of the active run, if any
    pub fn current_token(&self) -> Option<CancelToken> {
        self.run.borrow().cancel_token.clone()
    }

    /// Wait until no bulk run is active
    pub async fn wait_idle(&self) {
        let mut rx = self.run.subscribe();
        // `self.run` outlives this borrow, so the channel stays open.
        let _ = rx.wait_for(|state| !state.running).await;
    }

    /// Claim the session for a new bulk run.
    ///
    /// Returns `Ok(None)` when a run is already active.
    pub(crate) fn begin_run(&self, workers: usize) -> Result<Option<(u64, CancelToken)>> {
        let mut outcome = Ok(None);
        self.run.send_if_modified(|state| {
            if state.closed {
                outcome = Err(AppError::invalid_argument("session is closed"));
                return false;
            }
            if state.running {
                return false;
            }
            let token = CancelToken::new();
            state.running = true;
            state.run_id += 1;
            state.workers = workers;
            state.cancel_token = Some(token.clone());
            outcome = Ok(Some((state.run_id, token)));
            true
        });
        outcome
    }

    /// Mark `run_id` finished. Runs are never concurrent, so a stale id is ignored.
    pub(crate) fn finish_run(&self, run_id: u64) {
        self.run.send_if_modified(|state| {
            if state.running && state.run_id == run_id {
                state.running = false;
                state.workers = 0;
                state.cancel_token = None;
                true
            } else {
                false
            }
        });
    }

    /// Revoke the active run's token. Returns false when nothing was running.
    pub(crate) fn request_stop(&self) -> bool {
        let state = self.run.borrow();
        match (&state.cancel_token, state.running) {
            (Some(token), true) => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_closed(&self) {
        self.run.send_if_modified(|state| {
            if state.closed {
                false
            } else {
                state.closed = true;
                true
            }
        });
    }
}
