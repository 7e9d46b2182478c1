//! Probe scheduling
//!
//! This module contains the components that run connectivity probes:
//! - A bounded worker pool that drains a session's work queue
//! - Cooperative cancellation of a bulk run
//! - Ad-hoc single-model probes that run independently of any bulk run

pub mod sink;

pub use sink::{ChannelSink, NoopSink, UpdateSink};

use crate::{
    cancel::CancelToken,
    client::{ProbeClient, ProbeOutcome, ProbeRequest},
    defaults::{DEFAULT_PROBE_TIMEOUT, MAX_CONCURRENCY, MIN_CONCURRENCY},
    error::{AppError, Result},
    logging::SchedulerLogger,
    models::ModelTestEntry,
    session::{TestSession, WorkItem},
    types::TestStatus,
};
use futures::{future::join_all, FutureExt};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// Result of a `start_all` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartOutcome {
    /// A new bulk run was launched
    Started { run_id: u64, workers: usize },
    /// A bulk run was already active; nothing changed
    AlreadyRunning { run_id: u64 },
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, StartOutcome::Started { .. })
    }

    pub fn run_id(&self) -> u64 {
        match self {
            StartOutcome::Started { run_id, .. } | StartOutcome::AlreadyRunning { run_id } => *run_id,
        }
    }
}

/// Runs, cancels and interleaves model probes for any number of sessions
#[derive(Clone)]
pub struct Scheduler {
    probe: Arc<dyn ProbeClient>,
    sink: Arc<dyn UpdateSink>,
    probe_timeout: Duration,
    logger: SchedulerLogger,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(probe: Arc<dyn ProbeClient>, sink: Arc<dyn UpdateSink>) -> Self {
        Self {
            probe,
            sink,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            logger: SchedulerLogger::quiet(),
        }
    }

    /// Override the per-probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: SchedulerLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Launch a bulk run over every entry of `session` with `concurrency` workers.
    ///
    /// Returns as soon as the workers are spawned. Must be called from within
    /// a tokio runtime.
    pub fn start_all(&self, session: &Arc<TestSession>, concurrency: usize) -> Result<StartOutcome> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(AppError::invalid_argument(format!(
                "concurrency must be between {} and {}, got {}",
                MIN_CONCURRENCY, MAX_CONCURRENCY, concurrency
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|e| AppError::internal(format!("start_all requires a tokio runtime: {}", e)))?;

        let session_id = session.id().to_string();
        let (run_id, token) = match session.begin_run(concurrency)? {
            Some(claimed) => claimed,
            None => {
                let run_id = session.run_id();
                self.logger.start_ignored(&session_id, run_id);
                return Ok(StartOutcome::AlreadyRunning { run_id });
            }
        };

        session.store().reset_all();
        session.queue().fill(session.store().work_items());
        self.logger
            .run_started(&session_id, run_id, concurrency, session.store().len());

        let started = Instant::now();
        let workers: Vec<_> = (0..concurrency)
            .map(|worker| {
                let scheduler = self.clone();
                let session = Arc::clone(session);
                let token = token.clone();
                runtime.spawn(async move { scheduler.run_worker(&session, worker, &token).await })
            })
            .collect();

        let scheduler = self.clone();
        let session = Arc::clone(session);
        runtime.spawn(async move {
            for result in join_all(workers).await {
                if let Err(e) = result {
                    let detail = if e.is_panic() {
                        panic_detail(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    scheduler.logger.worker_panicked(&session_id, run_id, &detail);
                }
            }
            let counts = session.store().counts();
            scheduler
                .logger
                .run_finished(&session_id, run_id, &counts, started.elapsed());
            session.finish_run(run_id);
        });

        Ok(StartOutcome::Started {
            run_id,
            workers: concurrency,
        })
    }

    /// Revoke the active run's token without waiting for workers to exit.
    ///
    /// Entries already `Testing` are not reset; no-op when nothing is running.
    pub fn stop(&self, session: &TestSession) {
        let run_id = session.run_id();
        if session.request_stop() {
            self.logger.stop_requested(&session.id().to_string(), run_id);
        }
    }

    /// Probe one model outside of any bulk run and return its final entry
    pub async fn test_one(&self, session: &TestSession, display_name: &str) -> Result<ModelTestEntry> {
        if session.is_closed() {
            return Err(AppError::invalid_argument("session is closed"));
        }
        let entry = session.store().get(display_name)?;
        let item = WorkItem::new(entry.display_name, entry.upstream_name);

        // A standalone probe is never revoked by `stop`.
        self.probe_item(session, &item, &CancelToken::new(), None).await
    }

    /// Wait until the active bulk run, if any, has fully wound down
    pub async fn wait_idle(&self, session: &TestSession) {
        session.wait_idle().await;
    }

    /// Mark the session closed and cancel its bulk run
    pub fn close(&self, session: &TestSession) {
        session.mark_closed();
        self.stop(session);
    }

    /// Notify the sink; a panicking sink is logged and never unwinds into a probe
    fn notify(&self, session_id: &str, display_name: &str) {
        let sink = &self.sink;
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| sink.notify(display_name))) {
            self.logger
                .sink_panicked(session_id, display_name, &panic_detail(panic));
        }
    }

    async fn run_worker(&self, session: &TestSession, worker: usize, token: &CancelToken) {
        while let Some(item) = session.queue().try_dequeue() {
            if token.is_cancelled() {
                self.logger
                    .worker_cancelled(&session.id().to_string(), worker, &item.display_name);
                break;
            }
            if let Err(e) = self.probe_item(session, &item, token, Some(worker)).await {
                self.logger
                    .probe_rejected(&session.id().to_string(), &item.display_name, &e);
            }
        }
    }

    async fn probe_item(
        &self,
        session: &TestSession,
        item: &WorkItem,
        token: &CancelToken,
        worker: Option<usize>,
    ) -> Result<ModelTestEntry> {
        let session_id = session.id().to_string();
        let store = session.store();

        store.set(&item.display_name, TestStatus::Testing, None, None)?;
        self.notify(&session_id, &item.display_name);
        self.logger
            .probe_started(&session_id, &store.get(&item.display_name)?, worker);

        let request = ProbeRequest::for_target(session.provider(), &item.upstream_name, self.probe_timeout);
        let probe = tokio::time::timeout(self.probe_timeout, self.probe.check(&request, token));
        let outcome = match AssertUnwindSafe(probe).catch_unwind().await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => {
                self.logger.probe_rejected(&session_id, &item.display_name, &e);
                ProbeOutcome::failure(e.to_string())
            }
            Ok(Err(_elapsed)) => ProbeOutcome::timed_out(self.probe_timeout),
            Err(panic) => ProbeOutcome::failure(format!("probe panicked: {}", panic_detail(panic))),
        };

        if outcome.success {
            store.set(&item.display_name, TestStatus::Success, outcome.latency_ms, None)?;
        } else {
            store.set(&item.display_name, TestStatus::Error, None, outcome.error)?;
        }
        self.notify(&session_id, &item.display_name);

        let entry = store.get(&item.display_name)?;
        self.logger.probe_finished(&session_id, &entry);
        Ok(entry)
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
