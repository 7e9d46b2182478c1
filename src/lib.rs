//! Model Connectivity Tester
//!
//! Verifies, for a configured upstream LLM provider, whether each of its
//! models is reachable and responsive. Probes run on a bounded worker pool
//! that can be cancelled at any time, with per-model status published live.

pub mod app;
pub mod cancel;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use client::{HttpProbeClient, ProbeClient, ProbeOutcome, ProbeRequest};
pub use error::{AppError, Result};
pub use executor::{ChannelSink, NoopSink, Scheduler, StartOutcome, UpdateSink};
pub use models::{Config, ModelTestEntry};
pub use output::{ColoredFormatter, JsonFormatter, OutputFormatterFactory, PlainFormatter, ResultFormatter};
pub use session::{ProviderTarget, TestEntryStore, TestSession, WorkItem, WorkQueue};
pub use types::{ProviderEngine, TestStatus};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use crate::types::ProviderEngine;
    use std::time::Duration;

    pub const DEFAULT_ENGINE: ProviderEngine = ProviderEngine::OpenAi;
    pub const DEFAULT_CONCURRENCY: usize = 3;
    pub const MIN_CONCURRENCY: usize = 1;
    pub const MAX_CONCURRENCY: usize = 10;
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MAX_PROBE_TIMEOUT_SECONDS: u64 = 300;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
