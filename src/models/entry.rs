//! Per-model test entry

use crate::types::TestStatus;
use serde::{Deserialize, Serialize};

/// Test state of one model under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTestEntry {
    /// Identifier shown to and searched by the caller, unique within a session
    pub display_name: String,
    /// Identifier sent to the probe client after alias resolution
    pub upstream_name: String,
    /// Current status
    pub status: TestStatus,
    /// Set only while `status` is `Success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Set only while `status` is `Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ModelTestEntry {
    /// Create a pending entry
    pub fn new(display_name: impl Into<String>, upstream_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            upstream_name: upstream_name.into(),
            status: TestStatus::Pending,
            latency_ms: None,
            error_message: None,
        }
    }

    /// Overwrite the mutable fields in one step.
    ///
    /// Latency survives only for `Success` and the message only for `Error`,
    /// so at most one of them is ever populated.
    pub fn apply(&mut self, status: TestStatus, latency_ms: Option<u64>, error_message: Option<String>) {
        self.status = status;
        self.latency_ms = match status {
            TestStatus::Success => latency_ms,
            _ => None,
        };
        self.error_message = match status {
            TestStatus::Error => Some(error_message.unwrap_or_else(|| "unknown error".to_string())),
            _ => None,
        };
    }

    /// Back to `Pending` with both result fields cleared
    pub fn reset(&mut self) {
        self.apply(TestStatus::Pending, None, None);
    }

    /// Whether the upstream identifier differs from the display name
    pub fn is_redirected(&self) -> bool {
        self.display_name != self.upstream_name
    }
}
