//! Output formatting and display system
//!
//! Supports colored and plain table output for interactive use, plus a JSON
//! report for scripts.

mod colored;
mod formatter;

pub use self::colored::{ColorScheme, ColoredFormatter, LatencyLevel};
pub use formatter::{
    format_duration, format_latency, Alignment, Column, FormattingOptions, PlainFormatter, ResultFormatter,
    ResultRow, RowData, TableFormat,
};

use crate::{
    error::Result,
    models::ModelTestEntry,
    session::{StatusCounts, TestSession},
    types::ProviderEngine,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn ResultFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn ResultFormatter> {
        Self::create_formatter(false, false)
    }
}

/// Machine-readable snapshot of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsReport {
    pub session_id: String,
    pub engine: ProviderEngine,
    pub base_url: String,
    pub filter: Option<String>,
    pub counts: StatusCounts,
    pub duration_ms: u64,
    pub entries: Vec<ModelTestEntry>,
}

impl ResultsReport {
    /// Capture the current state of `session`
    pub fn capture(session: &TestSession, filter: Option<&str>, elapsed: Duration) -> Self {
        let snapshot = session.store().snapshot(filter);
        Self {
            session_id: session.id().to_string(),
            engine: session.provider().engine,
            base_url: session.provider().base_url.clone(),
            filter: snapshot.filter().map(str::to_string),
            counts: session.store().counts(),
            duration_ms: elapsed.as_millis() as u64,
            entries: snapshot.iter().collect(),
        }
    }
}

/// JSON output of a [`ResultsReport`]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format_report(report: &ResultsReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn ResultFormatter>,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn ResultFormatter>) -> Self {
        Self { formatter }
    }

    pub fn formatter(&self) -> &dyn ResultFormatter {
        self.formatter.as_ref()
    }

    /// Header, results table and summary for a finished session
    pub fn display_results(&self, session: &TestSession, filter: Option<&str>, elapsed: Duration) -> Result<String> {
        let mut output = String::new();

        let title = format!("Model Connectivity: {} ({})", session.provider().base_url, session.provider().engine);
        output.push_str(&self.formatter.format_header(&title)?);
        output.push_str("\n\n");

        output.push_str(&self.formatter.format_results_table(&session.store().snapshot(filter))?);
        output.push_str("\n\n");

        output.push_str(&self.formatter.format_summary(&session.store().counts(), elapsed)?);

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ProviderTarget;
    use crate::types::TestStatus;

    fn session() -> TestSession {
        let session = TestSession::new(
            ProviderTarget::new(ProviderEngine::Anthropic, "https://api.anthropic.com", "sk"),
            vec![("claude-sonnet", "claude-3-5-sonnet"), ("claude-haiku", "claude-3-5-haiku")],
        );
        session
            .store()
            .set("claude-sonnet", TestStatus::Success, Some(320), None)
            .unwrap();
        session
    }

    #[test]
    fn test_display_results_plain() {
        let coordinator = OutputCoordinator::new(OutputFormatterFactory::create_plain_formatter());
        let output = coordinator
            .display_results(&session(), None, Duration::from_millis(900))
            .unwrap();

        assert!(output.contains("Model Connectivity: https://api.anthropic.com (anthropic)"));
        assert!(output.contains("claude-3-5-sonnet"));
        assert!(output.contains("320ms"));
        assert!(output.contains("Not run:   1"));
    }

    #[test]
    fn test_json_report() {
        let report = ResultsReport::capture(&session(), Some("Sonnet"), Duration::from_millis(900));
        let json: serde_json::Value = serde_json::from_str(&JsonFormatter::format_report(&report).unwrap()).unwrap();

        assert_eq!(json["engine"], "anthropic");
        assert_eq!(json["filter"], "sonnet");
        assert_eq!(json["counts"]["success"], 1);
        assert_eq!(json["counts"]["pending"], 1);
        assert_eq!(json["entries"].as_array().unwrap().len(), 1);
        assert_eq!(json["entries"][0]["latency_ms"], 320);
        assert!(json.get("api_key").is_none());
    }
}
