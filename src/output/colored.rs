//! Colored formatter implementation with terminal color support

use super::formatter::{format_duration, format_latency, FormattingOptions, PlainFormatter, ResultFormatter, RowData};
use crate::{
    error::Result,
    models::ModelTestEntry,
    session::{Snapshot, StatusCounts},
    types::TestStatus,
};
use colored::*;
use std::time::Duration;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyLevel {
    Fast,     // < 500ms
    Moderate, // 500-2000ms
    Slow,     // > 2000ms
}

impl LatencyLevel {
    pub fn from_latency(latency_ms: u64) -> Self {
        if latency_ms < 500 {
            Self::Fast
        } else if latency_ms <= 2000 {
            Self::Moderate
        } else {
            Self::Slow
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Fast => Color::Green,
            Self::Moderate => Color::Yellow,
            Self::Slow => Color::Magenta,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub error: Color,
    pub testing: Color,
    pub muted: Color,
    pub warning: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            error: Color::Red,
            testing: Color::Cyan,
            muted: Color::BrightBlack,
            warning: Color::Yellow,
        }
    }
}

impl ColorScheme {
    pub fn status(&self, status: TestStatus) -> Color {
        match status {
            TestStatus::Pending => self.muted,
            TestStatus::Testing => self.testing,
            TestStatus::Success => self.success,
            TestStatus::Error => self.error,
        }
    }
}

/// Colored formatter; layout is shared with [`PlainFormatter`]
pub struct ColoredFormatter {
    plain: PlainFormatter,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            plain: PlainFormatter::new(options),
            color_scheme: ColorScheme::default(),
        }
    }

    pub fn with_color_scheme(mut self, color_scheme: ColorScheme) -> Self {
        self.color_scheme = color_scheme;
        self
    }

    fn status_symbol(status: TestStatus) -> &'static str {
        match status {
            TestStatus::Pending => "·",
            TestStatus::Testing => "…",
            TestStatus::Success => "✓",
            TestStatus::Error => "✗",
        }
    }
}

impl ResultFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let border = "═".repeat(title.chars().count() + 4);
        Ok(format!(
            "{}\n  {}  \n{}",
            border.color(self.color_scheme.header),
            title.color(self.color_scheme.header).bold(),
            border.color(self.color_scheme.header)
        ))
    }

    fn format_progress(&self, entry: &ModelTestEntry) -> String {
        let color = self.color_scheme.status(entry.status);
        let symbol = Self::status_symbol(entry.status).color(color);
        match (entry.status, entry.latency_ms, &entry.error_message) {
            (TestStatus::Success, Some(latency), _) => format!(
                "{} {} {}",
                symbol,
                entry.display_name.bold(),
                format_latency(latency).color(LatencyLevel::from_latency(latency).color())
            ),
            (TestStatus::Error, _, Some(error)) => {
                format!("{} {} {}", symbol, entry.display_name.bold(), error.color(color))
            }
            _ => format!(
                "{} {} {}",
                symbol,
                entry.display_name,
                entry.status.as_str().color(self.color_scheme.muted)
            ),
        }
    }

    fn format_results_table(&self, snapshot: &Snapshot<'_>) -> Result<String> {
        let (rows, show_upstream) = self.plain.result_rows(snapshot);
        if rows.is_empty() {
            return self
                .plain
                .format_results_table(snapshot)
                .map(|message| message.color(self.color_scheme.muted).to_string());
        }

        let format = self.plain.results_format(show_upstream);
        let status_col = if show_upstream { 2 } else { 1 };
        let statuses: Vec<TestStatus> = rows.iter().map(|row| row.status).collect();
        let latencies: Vec<Option<u64>> = rows.iter().map(|row| row.latency_ms).collect();
        let cells: Vec<RowData> = rows.into_iter().map(|row| row.cells).collect();

        let scheme = &self.color_scheme;
        Ok(self.plain.render_table(&format, &cells, |row_idx, col_idx, cell| {
            let status = statuses[row_idx];
            if col_idx == 0 {
                cell.bold().to_string()
            } else if col_idx == status_col {
                cell.color(scheme.status(status)).bold().to_string()
            } else if col_idx == status_col + 1 {
                match latencies[row_idx] {
                    Some(latency) => cell.color(LatencyLevel::from_latency(latency).color()).to_string(),
                    None => cell.color(scheme.muted).to_string(),
                }
            } else if col_idx == status_col + 2 && status == TestStatus::Error {
                cell.color(scheme.error).to_string()
            } else {
                cell
            }
        }))
    }

    fn format_summary(&self, counts: &StatusCounts, elapsed: Duration) -> Result<String> {
        let mut lines = vec![
            "Summary:".color(self.color_scheme.header).bold().to_string(),
            format!("Models:    {}", counts.total()),
            format!("Reachable: {}", counts.success.to_string().color(self.color_scheme.success)),
            format!(
                "Failed:    {}",
                if counts.error > 0 {
                    counts.error.to_string().color(self.color_scheme.error).bold()
                } else {
                    counts.error.to_string().normal()
                }
            ),
        ];
        if counts.pending + counts.testing > 0 {
            lines.push(format!(
                "Not run:   {}",
                (counts.pending + counts.testing).to_string().color(self.color_scheme.warning)
            ));
        }
        lines.push(format!("Duration:  {}", format_duration(elapsed)));
        Ok(lines.join("\n"))
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}", "✗".color(self.color_scheme.error).bold(), error.color(self.color_scheme.error))
    }

    fn format_warning(&self, warning: &str) -> String {
        format!("{} {}", "!".color(self.color_scheme.warning).bold(), warning.color(self.color_scheme.warning))
    }

    fn format_success(&self, message: &str) -> String {
        format!("{} {}", "✓".color(self.color_scheme.success).bold(), message.color(self.color_scheme.success))
    }
}
