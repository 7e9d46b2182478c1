//! Core formatting traits and the plain text implementation

use crate::{
    error::{AppError, Result},
    models::ModelTestEntry,
    session::{Snapshot, StatusCounts},
    types::TestStatus,
};
use std::fmt::Write as _;
use std::time::Duration;

/// Main trait for result formatting
pub trait ResultFormatter: Send + Sync {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// One line describing an entry's latest state
    fn format_progress(&self, entry: &ModelTestEntry) -> String;

    /// Table of all entries in the snapshot
    fn format_results_table(&self, snapshot: &Snapshot<'_>) -> Result<String>;

    /// Totals per status and the wall time of the run
    fn format_summary(&self, counts: &StatusCounts, elapsed: Duration) -> Result<String>;

    fn format_error(&self, error: &str) -> String;

    fn format_warning(&self, warning: &str) -> String;

    fn format_success(&self, message: &str) -> String;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show the upstream name and full error text
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Error text is cut to this width unless verbose
    pub max_error_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            max_error_width: 60,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
    pub show_header: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, min_width: usize, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width,
            max_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Cells of the results table, before any styling
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub status: TestStatus,
    pub latency_ms: Option<u64>,
    pub cells: RowData,
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Table layout for the entries in `rows`
    pub fn results_format(&self, show_upstream: bool) -> TableFormat {
        let mut columns = vec![Column::new("Model", Alignment::Left, 5, 48)];
        if show_upstream {
            columns.push(Column::new("Upstream", Alignment::Left, 8, 48));
        }
        columns.push(Column::new("Status", Alignment::Center, 7, 7));
        columns.push(Column::new("Latency", Alignment::Right, 7, 12));
        let error_width = if self.options.verbose_mode { 400 } else { self.options.max_error_width };
        columns.push(Column::new("Detail", Alignment::Left, 6, error_width));

        TableFormat {
            columns,
            show_borders: self.options.table_borders,
            show_header: true,
        }
    }

    /// Unstyled cells for every entry of the snapshot
    pub fn result_rows(&self, snapshot: &Snapshot<'_>) -> (Vec<ResultRow>, bool) {
        let entries: Vec<ModelTestEntry> = snapshot.iter().collect();
        let show_upstream = self.options.verbose_mode || entries.iter().any(ModelTestEntry::is_redirected);

        let rows = entries
            .iter()
            .map(|entry| {
                let mut cells = vec![entry.display_name.clone()];
                if show_upstream {
                    cells.push(entry.upstream_name.clone());
                }
                cells.push(entry.status.as_str().to_string());
                cells.push(entry.latency_ms.map(format_latency).unwrap_or_else(|| "-".to_string()));
                cells.push(entry.error_message.clone().unwrap_or_default());
                ResultRow {
                    status: entry.status,
                    latency_ms: entry.latency_ms,
                    cells,
                }
            })
            .collect();

        (rows, show_upstream)
    }

    /// Render a table; `paint` styles each already padded cell
    pub fn render_table<F>(&self, format: &TableFormat, rows: &[RowData], paint: F) -> String
    where
        F: Fn(usize, usize, String) -> String,
    {
        let widths = calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&horizontal_border(&widths));
                output.push('\n');
            }
            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&create_row(&headers, &widths, format, |_, cell| cell));
            output.push('\n');
            if format.show_borders {
                output.push_str(&horizontal_border(&widths));
                output.push('\n');
            }
        }

        for (row_idx, row) in rows.iter().enumerate() {
            output.push_str(&create_row(row, &widths, format, |col_idx, cell| paint(row_idx, col_idx, cell)));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&horizontal_border(&widths));
        }

        output.trim_end_matches('\n').to_string()
    }
}

/// Format a latency in milliseconds for display
pub fn format_latency(latency_ms: u64) -> String {
    if latency_ms < 1000 {
        format!("{}ms", latency_ms)
    } else {
        format!("{:.2}s", latency_ms as f64 / 1000.0)
    }
}

/// Format a wall time in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_secs_f64() * 1000.0;
    if ms < 1000.0 {
        format!("{:.0}ms", ms)
    } else if ms < 60_000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        let minutes = (ms / 60_000.0) as u64;
        let seconds = (ms % 60_000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

fn calculate_column_widths(format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
    format
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let content = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            content
                .max(column.min_width)
                .max(column.header.chars().count())
                .min(column.max_width)
        })
        .collect()
}

fn create_row<F>(data: &[String], widths: &[usize], format: &TableFormat, paint: F) -> String
where
    F: Fn(usize, String) -> String,
{
    let mut row = String::new();
    if format.show_borders {
        row.push('|');
    }

    for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
        let alignment = format.columns.get(idx).map(|c| c.alignment).unwrap_or(Alignment::Left);
        let padded = paint(idx, align_text(cell, width, alignment));

        if format.show_borders {
            row.push(' ');
            row.push_str(&padded);
            row.push_str(" |");
        } else {
            row.push_str(&padded);
            row.push_str("  ");
        }
    }

    row.trim_end().to_string()
}

fn horizontal_border(widths: &[usize]) -> String {
    let mut border = String::from("+");
    for &width in widths {
        border.push_str(&"-".repeat(width + 2));
        border.push('+');
    }
    border
}

/// Pad or truncate `text` to exactly `width` characters
fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let len = text.chars().count();
    if len > width {
        if width <= 3 {
            return text.chars().take(width).collect();
        }
        return text.chars().take(width - 3).collect::<String>() + "...";
    }

    let padding = width - len;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(padding - left_pad))
        }
    }
}

impl ResultFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.chars().count() + 4);

        writeln!(output, "{}", border).map_err(|e| AppError::io(format!("Failed to format header: {}", e)))?;
        writeln!(output, "  {}  ", title).map_err(|e| AppError::io(format!("Failed to format header: {}", e)))?;
        write!(output, "{}", border).map_err(|e| AppError::io(format!("Failed to format header: {}", e)))?;

        Ok(output)
    }

    fn format_progress(&self, entry: &ModelTestEntry) -> String {
        let detail = match (entry.status, entry.latency_ms, &entry.error_message) {
            (TestStatus::Success, Some(latency), _) => format!(" {}", format_latency(latency)),
            (TestStatus::Error, _, Some(error)) => format!(" {}", error),
            _ => String::new(),
        };
        format!("[{:>7}] {}{}", entry.status.as_str(), entry.display_name, detail)
    }

    fn format_results_table(&self, snapshot: &Snapshot<'_>) -> Result<String> {
        let (rows, show_upstream) = self.result_rows(snapshot);
        if rows.is_empty() {
            return Ok(match snapshot.filter() {
                Some(filter) => format!("No models match '{}'", filter),
                None => "No models configured".to_string(),
            });
        }

        let format = self.results_format(show_upstream);
        let cells: Vec<RowData> = rows.into_iter().map(|row| row.cells).collect();
        Ok(self.render_table(&format, &cells, |_, _, cell| cell))
    }

    fn format_summary(&self, counts: &StatusCounts, elapsed: Duration) -> Result<String> {
        let mut output = String::new();
        let map_err = |e: std::fmt::Error| AppError::io(format!("Failed to format summary: {}", e));

        writeln!(output, "Summary:").map_err(map_err)?;
        writeln!(output, "--------").map_err(map_err)?;
        writeln!(output, "Models:    {}", counts.total()).map_err(map_err)?;
        writeln!(output, "Reachable: {}", counts.success).map_err(map_err)?;
        writeln!(output, "Failed:    {}", counts.error).map_err(map_err)?;
        if counts.pending + counts.testing > 0 {
            writeln!(output, "Not run:   {}", counts.pending + counts.testing).map_err(map_err)?;
        }
        write!(output, "Duration:  {}", format_duration(elapsed)).map_err(map_err)?;

        Ok(output)
    }

    fn format_error(&self, error: &str) -> String {
        format!("ERROR: {}", error)
    }

    fn format_warning(&self, warning: &str) -> String {
        format!("WARNING: {}", warning)
    }

    fn format_success(&self, message: &str) -> String {
        format!("OK: {}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TestEntryStore;

    fn store() -> TestEntryStore {
        let store = TestEntryStore::new(vec![("gpt-4o", "gpt-4o"), ("gpt-4o-mini", "gpt-4o-mini")]);
        store.set("gpt-4o", TestStatus::Success, Some(50), None).unwrap();
        store
            .set("gpt-4o-mini", TestStatus::Error, None, Some("HTTP 401: bad key".to_string()))
            .unwrap();
        store
    }

    fn formatter() -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_align_text() {
        assert_eq!(align_text("ab", 4, Alignment::Left), "ab  ");
        assert_eq!(align_text("ab", 4, Alignment::Right), "  ab");
        assert_eq!(align_text("ab", 5, Alignment::Center), " ab  ");
        assert_eq!(align_text("abcdefgh", 6, Alignment::Left), "abc...");
    }

    #[test]
    fn test_format_latency_and_duration() {
        assert_eq!(format_latency(50), "50ms");
        assert_eq!(format_latency(1500), "1.50s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(75)), "1m15.0s");
    }

    #[test]
    fn test_results_table() {
        let store = store();
        let table = formatter().format_results_table(&store.snapshot(None)).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("+-"));
        assert!(lines[1].contains("Model") && lines[1].contains("Latency"));
        assert!(!lines[1].contains("Upstream"));
        assert!(lines[3].contains("gpt-4o") && lines[3].contains("50ms"));
        assert!(lines[4].contains("error") && lines[4].contains("HTTP 401: bad key"));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_results_table_with_filter() {
        let store = store();
        let table = formatter().format_results_table(&store.snapshot(Some("MINI"))).unwrap();
        assert!(table.contains("gpt-4o-mini"));
        assert_eq!(table.lines().count(), 5);

        let empty = formatter().format_results_table(&store.snapshot(Some("claude"))).unwrap();
        assert_eq!(empty, "No models match 'claude'");
    }

    #[test]
    fn test_upstream_column_when_redirected() {
        let store = TestEntryStore::new(vec![("fast", "gpt-4o-mini")]);
        let table = formatter().format_results_table(&store.snapshot(None)).unwrap();
        assert!(table.contains("Upstream"));
        assert!(table.contains("gpt-4o-mini"));
    }

    #[test]
    fn test_progress_lines() {
        let store = store();
        let formatter = formatter();
        assert_eq!(
            formatter.format_progress(&store.get("gpt-4o").unwrap()),
            "[success] gpt-4o 50ms"
        );
        assert_eq!(
            formatter.format_progress(&store.get("gpt-4o-mini").unwrap()),
            "[  error] gpt-4o-mini HTTP 401: bad key"
        );
    }

    #[test]
    fn test_summary() {
        let counts = store().counts();
        let summary = formatter().format_summary(&counts, Duration::from_millis(1200)).unwrap();
        assert!(summary.contains("Models:    2"));
        assert!(summary.contains("Reachable: 1"));
        assert!(summary.contains("Failed:    1"));
        assert!(!summary.contains("Not run"));
        assert!(summary.contains("1.20s"));
    }
}
