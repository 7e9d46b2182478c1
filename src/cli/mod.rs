//! Command-line interface

use crate::{defaults::MAX_PROBE_TIMEOUT_SECONDS, types::ProviderEngine};
use clap::{ArgAction, Parser};

/// Model Connectivity Tester - checks which of a provider's models respond
#[derive(Parser, Debug, Clone)]
#[command(name = "mct")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Provider API dialect (openai, anthropic, gemini)
    #[arg(long, value_parser = parse_engine)]
    pub engine: Option<ProviderEngine>,

    /// Provider base URL, e.g. https://api.openai.com
    #[arg(long)]
    pub base_url: Option<String>,

    /// Provider API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model to test (can be used multiple times)
    #[arg(long = "model", action = ArgAction::Append)]
    pub model: Vec<String>,

    /// Models to test (comma-separated)
    #[arg(long)]
    pub models: Option<String>,

    /// Send probes for DISPLAY to UPSTREAM instead (can be used multiple times)
    #[arg(long = "redirect", value_name = "DISPLAY=UPSTREAM", action = ArgAction::Append)]
    pub redirects: Vec<String>,

    /// Number of parallel probes (clamped to 1-10)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Per-probe timeout in seconds
    #[arg(short, long, value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Only show models whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,

    /// Probe a single model instead of the whole list
    #[arg(long, value_name = "MODEL")]
    pub only: Option<String>,

    /// Print the final results as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Describe the supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.json && self.verbose {
            return Err("--json cannot be combined with --verbose".to_string());
        }

        Ok(())
    }

    /// Whether colors should be used, with explicit flags taking precedence
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Models named on the command line, in order
    pub fn model_list(&self) -> Vec<String> {
        let mut models: Vec<String> = self.model.iter().map(|m| m.trim().to_string()).collect();
        if let Some(list) = &self.models {
            models.extend(crate::models::config::split_list(list));
        }
        models.retain(|m| !m.is_empty());
        models
    }
}

fn parse_engine(s: &str) -> Result<ProviderEngine, String> {
    s.parse().map_err(|e: crate::error::AppError| e.to_string())
}

/// Parse a timeout given in whole seconds
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > MAX_PROBE_TIMEOUT_SECONDS {
                Err(format!("Duration cannot exceed {} seconds", MAX_PROBE_TIMEOUT_SECONDS))
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if std::env::var("TERM").map(|term| term == "dumb").unwrap_or(false) {
        return false;
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    cfg!(unix)
}
