//! Configuration data model and validation

use crate::defaults::MAX_PROBE_TIMEOUT_SECONDS;
use crate::types::{AppError, ProviderEngine, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API dialect of the upstream provider
    #[serde(default)]
    pub engine: ProviderEngine,

    /// Provider base URL, e.g. `https://api.openai.com`
    #[serde(default)]
    pub base_url: String,

    /// Provider API key
    #[serde(default)]
    pub api_key: String,

    /// Models advertised by the provider, in display order
    #[serde(default)]
    pub models: Vec<String>,

    /// Display name to upstream name redirects
    #[serde(default)]
    pub model_redirects: BTreeMap<String, String>,

    /// Requested number of parallel workers (clamped when the session is built)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-probe timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Case-insensitive substring filter applied to displayed results
    #[serde(default)]
    pub filter: Option<String>,

    /// Probe just this model instead of running the whole list
    #[serde(default)]
    pub only: Option<String>,

    /// Print the final snapshot as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: ProviderEngine::default(),
            base_url: String::new(),
            api_key: String::new(),
            models: Vec::new(),
            model_redirects: BTreeMap::new(),
            concurrency: default_concurrency(),
            timeout_seconds: default_timeout_secs(),
            filter: None,
            only: None,
            json_output: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validate the configuration and return the first hard error
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::config("Provider base URL is required (--base-url or PROVIDER_BASE_URL)"));
        }

        match url::Url::parse(self.base_url.trim()) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!(
                        "Provider base URL must use http or https: {}",
                        self.base_url
                    )));
                }
            }
            Err(e) => {
                return Err(AppError::config(format!("Invalid provider base URL '{}': {}", self.base_url, e)));
            }
        }

        if self.models.is_empty() {
            return Err(AppError::config("At least one model is required (--model or PROVIDER_MODELS)"));
        }

        if self.models.iter().any(|m| m.trim().is_empty()) {
            return Err(AppError::config("Model names cannot be empty"));
        }

        for (display, upstream) in &self.model_redirects {
            if display.trim().is_empty() || upstream.trim().is_empty() {
                return Err(AppError::config(format!(
                    "Model redirect '{}={}' must name both sides",
                    display, upstream
                )));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > MAX_PROBE_TIMEOUT_SECONDS {
            return Err(AppError::config(format!(
                "Timeout cannot exceed {} seconds",
                MAX_PROBE_TIMEOUT_SECONDS
            )));
        }

        Ok(())
    }

    /// `(display_name, upstream_name)` pairs in model order, first occurrence wins
    pub fn model_pairs(&self) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        self.models
            .iter()
            .map(|m| m.trim())
            .filter(|m| seen.insert(m.to_string()))
            .map(|m| {
                let upstream = self
                    .model_redirects
                    .get(m)
                    .cloned()
                    .unwrap_or_else(|| m.to_string());
                (m.to_string(), upstream)
            })
            .collect()
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(engine) = std::env::var("PROVIDER_ENGINE") {
            self.engine = engine
                .parse()
                .map_err(|e| AppError::config(format!("Invalid PROVIDER_ENGINE value '{}': {}", engine, e)))?;
        }

        if let Ok(base_url) = std::env::var("PROVIDER_BASE_URL") {
            self.base_url = base_url.trim().to_string();
        }

        if let Ok(api_key) = std::env::var("PROVIDER_API_KEY") {
            self.api_key = api_key.trim().to_string();
        }

        if let Ok(models) = std::env::var("PROVIDER_MODELS") {
            self.models = split_list(&models);
        }

        if let Ok(redirects) = std::env::var("MODEL_REDIRECTS") {
            self.model_redirects = split_list(&redirects)
                .iter()
                .map(|pair| parse_redirect(pair))
                .collect::<Result<BTreeMap<_, _>>>()
                .map_err(|e| AppError::config(format!("Invalid MODEL_REDIRECTS value '{}': {}", redirects, e)))?;
        }

        if let Ok(concurrency) = std::env::var("TEST_CONCURRENCY") {
            self.concurrency = concurrency
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TEST_CONCURRENCY value '{}': {}", concurrency, e)))?;
        }

        if let Ok(timeout) = std::env::var("PROBE_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout
                .parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Split a comma-separated list, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse one `display=upstream` redirect
pub fn parse_redirect(value: &str) -> Result<(String, String)> {
    match value.split_once('=') {
        Some((display, upstream)) if !display.trim().is_empty() && !upstream.trim().is_empty() => {
            Ok((display.trim().to_string(), upstream.trim().to_string()))
        }
        _ => Err(AppError::parse(format!(
            "expected display=upstream, got '{}'",
            value
        ))),
    }
}

// Default value functions for serde
fn default_concurrency() -> usize {
    crate::defaults::DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
