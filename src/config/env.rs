//! Environment variable handling and .env file management

use crate::defaults::{MAX_CONCURRENCY, MAX_PROBE_TIMEOUT_SECONDS, MIN_CONCURRENCY};
use crate::error::{AppError, ErrorContext, Result};
use crate::models::config::{parse_redirect, split_list};
use crate::types::ProviderEngine;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env from the current directory if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific .env file if it exists.
    ///
    /// Variables already present in the process environment are not overwritten.
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path).with_context(|| format!("Failed to load {}", path.display()))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        format!(
            r#"# Model Connectivity Tester Configuration
#
# Values here are used as defaults and can be overridden by real environment
# variables and by command-line arguments.

# Provider API dialect: openai, anthropic or gemini
# PROVIDER_ENGINE=openai

# Provider base URL
# PROVIDER_BASE_URL=https://api.openai.com

# Provider API key
# PROVIDER_API_KEY=sk-...

# Models to test (comma-separated, in display order)
# PROVIDER_MODELS=gpt-4o,gpt-4o-mini

# Display name to upstream name redirects (comma-separated display=upstream)
# MODEL_REDIRECTS=gpt-4o=gpt-4o-2024-08-06

# Number of parallel probes ({min}-{max})
# TEST_CONCURRENCY=3

# Per-probe timeout in seconds (1-{max_timeout})
# PROBE_TIMEOUT_SECONDS=30

# Enable colored output (true/false)
# ENABLE_COLOR=true

# Example configurations:
#
# Anthropic with a pinned model version:
# PROVIDER_ENGINE=anthropic
# PROVIDER_BASE_URL=https://api.anthropic.com
# PROVIDER_MODELS=claude-sonnet
# MODEL_REDIRECTS=claude-sonnet=claude-3-5-sonnet-20241022
#
# A slow self-hosted gateway:
# TEST_CONCURRENCY=1
# PROBE_TIMEOUT_SECONDS=120
"#,
            min = MIN_CONCURRENCY,
            max = MAX_CONCURRENCY,
            max_timeout = MAX_PROBE_TIMEOUT_SECONDS,
        )
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .with_context(|| format!("Failed to write example .env file {}", path.display()))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "PROVIDER_ENGINE" => {
                value
                    .parse::<ProviderEngine>()
                    .map_err(|e| AppError::config(format!("Invalid PROVIDER_ENGINE value '{}': {}", value, e)))?;
            }
            "PROVIDER_BASE_URL" => {
                let parsed = url::Url::parse(value.trim())
                    .map_err(|e| AppError::config(format!("Invalid PROVIDER_BASE_URL '{}': {}", value, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AppError::config(format!(
                        "PROVIDER_BASE_URL must use http or https: {}",
                        value
                    )));
                }
            }
            "PROVIDER_MODELS" => {
                if split_list(value).is_empty() {
                    return Err(AppError::config("PROVIDER_MODELS must name at least one model"));
                }
            }
            "MODEL_REDIRECTS" => {
                for pair in split_list(value) {
                    parse_redirect(&pair)
                        .map_err(|e| AppError::config(format!("Invalid MODEL_REDIRECTS entry '{}': {}", pair, e)))?;
                }
            }
            "TEST_CONCURRENCY" => {
                let concurrency: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid TEST_CONCURRENCY value '{}': {}", value, e)))?;
                if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
                    return Err(AppError::config(format!(
                        "TEST_CONCURRENCY must be between {} and {}, got: {}",
                        MIN_CONCURRENCY, MAX_CONCURRENCY, concurrency
                    )));
                }
            }
            "PROBE_TIMEOUT_SECONDS" => {
                let timeout: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_TIMEOUT_SECONDS value '{}': {}", value, e)))?;
                if timeout == 0 || timeout > MAX_PROBE_TIMEOUT_SECONDS {
                    return Err(AppError::config(format!(
                        "PROBE_TIMEOUT_SECONDS must be between 1 and {}, got: {}",
                        MAX_PROBE_TIMEOUT_SECONDS, timeout
                    )));
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Supported environment variables as (name, description, example)
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PROVIDER_ENGINE", "Provider API dialect (openai, anthropic, gemini)", "openai"),
            ("PROVIDER_BASE_URL", "Provider base URL", "https://api.openai.com"),
            ("PROVIDER_API_KEY", "Provider API key", "sk-..."),
            ("PROVIDER_MODELS", "Comma-separated list of models to test", "gpt-4o,gpt-4o-mini"),
            ("MODEL_REDIRECTS", "Comma-separated display=upstream pairs", "gpt-4o=gpt-4o-2024-08-06"),
            ("TEST_CONCURRENCY", "Number of parallel probes (1-10)", "3"),
            ("PROBE_TIMEOUT_SECONDS", "Per-probe timeout in seconds (1-300)", "30"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<22} {}\n", var, description));
            help.push_str(&format!("  {:<22} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }

    /// Validate the contents of a .env file line by line.
    ///
    /// Returns `None` when the file does not exist.
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

        let mut warnings = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once('=') {
                Some((key, value)) => {
                    if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                        warnings.push(format!("Line '{}': {}", line, e));
                    }
                }
                None => warnings.push(format!("Line '{}': expected KEY=value", line)),
            }
        }

        Ok(Some(warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_example_content_mentions_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Model Connectivity Tester Configuration"));
    }

    #[test]
    fn test_save_example_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let error = EnvManager::save_example_env_file(dir.path()).unwrap_err();

        assert_eq!(error.category(), "IO");
        assert!(error.to_string().contains("Failed to write example .env file"));
        assert!(error.to_string().contains(&dir.path().display().to_string()));
    }

    #[test]
    fn test_malformed_env_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this line has no separator").unwrap();

        let error = EnvManager::load_env_file_from(file.path(), false).unwrap_err();
        assert_eq!(error.category(), "CONFIG");
        assert!(error.to_string().contains("Failed to load"));
        assert!(error.to_string().contains("Environment file error"));
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("PROVIDER_ENGINE", "anthropic").is_ok());
        assert!(EnvManager::validate_env_var("PROVIDER_BASE_URL", "https://api.openai.com").is_ok());
        assert!(EnvManager::validate_env_var("PROVIDER_MODELS", "gpt-4o, gpt-4o-mini").is_ok());
        assert!(EnvManager::validate_env_var("MODEL_REDIRECTS", "a=b,c=d").is_ok());
        assert!(EnvManager::validate_env_var("TEST_CONCURRENCY", "10").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT_SECONDS", "300").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("UNRELATED", "anything").is_ok());

        assert!(EnvManager::validate_env_var("PROVIDER_ENGINE", "cohere").is_err());
        assert!(EnvManager::validate_env_var("PROVIDER_BASE_URL", "not-a-url").is_err());
        assert!(EnvManager::validate_env_var("PROVIDER_BASE_URL", "ftp://host").is_err());
        assert!(EnvManager::validate_env_var("PROVIDER_MODELS", " , ").is_err());
        assert!(EnvManager::validate_env_var("MODEL_REDIRECTS", "a=").is_err());
        assert!(EnvManager::validate_env_var("TEST_CONCURRENCY", "0").is_err());
        assert!(EnvManager::validate_env_var("TEST_CONCURRENCY", "11").is_err());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT_SECONDS", "301").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_check_env_file() {
        let missing = std::path::Path::new("/definitely/not/here/.env");
        assert!(EnvManager::check_env_file(missing).unwrap().is_none());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "PROVIDER_ENGINE=openai").unwrap();
        writeln!(file, "TEST_CONCURRENCY=42").unwrap();
        writeln!(file, "garbage").unwrap();

        let warnings = EnvManager::check_env_file(file.path()).unwrap().unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("TEST_CONCURRENCY"));
        assert!(warnings[1].contains("expected KEY=value"));
    }

    #[test]
    fn test_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("PROVIDER_BASE_URL"));
        assert!(help.contains("Configuration Priority"));
    }
}
