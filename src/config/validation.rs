//! Configuration validation rules beyond the hard checks in `Config::validate`

use crate::{
    defaults::{MAX_CONCURRENCY, MIN_CONCURRENCY},
    error::Result,
    models::Config,
    session::clamp_concurrency,
};
use colored::Colorize;
use std::collections::HashSet;

/// Configuration validator producing non-fatal warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run the hard checks, then collect warnings for questionable settings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_provider(config));
        warnings.extend(Self::validate_models(config));
        warnings.extend(Self::validate_performance_settings(config));
        Ok(warnings)
    }

    fn validate_provider(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Ok(parsed) = url::Url::parse(config.base_url.trim()) {
            if parsed.scheme() == "http" {
                let local = matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]"));
                warnings.push(ValidationWarning::new(
                    if local { ValidationLevel::Info } else { ValidationLevel::Warning },
                    format!("Base URL '{}' uses plain HTTP; the API key is sent unencrypted", config.base_url),
                ));
            }
            if parsed.query().is_some() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Base URL '{}' includes query parameters, which are dropped from probes", config.base_url),
                ));
            }
        }

        if config.api_key.trim().is_empty() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "No API key configured; most providers will answer every probe with HTTP 401".to_string(),
            ));
        }

        warnings
    }

    fn validate_models(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        let mut seen = HashSet::new();
        for model in &config.models {
            if !seen.insert(model.trim()) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Model '{}' is listed more than once; only the first is tested", model.trim()),
                ));
            }
        }

        for display in config.model_redirects.keys() {
            if !seen.contains(display.as_str()) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Redirect for '{}' does not match any configured model", display),
                ));
            }
        }

        if let Some(only) = &config.only {
            if !seen.contains(only.trim()) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("--only '{}' does not match any configured model", only),
                ));
            }
        }

        warnings
    }

    fn validate_performance_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        let clamped = clamp_concurrency(config.concurrency);
        if clamped != config.concurrency {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Concurrency {} is outside {}-{}; using {}",
                    config.concurrency, MIN_CONCURRENCY, MAX_CONCURRENCY, clamped
                ),
            ));
        }

        if config.timeout_seconds < 5 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Timeout of {}s may be too short for a model's first token", config.timeout_seconds),
            ));
        } else if config.timeout_seconds > 120 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long timeout of {}s will slow down failure detection", config.timeout_seconds),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if !use_color {
            return format!("{} {}", tag, self.message);
        }
        let tag = match self.level {
            ValidationLevel::Info => tag.blue(),
            ValidationLevel::Warning => tag.yellow().bold(),
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            base_url: "https://api.example.com".to_string(),
            api_key: "sk-test".to_string(),
            models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
            ..Default::default()
        }
    }

    fn messages(warnings: &[ValidationWarning]) -> Vec<&str> {
        warnings.iter().map(|w| w.message.as_str()).collect()
    }

    #[test]
    fn test_clean_config_has_no_warnings() {
        assert!(validate_config(&config()).unwrap().is_empty());
    }

    #[test]
    fn test_hard_errors_propagate() {
        let mut config = config();
        config.models.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_plain_http_and_missing_key() {
        let mut config = config();
        config.base_url = "http://gateway.internal".to_string();
        config.api_key.clear();

        let warnings = validate_config(&config).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.level == ValidationLevel::Warning));

        config.base_url = "http://localhost:8080".to_string();
        config.api_key = "sk".to_string();
        let warnings = validate_config(&config).unwrap();
        assert_eq!(warnings[0].level, ValidationLevel::Info);
    }

    #[test]
    fn test_model_warnings() {
        let mut config = config();
        config.models.push("gpt-4o".to_string());
        config.model_redirects.insert("claude".to_string(), "claude-3".to_string());
        config.only = Some("gemini".to_string());

        let warnings = validate_config(&config).unwrap();
        let messages = messages(&warnings);
        assert!(messages.iter().any(|m| m.contains("listed more than once")));
        assert!(messages.iter().any(|m| m.contains("Redirect for 'claude'")));
        assert!(messages.iter().any(|m| m.contains("--only 'gemini'")));
    }

    #[test]
    fn test_concurrency_clamp_warning() {
        let mut config = config();
        config.concurrency = 25;
        let warnings = validate_config(&config).unwrap();
        assert_eq!(messages(&warnings), vec!["Concurrency 25 is outside 1-10; using 10"]);
    }

    #[test]
    fn test_warning_format() {
        let warning = ValidationWarning::new(ValidationLevel::Warning, "careful".to_string());
        assert_eq!(warning.format(false), "[WARNING] careful");
        assert!(warning.format(true).contains("careful"));
    }
}
