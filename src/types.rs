//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// API dialect spoken by the upstream provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderEngine {
    /// OpenAI-compatible `/v1/chat/completions`
    OpenAi,
    /// Anthropic `/v1/messages`
    Anthropic,
    /// Google Gemini `generateContent`
    Gemini,
}

impl ProviderEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEngine::OpenAi => "openai",
            ProviderEngine::Anthropic => "anthropic",
            ProviderEngine::Gemini => "gemini",
        }
    }
}

impl Default for ProviderEngine {
    fn default() -> Self {
        Self::OpenAi
    }
}

impl fmt::Display for ProviderEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderEngine {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "open-ai" | "oai" => Ok(ProviderEngine::OpenAi),
            "anthropic" | "claude" => Ok(ProviderEngine::Anthropic),
            "gemini" | "google" => Ok(ProviderEngine::Gemini),
            other => Err(AppError::parse(format!("Unknown provider engine: {}", other))),
        }
    }
}

/// Per-model test status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Not yet probed in the current run
    Pending,
    /// Probe in flight
    Testing,
    /// Probe succeeded
    Success,
    /// Probe failed, timed out or was cancelled
    Error,
}

impl TestStatus {
    /// Terminal states are the ones a probe resolves to
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestStatus::Success | TestStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pending => "pending",
            TestStatus::Testing => "testing",
            TestStatus::Success => "success",
            TestStatus::Error => "error",
        }
    }
}

impl Default for TestStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_parsing() {
        assert_eq!("openai".parse::<ProviderEngine>().unwrap(), ProviderEngine::OpenAi);
        assert_eq!("Claude".parse::<ProviderEngine>().unwrap(), ProviderEngine::Anthropic);
        assert_eq!(" gemini ".parse::<ProviderEngine>().unwrap(), ProviderEngine::Gemini);
        assert!("bedrock".parse::<ProviderEngine>().is_err());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TestStatus::Pending.is_terminal());
        assert!(!TestStatus::Testing.is_terminal());
        assert!(TestStatus::Success.is_terminal());
        assert!(TestStatus::Error.is_terminal());
        assert_eq!(TestStatus::default(), TestStatus::Pending);
    }

    #[test]
    fn test_engine_serde_lowercase() {
        let json = serde_json::to_string(&ProviderEngine::Anthropic).unwrap();
        assert_eq!(json, "\"anthropic\"");
    }
}
