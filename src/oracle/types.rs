//! Oracle types and configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Oracle provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProviderType {
    Ollama,
    Gemini,
}

impl fmt::Display for OracleProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for OracleProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "gemini" | "google" => Ok(Self::Gemini),
            _ => Err(format!("Unknown oracle provider: {s} (expected ollama or gemini)")),
        }
    }
}

/// Oracle settings stored in `~/.sitequery/config.json`.
///
/// Upper-case keys match the environment variables that override them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct OracleSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<OracleProviderType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub OLLAMA_ENDPOINT: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub OLLAMA_MODEL: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub GEMINI_API_KEY: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub GEMINI_MODEL: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub GEMINI_ENDPOINT: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Provider metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
    pub endpoint: String,
}
