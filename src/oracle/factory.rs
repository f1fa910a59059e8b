//! Oracle factory.
//!
//! Handles provider detection and creation.

use tracing::debug;

use super::config::{get_oracle_settings, is_oracle_enabled};
use super::gemini::GeminiOracle;
use super::ollama::OllamaOracle;
use super::provider::{BoxedOracle, OracleProvider};
use super::types::OracleProviderType;

/// Available oracle detection result.
#[derive(Debug, Clone)]
pub struct OracleDetection {
    /// Names of reachable providers.
    pub available: Vec<String>,
    /// First available provider.
    pub recommended: Option<String>,
}

/// Detect which oracles are reachable.
pub async fn detect_available_oracles() -> OracleDetection {
    let mut available = Vec::new();

    if OllamaOracle::new().is_available().await {
        available.push("ollama".to_string());
    }

    if let Some(gemini) = GeminiOracle::new() {
        if gemini.is_available().await {
            available.push("gemini".to_string());
        }
    }

    let recommended = available.first().cloned();

    OracleDetection {
        available,
        recommended,
    }
}

/// Create an oracle based on configuration.
///
/// Priority:
/// 1. Explicit provider in config
/// 2. Auto-detect (Ollama preferred, then Gemini)
///
/// Returns `None` if the oracle is disabled or nothing is reachable; the
/// resolver then relies on its deterministic classifier alone.
pub async fn create_oracle() -> Option<BoxedOracle> {
    if !is_oracle_enabled() {
        debug!("Oracle disabled by configuration");
        return None;
    }

    if let Ok(Some(settings)) = get_oracle_settings() {
        if let Some(provider_type) = settings.provider {
            return create_oracle_by_type(provider_type).await;
        }
    }

    let ollama = OllamaOracle::new();
    if ollama.is_available().await {
        return Some(BoxedOracle::new(ollama));
    }

    if let Some(gemini) = GeminiOracle::new() {
        if gemini.is_available().await {
            return Some(BoxedOracle::new(gemini));
        }
    }

    debug!("No oracle available");
    None
}

async fn create_oracle_by_type(provider_type: OracleProviderType) -> Option<BoxedOracle> {
    match provider_type {
        OracleProviderType::Ollama => {
            let oracle = OllamaOracle::new();
            if oracle.is_available().await {
                Some(BoxedOracle::new(oracle))
            } else {
                debug!("Configured Ollama oracle is not reachable");
                None
            }
        }
        OracleProviderType::Gemini => GeminiOracle::new().map(BoxedOracle::new),
    }
}
