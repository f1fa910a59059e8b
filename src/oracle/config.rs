//! Oracle configuration resolution.
//!
//! Every setting resolves as: environment variable → config file → default.

use crate::config::{load_config, save_config};
use crate::error::Result;
use std::time::Duration;

use super::types::OracleSettings;

/// Default time allowed for one classification call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Get oracle settings from the config file.
///
/// # Errors
///
/// Returns an error if the config file cannot be read.
pub fn get_oracle_settings() -> Result<Option<OracleSettings>> {
    Ok(load_config()?.oracle)
}

/// Save oracle settings, merging with what is already stored.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or written.
pub fn save_oracle_settings(settings: &OracleSettings) -> Result<OracleSettings> {
    let mut config = load_config()?;
    let existing = config.oracle.unwrap_or_default();
    let merged = OracleSettings {
        enabled: settings.enabled.or(existing.enabled),
        provider: settings.provider.or(existing.provider),
        OLLAMA_ENDPOINT: settings.OLLAMA_ENDPOINT.clone().or(existing.OLLAMA_ENDPOINT),
        OLLAMA_MODEL: settings.OLLAMA_MODEL.clone().or(existing.OLLAMA_MODEL),
        GEMINI_API_KEY: settings.GEMINI_API_KEY.clone().or(existing.GEMINI_API_KEY),
        GEMINI_MODEL: settings.GEMINI_MODEL.clone().or(existing.GEMINI_MODEL),
        GEMINI_ENDPOINT: settings.GEMINI_ENDPOINT.clone().or(existing.GEMINI_ENDPOINT),
        timeout_secs: settings.timeout_secs.or(existing.timeout_secs),
    };
    config.oracle = Some(merged.clone());
    save_config(&config)?;
    Ok(merged)
}

/// Remove oracle settings from the config file.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or written.
pub fn reset_oracle_settings() -> Result<()> {
    let mut config = load_config()?;
    config.oracle = None;
    save_config(&config)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn resolve_setting(
    env: &str,
    from_config: impl FnOnce(OracleSettings) -> Option<String>,
    default: &str,
) -> String {
    env_value(env)
        .or_else(|| get_oracle_settings().ok().flatten().and_then(from_config))
        .unwrap_or_else(|| default.to_string())
}

/// Resolve the Ollama endpoint.
pub fn resolve_ollama_endpoint() -> String {
    resolve_setting("OLLAMA_ENDPOINT", |s| s.OLLAMA_ENDPOINT, "http://localhost:11434")
}

/// Resolve the Ollama chat model.
pub fn resolve_ollama_model() -> String {
    resolve_setting("OLLAMA_MODEL", |s| s.OLLAMA_MODEL, "llama3.2")
}

/// Resolve the Gemini model.
pub fn resolve_gemini_model() -> String {
    resolve_setting("GEMINI_MODEL", |s| s.GEMINI_MODEL, "gemini-1.5-flash")
}

/// Resolve the Gemini API base URL.
pub fn resolve_gemini_endpoint() -> String {
    resolve_setting(
        "GEMINI_ENDPOINT",
        |s| s.GEMINI_ENDPOINT,
        "https://generativelanguage.googleapis.com/v1beta",
    )
}

/// Resolve the Gemini API key, if any.
pub fn resolve_gemini_api_key() -> Option<String> {
    env_value("GEMINI_API_KEY")
        .or_else(|| get_oracle_settings().ok().flatten().and_then(|s| s.GEMINI_API_KEY))
}

/// Resolve the per-call classification timeout.
pub fn resolve_oracle_timeout() -> Duration {
    let secs = env_value("SITEQUERY_ORACLE_TIMEOUT")
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| get_oracle_settings().ok().flatten().and_then(|s| s.timeout_secs))
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Check if the oracle is enabled.
pub fn is_oracle_enabled() -> bool {
    if let Ok(enabled) = std::env::var("SITEQUERY_ORACLE_ENABLED") {
        return enabled != "false" && enabled != "0";
    }

    if let Ok(Some(settings)) = get_oracle_settings() {
        return settings.enabled.unwrap_or(true);
    }

    true
}
