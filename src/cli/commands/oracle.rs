//! Oracle command implementation.
//!
//! - `status` - Show provider availability and configuration
//! - `configure` - Change oracle settings

use super::runtime;
use crate::cli::OracleCommands;
use crate::error::{Error, Result};
use crate::oracle::config::{resolve_gemini_model, resolve_ollama_endpoint, resolve_ollama_model};
use crate::oracle::{
    create_oracle, detect_available_oracles, get_oracle_settings, is_oracle_enabled,
    reset_oracle_settings, resolve_oracle_timeout, save_oracle_settings, OracleProviderType, OracleSettings,
};
use serde::Serialize;

#[derive(Serialize)]
struct StatusOutput {
    enabled: bool,
    configured_provider: Option<String>,
    timeout_secs: u64,
    available_providers: Vec<ProviderStatus>,
    active_provider: Option<ActiveProviderInfo>,
}

#[derive(Serialize)]
struct ProviderStatus {
    name: String,
    available: bool,
    model: String,
}

#[derive(Serialize)]
struct ActiveProviderInfo {
    name: String,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ConfigureOutput {
    success: bool,
    message: String,
    settings: OracleSettings,
}

/// Execute an oracle command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or written, or
/// the arguments are invalid.
pub fn execute(command: &OracleCommands, json: bool) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(async {
        match command {
            OracleCommands::Status => execute_status(json).await,
            OracleCommands::Configure {
                provider,
                model,
                endpoint,
                api_key,
                timeout,
                enable,
                disable,
                reset,
            } => {
                if *reset {
                    return execute_reset(json).await;
                }
                let update = build_update(
                    provider.as_deref(),
                    model.clone(),
                    endpoint.clone(),
                    api_key.clone(),
                    *timeout,
                    *enable,
                    *disable,
                )?;
                execute_configure(update, json).await
            }
        }
    })
}

async fn execute_status(json: bool) -> Result<()> {
    let enabled = is_oracle_enabled();
    let settings = get_oracle_settings().unwrap_or_default();
    let detection = detect_available_oracles().await;
    let active = if enabled { create_oracle().await } else { None };

    let configured_provider = settings.as_ref().and_then(|s| s.provider).map(|p| p.to_string());
    let providers = vec![
        ProviderStatus {
            name: "ollama".to_string(),
            available: detection.available.iter().any(|p| p == "ollama"),
            model: resolve_ollama_model(),
        },
        ProviderStatus {
            name: "gemini".to_string(),
            available: detection.available.iter().any(|p| p == "gemini"),
            model: resolve_gemini_model(),
        },
    ];
    let active_info = active.as_ref().map(|oracle| {
        let info = oracle.info();
        ActiveProviderInfo {
            name: info.name,
            model: info.model,
            endpoint: info.endpoint,
        }
    });
    let timeout_secs = resolve_oracle_timeout().as_secs();

    if json {
        let output = StatusOutput {
            enabled,
            configured_provider,
            timeout_secs,
            available_providers: providers,
            active_provider: active_info,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Oracle Status");
    println!("=============");
    println!();
    println!("Enabled: {}", if enabled { "yes" } else { "no" });
    if let Some(p) = &configured_provider {
        println!("Configured Provider: {p}");
    }
    println!("Timeout: {timeout_secs}s");
    println!();

    println!("Available Providers:");
    for p in &providers {
        let mark = if p.available { "✓" } else { "✗" };
        println!("  {mark} {} ({})", p.name, p.model);
    }
    println!();

    if let Some(active) = &active_info {
        println!("Active Provider:");
        println!("  Name:     {}", active.name);
        println!("  Model:    {}", active.model);
        println!("  Endpoint: {}", active.endpoint);
    } else if enabled {
        println!("No oracle available; questions are classified by pattern rules.");
        println!();
        println!("To enable the oracle:");
        println!("  - Run Ollama locally at {}", resolve_ollama_endpoint());
        println!("  - Or set the GEMINI_API_KEY environment variable");
    }

    Ok(())
}

/// Settings to merge into the stored configuration; `None` when nothing
/// was asked to change.
#[allow(clippy::fn_params_excessive_bools)]
fn build_update(
    provider: Option<&str>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout: Option<u64>,
    enable: bool,
    disable: bool,
) -> Result<Option<(OracleSettings, Vec<&'static str>)>> {
    if enable && disable {
        return Err(Error::InvalidArgument(
            "Cannot specify both --enable and --disable".to_string(),
        ));
    }

    let mut settings = OracleSettings::default();
    let mut messages = Vec::new();

    if enable || disable {
        settings.enabled = Some(enable);
        messages.push(if enable { "Oracle enabled" } else { "Oracle disabled" });
    }

    if let Some(p) = provider {
        settings.provider = Some(p.parse::<OracleProviderType>().map_err(Error::InvalidArgument)?);
        messages.push("Provider configured");
    }

    // Model and endpoint apply to the named provider, else the stored one.
    let target = match settings.provider {
        Some(p) => p,
        None if model.is_some() || endpoint.is_some() => get_oracle_settings()?
            .and_then(|s| s.provider)
            .unwrap_or(OracleProviderType::Ollama),
        None => OracleProviderType::Ollama,
    };

    if let Some(m) = model {
        match target {
            OracleProviderType::Ollama => settings.OLLAMA_MODEL = Some(m),
            OracleProviderType::Gemini => settings.GEMINI_MODEL = Some(m),
        }
        messages.push("Model configured");
    }

    if let Some(e) = endpoint {
        match target {
            OracleProviderType::Ollama => settings.OLLAMA_ENDPOINT = Some(e),
            OracleProviderType::Gemini => settings.GEMINI_ENDPOINT = Some(e),
        }
        messages.push("Endpoint configured");
    }

    if let Some(key) = api_key {
        settings.GEMINI_API_KEY = Some(key);
        messages.push("API key configured");
    }

    if let Some(secs) = timeout {
        if secs == 0 {
            return Err(Error::InvalidArgument("Timeout must be at least 1 second".to_string()));
        }
        settings.timeout_secs = Some(secs);
        messages.push("Timeout configured");
    }

    Ok((!messages.is_empty()).then_some((settings, messages)))
}

async fn execute_configure(update: Option<(OracleSettings, Vec<&'static str>)>, json: bool) -> Result<()> {
    let Some((settings, messages)) = update else {
        return execute_status(json).await;
    };

    let mut merged = save_oracle_settings(&settings)?;
    let message = messages.join(", ");

    if json {
        if merged.GEMINI_API_KEY.is_some() {
            merged.GEMINI_API_KEY = Some("********".to_string());
        }
        let output = ConfigureOutput {
            success: true,
            message,
            settings: merged,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Configuration updated: {message}");
        println!();
        execute_status(false).await?;
    }

    Ok(())
}

async fn execute_reset(json: bool) -> Result<()> {
    reset_oracle_settings()?;

    if json {
        let output = ConfigureOutput {
            success: true,
            message: "Oracle settings reset".to_string(),
            settings: OracleSettings::default(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Oracle settings reset to defaults");
        println!();
        execute_status(false).await?;
    }

    Ok(())
}
