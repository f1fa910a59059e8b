//! Classification oracle.
//!
//! An oracle is a language model asked to classify a question into a JSON
//! [`QueryAnalysis`](crate::model::QueryAnalysis). Providers:
//! - **Ollama** (local): `/api/chat` in JSON mode
//! - **Gemini** (cloud): requires `GEMINI_API_KEY`
//! - **Scripted**: replays fixed replies, for tests and reproductions
//!
//! # Configuration
//!
//! Settings live under `oracle` in `~/.sitequery/config.json`. Environment
//! variables take precedence:
//! - `OLLAMA_ENDPOINT` (default: `http://localhost:11434`)
//! - `OLLAMA_MODEL` (default: `llama3.2`)
//! - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_ENDPOINT`
//! - `SITEQUERY_ORACLE_TIMEOUT` in seconds (default: 20)
//! - `SITEQUERY_ORACLE_ENABLED` (default: `true`)

pub mod config;
pub mod factory;
pub mod gemini;
pub mod ollama;
pub mod provider;
pub mod scripted;
pub mod types;

pub use config::{
    get_oracle_settings, is_oracle_enabled, reset_oracle_settings, resolve_oracle_timeout,
    save_oracle_settings,
};
pub use factory::{create_oracle, detect_available_oracles, OracleDetection};
pub use gemini::GeminiOracle;
pub use ollama::OllamaOracle;
pub use provider::{BoxedOracle, OracleProvider};
pub use scripted::{ScriptedOracle, ScriptedReply};
pub use types::{OracleProviderType, OracleSettings, ProviderInfo};
