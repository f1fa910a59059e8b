//! SiteQuery - natural-language questions about construction projects
//!
//! This crate provides the core functionality for the `sq` CLI tool.
//!
//! # Architecture
//!
//! - [`intent`] - Question → [`model::QueryAnalysis`] (oracle, pattern rules, keywords)
//! - [`dispatch`] - [`model::QueryAnalysis`] → [`model::ResultEnvelope`]
//! - [`progress`] - Phase/subphase/task progress aggregation
//! - [`oracle`] - Classification oracle providers (Ollama, Gemini)
//! - [`storage`] - SQLite database layer and fixture import
//! - [`model`] - Data types (Project, Phase, Subphase, QueryAnalysis)
//! - [`config`] - Configuration and conversation context cache
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod model;
pub mod oracle;
pub mod progress;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};
