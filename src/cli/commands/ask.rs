//! Question answering commands.
//!
//! - `sq ask <text>` - resolve a question and answer it
//! - `sq analyze <text>` - resolve only, printing the analysis

use super::{open_storage, print_envelope, runtime};
use crate::cli::AskArgs;
use crate::config::{clear_context, configured_project_codes, read_context, write_context};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::intent::{EntityExtractor, IntentResolver};
use crate::model::{ConversationContext, QueryAnalysis};
use crate::oracle::{create_oracle, resolve_oracle_timeout, BoxedOracle, ScriptedOracle};
use crate::storage::SqliteStorage;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Which oracle, if any, a command should consult.
enum OracleChoice<'a> {
    Offline,
    Reply(&'a str),
    Configured,
}

async fn build_resolver(choice: OracleChoice<'_>, timeout_secs: Option<u64>) -> IntentResolver {
    let oracle = match choice {
        OracleChoice::Offline => None,
        OracleChoice::Reply(text) => Some(BoxedOracle::new(ScriptedOracle::replying(text))),
        OracleChoice::Configured => create_oracle().await,
    };
    let timeout = timeout_secs
        .filter(|s| *s > 0)
        .map_or_else(resolve_oracle_timeout, Duration::from_secs);

    let resolver = IntentResolver::new(oracle)
        .with_timeout(timeout)
        .with_extractor(EntityExtractor::new(&configured_project_codes()));
    debug!(oracle = resolver.has_oracle(), timeout_secs = timeout.as_secs(), "Resolver ready");
    resolver
}

fn resolve(
    storage: &SqliteStorage,
    text: &str,
    choice: OracleChoice<'_>,
    timeout_secs: Option<u64>,
    context: Option<&ConversationContext>,
) -> Result<QueryAnalysis> {
    let schema = storage.schema_summary()?;
    let rt = runtime()?;
    Ok(rt.block_on(async {
        let resolver = build_resolver(choice, timeout_secs).await;
        resolver.resolve(text, &schema, context).await
    }))
}

/// Execute `sq ask`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened. Failures to answer
/// are reported inside the printed envelope instead.
pub fn execute_ask(args: &AskArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let context = match args.conversation.as_deref() {
        Some(id) if args.reset => {
            if !clear_context(id) {
                debug!(conversation = %id, "Conversation context not cleared");
            }
            None
        }
        Some(id) => read_context(id),
        None => None,
    };

    let choice = if args.offline {
        OracleChoice::Offline
    } else if let Some(reply) = &args.oracle_reply {
        OracleChoice::Reply(reply)
    } else {
        OracleChoice::Configured
    };
    let analysis = resolve(&storage, &args.text, choice, args.timeout, context.as_ref())?;

    if let Some(id) = &args.conversation {
        if !write_context(id, &ConversationContext::from_analysis(&analysis)) {
            debug!(conversation = %id, "Conversation context not saved");
        }
    }

    let envelope = Dispatcher::new(&storage).execute(&analysis);
    print_envelope(&envelope, json)
}

/// Execute `sq analyze`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened.
pub fn execute_analyze(text: &str, offline: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let choice = if offline {
        OracleChoice::Offline
    } else {
        OracleChoice::Configured
    };
    let analysis = resolve(&storage, text, choice, None, None)?;

    if json {
        println!("{}", serde_json::to_string(&analysis)?);
        return Ok(());
    }

    println!("{} {}", "Intent:".bold(), analysis.intent);
    println!("{} {:?}", "Source:".bold(), analysis.source);
    if !analysis.tables.is_empty() {
        let tables: Vec<&str> = analysis.tables.iter().map(String::as_str).collect();
        println!("{} {}", "Tables:".bold(), tables.join(", "));
    }
    if !analysis.filters.is_empty() {
        println!("{}", "Filters:".bold());
        for (key, value) in analysis.filters.iter() {
            println!("  {key} = {value}");
        }
    }
    if analysis.generate_chart {
        let chart_type = analysis.chart_type.as_ref().map_or("default", |c| c.as_str());
        println!("{} {chart_type}", "Chart:".bold());
    }
    if !analysis.explanation.is_empty() {
        println!("{} {}", "Explanation:".bold(), analysis.explanation);
    }

    Ok(())
}
