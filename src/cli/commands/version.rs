//! Version command implementation.

use crate::error::Result;
use crate::model::Intent;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    intents: usize,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let intents = Intent::SUPPORTED.len();

    if json {
        let output = VersionOutput {
            version,
            build,
            intents,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("sq version {version} ({build}, {intents} intents)");
    Ok(())
}
