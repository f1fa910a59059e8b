//! Intent resolution.
//!
//! Turns a free-text question into a [`QueryAnalysis`](crate::model::QueryAnalysis):
//!
//! ```text
//! text ──► oracle ──► JSON repair ──► entity extractor ──┐
//!            │ (unreachable, timeout, unparsable)        │
//!            ▼                                           ▼
//!      pattern rules ──► keyword heuristics ──► unknown  analysis
//! ```
//!
//! Every path yields a well-formed analysis; nothing here returns an error.

pub mod extractor;
pub mod json;
pub mod patterns;
pub mod prompts;
pub mod resolver;

pub use extractor::{EntityExtractor, DEFAULT_PROJECT_CODES};
pub use json::extract_json_object;
pub use patterns::{classify, keyword_fallback};
pub use prompts::{build_user_prompt, QUERY_ANALYSIS_PROMPT};
pub use resolver::IntentResolver;

use regex::Regex;

/// Compile a pattern literal. The rule tables are fixed at build time and
/// exercised by their tests, so a failure here is a programming error.
pub(crate) fn literal_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("pattern literal must compile")
}
