//! Per-conversation context carried between questions.

use serde::{Deserialize, Serialize};

use super::analysis::{Filters, Intent, QueryAnalysis};

/// What the previous question in a conversation resolved to.
///
/// Advisory only: the resolver works without it, and uses it solely to
/// give the oracle some history and to fill in a project the user refers
/// back to ("is it on budget?").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub last_intent: Intent,
    #[serde(default)]
    pub last_filters: Filters,
    /// Unix milliseconds
    pub updated_at: i64,
}

impl ConversationContext {
    #[must_use]
    pub fn from_analysis(analysis: &QueryAnalysis) -> Self {
        Self {
            last_intent: analysis.intent.clone(),
            last_filters: analysis.filters.clone(),
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// JSON object shown to the oracle.
    #[must_use]
    pub fn to_prompt_json(&self) -> serde_json::Value {
        serde_json::json!({
            "last_intent": self.last_intent.as_str(),
            "last_filters": self.last_filters,
        })
    }
}
