//! Intent resolver: oracle first, deterministic fallbacks after.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::extractor::EntityExtractor;
use super::json::extract_json_object;
use super::literal_regex;
use super::patterns::{classify, keyword_fallback};
use super::prompts::{build_user_prompt, QUERY_ANALYSIS_PROMPT};
use crate::error::Error;
use crate::model::{ConversationContext, QueryAnalysis};
use crate::oracle::config::DEFAULT_TIMEOUT_SECS;
use crate::oracle::BoxedOracle;

/// Words that point back at the project of the previous question.
static BACK_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r"(?i)\b(it|this project|that project|the same project|this one|that one)\b")
});

/// Resolves free text into a [`QueryAnalysis`].
///
/// Holds no per-question state; one resolver can serve any number of
/// questions.
pub struct IntentResolver {
    oracle: Option<BoxedOracle>,
    timeout: Duration,
    extractor: EntityExtractor,
}

impl IntentResolver {
    /// Create a resolver. `None` skips straight to the pattern classifier.
    #[must_use]
    pub fn new(oracle: Option<BoxedOracle>) -> Self {
        Self {
            oracle,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            extractor: EntityExtractor::default(),
        }
    }

    /// A resolver that never calls an oracle.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: EntityExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Resolve `text`. Never fails: the worst outcome is intent `unknown`.
    pub async fn resolve(
        &self,
        text: &str,
        schema_summary: &str,
        context: Option<&ConversationContext>,
    ) -> QueryAnalysis {
        if text.trim().is_empty() {
            return QueryAnalysis::unknown("Empty query");
        }

        let analysis = match self.ask_oracle(text, schema_summary, context).await {
            Some(analysis) => {
                info!(intent = %analysis.intent, "Resolved by oracle");
                self.extractor.enrich(analysis, text)
            }
            None => self.resolve_without_oracle(text),
        };

        carry_over_project(analysis, text, context)
    }

    /// Pattern rules, then keyword heuristics, then `unknown`.
    #[must_use]
    pub fn resolve_without_oracle(&self, text: &str) -> QueryAnalysis {
        if let Some(analysis) = classify(text) {
            info!(intent = %analysis.intent, "Resolved by pattern rules");
            return analysis;
        }

        if let Some(analysis) = keyword_fallback(text) {
            info!(intent = %analysis.intent, "Resolved by keyword heuristics");
            return analysis;
        }

        info!("Could not classify query");
        QueryAnalysis::unknown("Failed to analyze query")
    }

    /// One bounded oracle round trip. `None` on any failure.
    async fn ask_oracle(
        &self,
        text: &str,
        schema_summary: &str,
        context: Option<&ConversationContext>,
    ) -> Option<QueryAnalysis> {
        let oracle = self.oracle.as_ref()?;
        let user_prompt = build_user_prompt(text, schema_summary, context);

        debug!(provider = %oracle.info().name, "Querying oracle");
        let reply = match tokio::time::timeout(
            self.timeout,
            oracle.classify(QUERY_ANALYSIS_PROMPT, &user_prompt),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, "Oracle call failed, falling back to pattern rules");
                return None;
            }
            Err(_) => {
                let e = Error::OracleTimeout {
                    seconds: self.timeout.as_secs(),
                };
                warn!(error = %e, "Falling back to pattern rules");
                return None;
            }
        };

        debug!(chars = reply.len(), "Parsing oracle reply");
        let parsed = extract_json_object(&reply).and_then(QueryAnalysis::from_oracle_value);
        if parsed.is_none() {
            warn!("Oracle reply held no JSON object, falling back to pattern rules");
        }
        parsed
    }
}

/// Fill in the previous turn's project when the question refers back to it.
fn carry_over_project(
    mut analysis: QueryAnalysis,
    text: &str,
    context: Option<&ConversationContext>,
) -> QueryAnalysis {
    let Some(ctx) = context else {
        return analysis;
    };
    if analysis.filters.project_reference().is_some() || !BACK_REFERENCE.is_match(text) {
        return analysis;
    }

    for key in ["project_id", "project_name"] {
        if let Some(value) = ctx.last_filters.get(key) {
            if analysis.filters.insert_if_absent(key, value.clone()) {
                debug!(key, "Carried project over from conversation context");
            }
        }
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisSource, Intent};
    use crate::oracle::{ScriptedOracle, ScriptedReply};

    fn resolver(oracle: ScriptedOracle) -> IntentResolver {
        IntentResolver::new(Some(BoxedOracle::new(oracle)))
    }

    #[tokio::test]
    async fn test_fenced_oracle_reply_is_enriched_without_overwrite() {
        let oracle = ScriptedOracle::replying(
            "```json\n{\"intent\": \"project_status\", \"filters\": {\"project_id\": \"JAIN-1B\"}}\n```",
        );
        let analysis = resolver(oracle.clone())
            .resolve("status of CABOT-1B next week", "Table: projects", None)
            .await;

        assert_eq!(analysis.intent, Intent::ProjectStatus);
        assert_eq!(analysis.source, AnalysisSource::Oracle);
        assert_eq!(analysis.filters.project_id(), Some("JAIN-1B"));
        assert!(analysis.filters.time_period().is_some());

        let prompts = oracle.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, QUERY_ANALYSIS_PROMPT);
        assert!(prompts[0].1.contains("Table: projects"));
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_patterns() {
        let analysis = resolver(ScriptedOracle::failing("connection refused"))
            .resolve("What phase is CABOT-1B in?", "", None)
            .await;
        assert_eq!(analysis.intent, Intent::ProjectPhaseStatus);
        assert_eq!(analysis.source, AnalysisSource::Pattern);
        // Pattern results are returned unenriched.
        assert!(!analysis.filters.contains("project_id"));
        assert_eq!(analysis.filters.project_name(), Some("cabot-1b"));
    }

    #[tokio::test]
    async fn test_unparsable_reply_falls_back() {
        let analysis = resolver(ScriptedOracle::replying("I am not sure what you mean."))
            .resolve("show me the budget", "", None)
            .await;
        assert_eq!(analysis.intent, Intent::BudgetInfo);
        assert_eq!(analysis.source, AnalysisSource::Keyword);
    }

    #[tokio::test]
    async fn test_timeout_is_treated_as_failure() {
        let oracle = ScriptedOracle::slow(
            Duration::from_millis(500),
            r#"{"intent": "budget_info"}"#,
        );
        let analysis = resolver(oracle)
            .with_timeout(Duration::from_millis(20))
            .resolve("list all projects", "", None)
            .await;
        assert_eq!(analysis.intent, Intent::ListProjects);
        assert_eq!(analysis.source, AnalysisSource::Pattern);
    }

    #[tokio::test]
    async fn test_reply_without_intent_is_unknown_but_enriched() {
        let analysis = resolver(ScriptedOracle::replying(r#"{"tables": ["projects"]}"#))
            .resolve("anything on ELMGROVE-1B?", "", None)
            .await;
        assert_eq!(analysis.intent, Intent::Unknown);
        assert_eq!(analysis.source, AnalysisSource::Oracle);
        assert_eq!(analysis.filters.project_id(), Some("ELMGROVE-1B"));
    }

    #[tokio::test]
    async fn test_nothing_matches_is_unknown() {
        let analysis = IntentResolver::offline().resolve("good morning", "", None).await;
        assert!(analysis.intent.is_unknown());
        assert!(analysis.filters.is_empty());

        let analysis = IntentResolver::offline().resolve("   ", "", None).await;
        assert!(analysis.intent.is_unknown());
    }

    #[tokio::test]
    async fn test_back_reference_carries_project() {
        let previous = QueryAnalysis::new(Intent::ProjectStatus).with_filter("project_id", "JAIN-1B");
        let ctx = ConversationContext::from_analysis(&previous);
        let oracle = ScriptedOracle::new([
            ScriptedReply::Text(r#"{"intent": "budget_info", "filters": {}}"#.into()),
        ]);

        let analysis = resolver(oracle.clone())
            .resolve("is it over budget?", "", Some(&ctx))
            .await;
        assert_eq!(analysis.intent, Intent::BudgetInfo);
        assert_eq!(analysis.filters.project_id(), Some("JAIN-1B"));
        assert!(oracle.prompts()[0].1.contains("Conversation context"));

        // No back-reference: nothing carried.
        let analysis = resolver(oracle).resolve("total budget", "", Some(&ctx)).await;
        assert!(analysis.filters.project_id().is_none());
    }
}
