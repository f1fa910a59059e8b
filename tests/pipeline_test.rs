//! End-to-end: question → analysis → answer, against the sample fixture.

use sq::dispatch::Dispatcher;
use sq::intent::IntentResolver;
use sq::model::{AnalysisSource, ConversationContext, Intent};
use sq::oracle::{BoxedOracle, ScriptedOracle};
use sq::storage::{import_file, SqliteStorage};
use std::path::Path;
use std::time::Duration;

fn seeded() -> SqliteStorage {
    let mut storage = SqliteStorage::open_memory().unwrap();
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/projects.json");
    import_file(&mut storage, &fixture).unwrap();
    storage
}

#[tokio::test]
async fn test_oracle_answer_is_enriched_and_dispatched() {
    let storage = seeded();
    let oracle = ScriptedOracle::replying(r#"{"intent":"project_phase_status","filters":{}}"#);
    let resolver = IntentResolver::new(Some(BoxedOracle::new(oracle.clone())));

    let schema = storage.schema_summary().unwrap();
    let analysis = resolver.resolve("What phase is CABOT-1B in?", &schema, None).await;
    assert_eq!(analysis.intent, Intent::ProjectPhaseStatus);
    assert_eq!(analysis.source, AnalysisSource::Oracle);
    assert_eq!(analysis.filters.project_id(), Some("CABOT-1B"));

    // The oracle saw the question and the schema.
    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].1.contains("What phase is CABOT-1B in?"));
    assert!(prompts[0].1.contains("Table: budgets"));

    let envelope = Dispatcher::new(&storage).execute(&analysis);
    assert!(envelope.success, "{}", envelope.message);
    assert!(envelope.message.starts_with("CABOT-1B is in the Construction phase"));
    assert!(envelope.message.ends_with("currently on Plumbing"));

    let data = envelope.data.unwrap();
    assert_eq!(data["project_id"], "CABOT-1B");
    assert_eq!(data["current_phase"]["name"], "Construction");
    assert_eq!(data["current_phase"]["incomplete_tasks"][0]["name"], "Inspection");
    assert_eq!(data["phase_count"], 3);
}

#[tokio::test]
async fn test_offline_pipeline_uses_pattern_rules() {
    let storage = seeded();
    let resolver = IntentResolver::offline();

    let analysis = resolver.resolve("What phase is CABOT-1B in?", "", None).await;
    assert_eq!(analysis.source, AnalysisSource::Pattern);
    assert_eq!(analysis.filters.project_name(), Some("cabot-1b"));

    let envelope = Dispatcher::new(&storage).execute(&analysis);
    assert!(envelope.success);
    assert_eq!(envelope.data.unwrap()["project_name"], "CABOT-1B");
}

#[tokio::test]
async fn test_slow_oracle_falls_back_within_timeout() {
    let storage = seeded();
    let oracle = ScriptedOracle::slow(Duration::from_secs(5), r#"{"intent":"budget_info"}"#);
    let resolver =
        IntentResolver::new(Some(BoxedOracle::new(oracle))).with_timeout(Duration::from_millis(50));

    let analysis = resolver
        .resolve("Which trades still need a PO for JAIN-1B?", "", None)
        .await;
    assert_eq!(analysis.intent, Intent::TradesNeedingPo);

    let envelope = Dispatcher::new(&storage).execute(&analysis);
    assert!(envelope.success, "{}", envelope.message);
}

#[tokio::test]
async fn test_follow_up_question_reuses_project() {
    let storage = seeded();
    let resolver = IntentResolver::offline();

    let first = resolver
        .resolve("What is the status of JAIN-1B?", "", None)
        .await;
    let context = ConversationContext::from_analysis(&first);

    let follow_up = resolver
        .resolve("What's the budget for it?", "", Some(&context))
        .await;
    assert_eq!(follow_up.intent, Intent::BudgetInfo);

    let envelope = Dispatcher::new(&storage).execute(&follow_up);
    assert!(envelope.success, "{}", envelope.message);
    assert_eq!(envelope.data.unwrap()["project_name"], "JAIN-1B");
}

#[test]
fn test_unknown_question_is_reported_not_raised() {
    let storage = seeded();
    let analysis = IntentResolver::offline().resolve_without_oracle("tell me a joke");
    assert_eq!(analysis.intent, Intent::Unknown);

    let envelope = Dispatcher::new(&storage).execute(&analysis);
    assert!(!envelope.success);
    assert_eq!(envelope.message, "Unsupported intent: unknown");
}
