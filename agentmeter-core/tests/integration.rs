//! Integration tests for the load -> aggregate pipeline
//!
//! These tests build a real OpenCode-shaped SQLite database in a temp
//! directory, read it through the record store and run the full aggregation.

use agentmeter_core::analytics::{aggregate_at, session_detail, UNKNOWN};
use agentmeter_core::store::{load_corpus, RecordStore, SqliteStore};
use agentmeter_core::{BillingClassifier, ProviderCatalog};
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const NOW: i64 = 1_741_800_000_000; // 2025-03-12T17:20:00Z

fn create_database(dir: &Path) -> PathBuf {
    let path = dir.join("opencode.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE session (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            parent_id TEXT,
            slug TEXT NOT NULL,
            directory TEXT NOT NULL,
            title TEXT NOT NULL,
            version TEXT NOT NULL,
            summary_additions INTEGER,
            summary_deletions INTEGER,
            summary_files INTEGER,
            time_created INTEGER NOT NULL,
            time_updated INTEGER NOT NULL
        );
        CREATE TABLE message (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            time_created INTEGER NOT NULL,
            data TEXT NOT NULL
        );
        "#,
    )
    .unwrap();

    let sessions: [(&str, Option<&str>, &str, i64, i64); 4] = [
        ("ses_root", None, "Fix flaky test", NOW - 7_200_000, NOW - 3_600_000),
        ("ses_child", Some("ses_root"), "", NOW - 6_000_000, NOW - 600_000),
        ("ses_orphan", Some("ses_deleted"), "Orphaned", NOW - 90_000_000, NOW - 86_500_000),
        ("ses_empty", None, "Nothing yet", NOW - 1_000, NOW - 1_000),
    ];
    for (id, parent, title, created, updated) in sessions {
        conn.execute(
            "INSERT INTO session VALUES (?1, 'prj', ?2, ?3, '/work/app', ?4, '1.2.0', NULL, NULL, NULL, ?5, ?6)",
            params![id, parent, format!("{id}-slug"), title, created, updated],
        )
        .unwrap();
    }

    let messages = [
        ("m1", "ses_root", NOW - 7_000_000, r#"{"role":"user","time":{"created":0}}"#.to_string()),
        ("m2", "ses_root", NOW - 6_900_000, assistant("build", "anthropic", "claude-opus-4-6", "1.0", NOW - 6_900_000)),
        ("m3", "ses_root", NOW - 6_800_000, assistant("build", "anthropic", "claude-opus-4-6", "0.5", NOW - 6_800_000)),
        ("m4", "ses_child", NOW - 5_000_000, assistant("explore", "copilot", "gpt-4o", "0", NOW - 5_000_000)),
        ("m5", "ses_child", NOW - 4_000_000, assistant("explore", "copilot", "gpt-4o", "null", NOW - 4_000_000)),
        ("m6", "ses_orphan", NOW - 86_600_000, assistant("", "openai", "gpt-5", "2.0", NOW - 86_600_000)),
        ("m7", "ses_root", NOW - 3_700_000, r#"{"role":"assistant","agent":"build","time":{"created":1}}"#.to_string()),
        ("m8", "ses_root", NOW - 3_650_000, "garbage".to_string()),
    ];
    for (id, session_id, created, data) in messages {
        conn.execute(
            "INSERT INTO message VALUES (?1, ?2, ?3, ?4)",
            params![id, session_id, created, data],
        )
        .unwrap();
    }
    path
}

fn assistant(agent: &str, provider: &str, model: &str, cost: &str, created: i64) -> String {
    format!(
        r#"{{"role":"assistant","agent":"{agent}","providerID":"{provider}","modelID":"{model}","cost":{cost},
            "time":{{"created":{created},"completed":{completed}}},
            "tokens":{{"total":150,"input":100,"output":50,"reasoning":0,"cache":{{"read":300,"write":0}}}}}}"#,
        completed = created + 2_000
    )
}

#[test]
fn test_load_and_aggregate() {
    let temp = TempDir::new().unwrap();
    let path = create_database(temp.path());

    let corpus = load_corpus(&path).expect("load should succeed");
    assert_eq!(corpus.sessions.len(), 4);
    // m8 has an unreadable body
    assert_eq!(corpus.messages.len(), 7);

    let catalog = ProviderCatalog::builtin();
    let now = Utc.timestamp_millis_opt(NOW).unwrap();
    let data = aggregate_at(&corpus.sessions, &corpus.messages, &catalog, &now);

    // Billable: m2, m3, m4, m5 (null cost), m6
    assert_eq!(data.totals.messages, 5);
    assert_eq!(data.totals.cost, 3.5);
    assert_eq!(data.totals.billing_cost, 3.5);
    assert_eq!(data.totals.subscription_cost, 0.0);
    assert_eq!(data.totals.tokens.input, 500);
    assert_eq!(data.totals.sessions, 3);

    // Roots: ses_empty, ses_root (merged with child), ses_orphan
    let roots: Vec<_> = data.sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(roots, vec!["ses_empty", "ses_root", "ses_orphan"]);

    let root = &data.sessions[1];
    assert_eq!(root.message_count, 4);
    assert_eq!(root.total_cost, 1.5);
    assert_eq!(root.updated_at, NOW - 600_000);
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].title, "ses_child-slug");
    assert_eq!(root.agents["explore"].provider, "copilot");

    let agents: Vec<_> = data.agents.iter().map(|a| a.agent.as_str()).collect();
    assert_eq!(agents, vec!["build", "explore", UNKNOWN]);
    assert_eq!(data.agents[0].cache_hit_rate, 0.75);
    assert_eq!(data.agents[0].avg_response_time, 2_000.0);

    let providers: Vec<_> = data.providers.iter().map(|p| p.provider.as_str()).collect();
    assert_eq!(providers, vec!["openai", "anthropic", "copilot"]);

    let timeline_messages: u64 = data.timeline.iter().map(|t| t.messages).sum();
    assert_eq!(timeline_messages, 5);
}

#[test]
fn test_session_detail_over_tree() {
    let temp = TempDir::new().unwrap();
    let path = create_database(temp.path());
    let store = SqliteStore::open(&path).unwrap();

    let session = store
        .list_sessions()
        .unwrap()
        .into_iter()
        .find(|s| s.id == "ses_root")
        .unwrap();
    let messages = store.list_messages_for_session_tree("ses_root").unwrap();
    let catalog = ProviderCatalog::builtin();
    assert!(catalog.is_billing("anthropic"));
    assert!(!catalog.is_billing("copilot"));

    let detail = session_detail(&session, &messages, &catalog);
    assert_eq!(detail.message_count, 4);
    assert_eq!(detail.billing_cost, 1.5);
    assert_eq!(detail.providers.len(), 2);
    assert_eq!(detail.input_tokens, 400);
}

#[test]
fn test_missing_database_aggregates_to_empty() {
    let temp = TempDir::new().unwrap();
    let corpus = load_corpus(&temp.path().join("missing.db")).unwrap();
    let data = agentmeter_core::aggregate(&corpus.sessions, &corpus.messages, &ProviderCatalog::builtin());
    assert!(data.sessions.is_empty());
    assert!(data.agents.is_empty());
    assert_eq!(data.totals.messages, 0);
}
