//! End-to-end pipeline tests: routing, confirmation flow, list references,
//! sequence plans, and fallback behavior.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;

use std::collections::VecDeque;
use std::sync::Mutex;

use adjutant::bus::InboundMessage;
use adjutant::config::schema::Config;
use adjutant::handlers::HandlerDeps;
use adjutant::providers::CompletionClient;
use adjutant::reminders::ReminderService;
use adjutant::routing::fallback::RouteClassifier;
use adjutant::routing::{Pipeline, Route};
use adjutant::session::{ConversationTurn, IndexedList, ListKind, SessionStore};
use adjutant::telemetry::{TelemetryEntry, TelemetrySink};

struct AbstainingClassifier;

#[async_trait]
impl RouteClassifier for AbstainingClassifier {
    async fn classify(
        &self,
        _text: &str,
        _context: &[ConversationTurn],
        _allowed: &[Route],
    ) -> Result<Option<Route>> {
        // Stands in for a timed-out or unusable LLM reply.
        Ok(None)
    }
}

/// Completion client that plays back a fixed sequence of replies.
struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedClient {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn chat(
        &self,
        _messages: &[serde_json::Value],
        _max_tokens: u32,
        _temperature: f64,
    ) -> Result<String> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    pipeline: Pipeline,
    deps: HandlerDeps,
    telemetry_path: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let workspace = dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();
    let telemetry_path = dir.path().join("routing.jsonl");

    let deps = HandlerDeps {
        sessions: Arc::new(SessionStore::new()),
        reminders: Arc::new(ReminderService::new(dir.path().join("reminders.json"))),
        workspace,
        client: None,
    };
    let pipeline = Pipeline::new(
        Config::default(),
        deps.clone(),
        Some(Arc::new(AbstainingClassifier)),
        TelemetrySink::spawn(telemetry_path.clone()),
    );
    Fixture {
        _dir: dir,
        pipeline,
        deps,
        telemetry_path,
    }
}

fn msg(text: &str) -> InboundMessage {
    InboundMessage::new("cli", "tester", "chat1", text)
}

async fn telemetry_entries(path: &std::path::Path) -> Vec<TelemetryEntry> {
    // The writer task drains its queue asynchronously.
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Delete confirmation flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_delete_sets_pending_confirmation() {
    let fx = fixture();
    let reply = fx.pipeline.process(&msg("delete report.pdf")).await;

    assert_eq!(reply.route, Some(Route::Workspace));
    assert!(reply.text.contains("report.pdf"));
    assert!(reply.text.contains("yes"));
    fx.deps.sessions.with("chat1", |s| {
        assert_eq!(s.pending_confirmation().unwrap().paths, vec!["report.pdf"]);
    });
}

#[tokio::test]
async fn test_confirm_executes_with_partial_failure() {
    let fx = fixture();
    // b.txt exists, a.txt does not.
    std::fs::write(fx.deps.workspace.join("b.txt"), "data").unwrap();
    fx.pipeline.process(&msg("delete a.txt and b.txt")).await;

    let reply = fx.pipeline.process(&msg("yes")).await;
    assert!(reply.text.contains("Could not delete a.txt"));
    assert!(reply.text.contains("Deleted b.txt"));
    assert!(!fx.deps.workspace.join("b.txt").exists());

    // Pending record is gone even though one item failed.
    fx.deps.sessions.with("chat1", |s| {
        assert!(s.pending_confirmation().is_none());
    });
}

#[tokio::test]
async fn test_cancel_discards_pending() {
    let fx = fixture();
    std::fs::write(fx.deps.workspace.join("b.txt"), "data").unwrap();
    fx.pipeline.process(&msg("delete b.txt")).await;

    let reply = fx.pipeline.process(&msg("no, better not")).await;
    assert!(reply.text.contains("Cancelled"));
    assert!(fx.deps.workspace.join("b.txt").exists());
    fx.deps.sessions.with("chat1", |s| {
        assert!(s.pending_confirmation().is_none());
    });
}

#[tokio::test]
async fn test_unrelated_reply_survives_pending() {
    let fx = fixture();
    fx.pipeline.process(&msg("delete report.pdf")).await;

    // An unrelated question routes normally; the pending record stays.
    let reply = fx.pipeline.process(&msg("what reminders do i have")).await;
    assert!(!reply.text.contains("Deleted"));
    fx.deps.sessions.with("chat1", |s| {
        assert!(s.pending_confirmation().is_some());
    });
}

#[tokio::test]
async fn test_path_prompt_then_path_then_confirm() {
    let fx = fixture();
    std::fs::write(fx.deps.workspace.join("old.txt"), "data").unwrap();

    let reply = fx.pipeline.process(&msg("delete the file please")).await;
    assert!(reply.text.contains("Which file"));
    fx.deps.sessions.with("chat1", |s| {
        assert!(s.pending_path().is_some());
    });

    let reply = fx.pipeline.process(&msg("old.txt")).await;
    assert!(reply.text.contains("old.txt"));
    fx.deps.sessions.with("chat1", |s| {
        assert!(s.pending_path().is_none());
        assert_eq!(s.pending_confirmation().unwrap().paths, vec!["old.txt"]);
    });

    let reply = fx.pipeline.process(&msg("yes")).await;
    assert!(reply.text.contains("Deleted old.txt"));
    assert!(!fx.deps.workspace.join("old.txt").exists());
}

// ---------------------------------------------------------------------------
// List references
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_web_list_ordinal_reference() {
    let fx = fixture();
    fx.deps.sessions.with("chat1", |s| {
        s.remember_list(IndexedList::new(
            ListKind::Web,
            "search results",
            "user",
            vec![
                ("One".into(), "https://one".into()),
                ("Two".into(), "https://two".into()),
                ("Three".into(), "https://three".into()),
                ("Four".into(), "https://four".into()),
                ("Five".into(), "https://five".into()),
            ],
            Duration::minutes(5),
        ));
    });

    let reply = fx.pipeline.process(&msg("open the third one")).await;
    assert_eq!(reply.route, Some(Route::Web));
    assert!(reply.text.contains("https://three"));
}

#[tokio::test]
async fn test_file_list_reference_delete() {
    let fx = fixture();
    std::fs::write(fx.deps.workspace.join("alpha.txt"), "a").unwrap();
    std::fs::write(fx.deps.workspace.join("beta.txt"), "b").unwrap();

    let reply = fx.pipeline.process(&msg("list my files")).await;
    assert!(reply.text.contains("1. alpha.txt"));
    assert!(reply.text.contains("2. beta.txt"));

    let reply = fx.pipeline.process(&msg("delete the second one")).await;
    assert!(reply.text.contains("beta.txt"));
    fx.deps.sessions.with("chat1", |s| {
        assert_eq!(s.pending_confirmation().unwrap().paths, vec!["beta.txt"]);
    });

    fx.pipeline.process(&msg("yes")).await;
    assert!(!fx.deps.workspace.join("beta.txt").exists());
    assert!(fx.deps.workspace.join("alpha.txt").exists());
}

// ---------------------------------------------------------------------------
// Sequence plans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_compound_instruction_runs_both_steps() {
    let fx = fixture();
    let reply = fx
        .pipeline
        .process(&msg("first create notes.txt then list my files"))
        .await;

    assert!(reply.text.contains("Step 1"));
    assert!(reply.text.contains("Step 2"));
    assert!(reply.paused_at_step.is_none());
    assert!(fx.deps.workspace.join("notes.txt").exists());
}

#[tokio::test]
async fn test_plan_step_content_prompt_generates_file_body() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();

    // First reply answers the planner, second answers the step's content
    // sub-prompt.
    let client = Arc::new(ScriptedClient::new(&[
        r#"{"steps": [{"text": "create notes.txt", "contentPrompt": "write a short greeting note"}, {"text": "list my files"}]}"#,
        "hello from the plan",
    ]));
    let deps = HandlerDeps {
        sessions: Arc::new(SessionStore::new()),
        reminders: Arc::new(ReminderService::new(dir.path().join("reminders.json"))),
        workspace: workspace.clone(),
        client: Some(client),
    };
    let pipeline = Pipeline::new(
        Config::default(),
        deps.clone(),
        Some(Arc::new(AbstainingClassifier)),
        TelemetrySink::disabled(),
    );

    // Long enough for LLM planning, no lexical chain cue.
    let reply = pipeline
        .process(&msg(
            "please create a notes file for me with a short greeting inside it for tomorrow morning",
        ))
        .await;

    assert!(reply.text.contains("Step 1"));
    assert!(reply.text.contains("Step 2"));
    let body = std::fs::read_to_string(workspace.join("notes.txt")).unwrap();
    assert_eq!(body, "hello from the plan");
}

#[tokio::test]
async fn test_plan_pauses_on_confirmation() {
    let fx = fixture();
    std::fs::write(fx.deps.workspace.join("report.pdf"), "x").unwrap();

    let reply = fx
        .pipeline
        .process(&msg("first create notes.txt then delete report.pdf"))
        .await;

    assert_eq!(reply.paused_at_step, Some(2));
    assert!(reply.text.contains("Paused at step 2"));
    assert!(fx.deps.workspace.join("notes.txt").exists());
    // The delete waits for consent.
    assert!(fx.deps.workspace.join("report.pdf").exists());
    fx.deps.sessions.with("chat1", |s| {
        assert_eq!(s.pending_confirmation().unwrap().paths, vec!["report.pdf"]);
    });

    let reply = fx.pipeline.process(&msg("yes")).await;
    assert!(reply.text.contains("Deleted report.pdf"));
    assert!(!fx.deps.workspace.join("report.pdf").exists());
}

// ---------------------------------------------------------------------------
// Fallthrough and telemetry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_no_route_falls_through_with_telemetry() {
    let fx = fixture();
    let reply = fx.pipeline.process(&msg("qwyjibo flurble grontle")).await;

    assert!(!reply.handled);
    assert_eq!(reply.route, None);
    assert!(!reply.text.is_empty());

    let entries = telemetry_entries(&fx.telemetry_path).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].final_route, None);
    assert!(!entries[0].handled);
}

#[tokio::test]
async fn test_telemetry_records_decisions() {
    let fx = fixture();
    fx.pipeline.process(&msg("delete report.pdf")).await;

    let entries = telemetry_entries(&fx.telemetry_path).await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.final_route, Some(Route::Workspace));
    assert!(entry.handled);
    assert!(entry.candidates.contains(&Route::Workspace));
    assert_eq!(entry.source, "user");
}

#[tokio::test]
async fn test_reminder_flow_end_to_end() {
    let fx = fixture();
    let reply = fx
        .pipeline
        .process(&msg("remind me to call anna in 2 hours"))
        .await;
    assert_eq!(reply.route, Some(Route::Schedule));
    assert!(reply.text.contains("call anna"));

    let reply = fx.pipeline.process(&msg("list reminders")).await;
    assert!(reply.text.contains("call anna"));
}

#[tokio::test]
async fn test_chats_are_isolated() {
    let fx = fixture();
    fx.pipeline.process(&msg("delete report.pdf")).await;

    let mut other = msg("yes");
    other.chat_id = "chat2".to_string();
    let reply = fx.pipeline.process(&other).await;
    // No pending confirmation in chat2; "yes" routes normally.
    assert!(!reply.text.contains("Deleted"));
    fx.deps.sessions.with("chat1", |s| {
        assert!(s.pending_confirmation().is_some());
    });
}
