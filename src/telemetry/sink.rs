//! Routing telemetry sink.
//!
//! One JSON object per line, append-only, never mutated after write. A single
//! writer task drains an unbounded queue so concurrent chats cannot interleave
//! partial lines. Recording is fire-and-forget; a full disk or unwritable path
//! degrades to a warning, never to a failed message.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::warn;

use crate::routing::route::Route;
use crate::utils::truncate_string;

const INPUT_TEXT_CAP: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredAlternative {
    pub route: Route,
    pub score: f64,
}

/// One routing decision, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEntry {
    pub timestamp: DateTime<Local>,
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub source: String,
    pub input: String,
    /// Routes whose detectors applied, before filtering.
    pub candidates: Vec<Route>,
    /// Routes surviving the context filter, and the rule that narrowed them.
    pub filtered: Vec<Route>,
    pub filter_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_route: Option<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<ScoredAlternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_route: Option<Route>,
    /// Committed route; `None` serializes as "none".
    #[serde(
        default,
        serialize_with = "serialize_final",
        deserialize_with = "deserialize_final"
    )]
    pub final_route: Option<Route>,
    pub handled: bool,
}

fn serialize_final<S: serde::Serializer>(
    route: &Option<Route>,
    ser: S,
) -> Result<S::Ok, S::Error> {
    match route {
        Some(r) => ser.serialize_str(r.as_str()),
        None => ser.serialize_str("none"),
    }
}

fn deserialize_final<'de, D: serde::Deserializer<'de>>(de: D) -> Result<Option<Route>, D::Error> {
    let s = String::deserialize(de)?;
    Ok(Route::parse(&s))
}

impl TelemetryEntry {
    pub fn new(chat_id: &str, user_id: Option<&str>, source: &str, input: &str) -> Self {
        Self {
            timestamp: Local::now(),
            chat_id: chat_id.to_string(),
            user_id: user_id.map(|s| s.to_string()),
            source: source.to_string(),
            input: truncate_string(input, INPUT_TEXT_CAP),
            candidates: Vec::new(),
            filtered: Vec::new(),
            filter_reason: String::new(),
            semantic_route: None,
            semantic_score: None,
            alternatives: Vec::new(),
            llm_route: None,
            final_route: None,
            handled: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Handle to the single telemetry writer task.
#[derive(Clone)]
pub struct TelemetrySink {
    tx: Option<UnboundedSender<TelemetryEntry>>,
}

impl TelemetrySink {
    /// Spawn the writer task appending to `path`.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<TelemetryEntry>();
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = append_line(&path, &entry) {
                    warn!("telemetry append failed: {}", e);
                }
            }
        });
        Self { tx: Some(tx) }
    }

    /// A sink that drops every record.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue one record; returns immediately.
    pub fn record(&self, entry: TelemetryEntry) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(entry);
        }
    }
}

fn append_line(path: &PathBuf, entry: &TelemetryEntry) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(entry)?;
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(f, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_route_serializes_as_none() {
        let entry = TelemetryEntry::new("c1", None, "user", "hello");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"finalRoute\":\"none\""));
        assert!(json.contains("\"handled\":false"));
    }

    #[test]
    fn test_input_truncated() {
        let long = "x".repeat(500);
        let entry = TelemetryEntry::new("c1", None, "user", &long);
        assert!(entry.input.len() <= INPUT_TEXT_CAP);
        assert!(entry.input.ends_with("..."));
    }

    #[test]
    fn test_roundtrip() {
        let mut entry = TelemetryEntry::new("c1", Some("u1"), "seq-step-2", "open it");
        entry.final_route = Some(Route::Web);
        entry.semantic_route = Some(Route::Web);
        entry.semantic_score = Some(1.4);
        entry.handled = true;
        let json = serde_json::to_string(&entry).unwrap();
        let back: TelemetryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.final_route, Some(Route::Web));
        assert_eq!(back.source, "seq-step-2");
        assert!(back.handled);
    }

    #[tokio::test]
    async fn test_writer_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routing.jsonl");
        let sink = TelemetrySink::spawn(path.clone());

        for i in 0..3 {
            sink.record(TelemetryEntry::new("c1", None, "user", &format!("msg {i}")));
        }
        // Writer task runs asynchronously.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 3);
        for line in raw.lines() {
            let _: TelemetryEntry = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn test_disabled_sink_is_noop() {
        let sink = TelemetrySink::disabled();
        sink.record(TelemetryEntry::new("c1", None, "user", "hello"));
    }
}
