//! Per-chat session records behind a TTL-aware store.
//!
//! All mutable per-chat state (pending confirmation, pending path prompt,
//! indexed list context, conversation ring buffer, recent focus) lives in one
//! `ChatSession` record keyed by chat id. The store hands out snapshots and
//! applies mutations under a single lock; the pipeline processes one message
//! per chat at a time, so no finer-grained locking is needed.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::list_context::{IndexedList, ListKind};

/// Default TTL for pending confirmation / path prompt records.
pub const PENDING_TTL_SECS: i64 = 5 * 60;
/// Default TTL for an indexed list context.
pub const LIST_TTL_SECS: i64 = 10 * 60;
/// Bounded per-chat conversation history used as classifier/LLM context.
const HISTORY_CAP: usize = 20;
/// How recent a mail/file focus must be for the anaphora filter rule.
pub const FOCUS_FRESH_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A destructive operation awaiting explicit user consent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub id: String,
    pub chat_id: String,
    pub paths: Vec<String>,
    pub requested_at: DateTime<Local>,
    pub expires_at: DateTime<Local>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl PendingConfirmation {
    pub fn new(chat_id: &str, paths: Vec<String>, source: &str, user_id: Option<&str>) -> Self {
        let now = Local::now();
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            paths,
            requested_at: now,
            expires_at: now + Duration::seconds(PENDING_TTL_SECS),
            source: source.to_string(),
            user_id: user_id.map(|s| s.to_string()),
        }
    }

    pub fn is_expired(&self) -> bool {
        Local::now() > self.expires_at
    }
}

/// "Waiting for the user to name a path" state. Mutually exclusive with
/// [`PendingConfirmation`] for a chat; the confirmation supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPathPrompt {
    pub id: String,
    pub chat_id: String,
    pub requested_at: DateTime<Local>,
    pub expires_at: DateTime<Local>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl PendingPathPrompt {
    pub fn new(chat_id: &str, source: &str, user_id: Option<&str>) -> Self {
        let now = Local::now();
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            requested_at: now,
            expires_at: now + Duration::seconds(PENDING_TTL_SECS),
            source: source.to_string(),
            user_id: user_id.map(|s| s.to_string()),
        }
    }

    pub fn is_expired(&self) -> bool {
        Local::now() > self.expires_at
    }
}

/// One turn of conversation kept for classifier/LLM context only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub role: String,
    pub text: String,
    pub source: String,
    pub at: DateTime<Local>,
}

/// Domain the chat most recently dealt with, for anaphora resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Mail,
    Files,
}

// ---------------------------------------------------------------------------
// ChatSession
// ---------------------------------------------------------------------------

/// All live state for one chat.
#[derive(Default)]
pub struct ChatSession {
    pending_confirmation: Option<PendingConfirmation>,
    pending_path: Option<PendingPathPrompt>,
    list: Option<IndexedList>,
    history: VecDeque<ConversationTurn>,
    focus: Option<(Focus, DateTime<Local>)>,
}

impl ChatSession {
    /// TTL-aware read: an expired record behaves as absent and is dropped.
    pub fn pending_confirmation(&mut self) -> Option<&PendingConfirmation> {
        if self
            .pending_confirmation
            .as_ref()
            .is_some_and(|p| p.is_expired())
        {
            self.pending_confirmation = None;
        }
        self.pending_confirmation.as_ref()
    }

    pub fn pending_path(&mut self) -> Option<&PendingPathPrompt> {
        if self.pending_path.as_ref().is_some_and(|p| p.is_expired()) {
            self.pending_path = None;
        }
        self.pending_path.as_ref()
    }

    /// Set a pending confirmation, superseding any pending path prompt.
    pub fn set_pending_confirmation(&mut self, pending: PendingConfirmation) {
        self.pending_path = None;
        self.pending_confirmation = Some(pending);
    }

    pub fn set_pending_path(&mut self, prompt: PendingPathPrompt) {
        self.pending_path = Some(prompt);
    }

    pub fn take_pending_confirmation(&mut self) -> Option<PendingConfirmation> {
        let p = self.pending_confirmation.take()?;
        if p.is_expired() {
            None
        } else {
            Some(p)
        }
    }

    pub fn clear_pending_path(&mut self) {
        self.pending_path = None;
    }

    /// TTL-aware list context read.
    pub fn list(&mut self) -> Option<&IndexedList> {
        if self.list.as_ref().is_some_and(|l| l.is_expired()) {
            self.list = None;
        }
        self.list.as_ref()
    }

    /// Replace the list context wholesale. Mail and file lists also refresh
    /// the chat's focus; web lists do not.
    pub fn remember_list(&mut self, list: IndexedList) {
        match list.kind {
            ListKind::Mail => self.focus = Some((Focus::Mail, Local::now())),
            ListKind::File => self.focus = Some((Focus::Files, Local::now())),
            ListKind::Web => {}
        }
        self.list = Some(list);
    }

    pub fn push_turn(&mut self, role: &str, text: &str, source: &str) {
        self.history.push_back(ConversationTurn {
            role: role.to_string(),
            text: text.to_string(),
            source: source.to_string(),
            at: Local::now(),
        });
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent_turns(&self, n: usize) -> Vec<ConversationTurn> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = Some((focus, Local::now()));
    }

    /// Focus within the freshness window, if any.
    pub fn fresh_focus(&self) -> Option<Focus> {
        let (focus, at) = self.focus?;
        if Local::now() - at <= Duration::seconds(FOCUS_FRESH_SECS) {
            Some(focus)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Store of per-chat session records.
///
/// `with` runs a closure against the (possibly fresh) record under the lock;
/// reads of TTL-bounded state go through the record's own lazy-expiry
/// accessors, so callers never observe expired records.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, ChatSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with mutable access to the chat's session record.
    pub fn with<R>(&self, chat_id: &str, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        let mut map = self.inner.lock().expect("session store lock poisoned");
        let session = map.entry(chat_id.to_string()).or_default();
        f(session)
    }

    /// Drop a chat's entire session record.
    pub fn delete(&self, chat_id: &str) {
        let mut map = self.inner.lock().expect("session store lock poisoned");
        map.remove(chat_id);
    }
}
