//! Default conversational handler.
//!
//! Covers the small-talk route and every message no other route claims. With
//! a completion client configured it holds a short LLM conversation over the
//! recent turns; without one it answers from a small canned set.

use anyhow::Result;
use async_trait::async_trait;

use super::{Handler, HandlerDeps, HandlerOutcome, HandlerRequest};
use crate::routing::route::Route;

const SYSTEM_PROMPT: &str = "You are adjutant, a concise personal assistant. \
Reply in at most three sentences.";

const CONTEXT_TURNS: usize = 6;

pub struct ChatHandler;

/// Produce the fallthrough conversational reply. Also used by the pipeline
/// when no route commits at all.
pub async fn converse(req: &HandlerRequest, deps: &HandlerDeps) -> String {
    if let Some(client) = &deps.client {
        let mut messages = vec![serde_json::json!({"role": "system", "content": SYSTEM_PROMPT})];
        let turns = deps
            .sessions
            .with(&req.chat_id, |s| s.recent_turns(CONTEXT_TURNS));
        for turn in turns {
            messages.push(serde_json::json!({"role": turn.role, "content": turn.text}));
        }
        messages.push(serde_json::json!({"role": "user", "content": req.raw}));
        if let Ok(reply) = client.chat(&messages, 512, 0.7).await {
            return reply;
        }
    }
    canned_reply(&req.normalized)
}

fn canned_reply(normalized: &str) -> String {
    if normalized.contains("thank") {
        "Any time.".to_string()
    } else if normalized.starts_with("hello")
        || normalized.starts_with("hi")
        || normalized.starts_with("hey")
        || normalized.starts_with("good morning")
        || normalized.starts_with("good evening")
    {
        "Hello! What can I do for you?".to_string()
    } else if normalized.contains("how are you") {
        "All systems running. What do you need?".to_string()
    } else {
        "I'm not sure what you'd like me to do. You can ask me about files, \
         mail, the web, or reminders."
            .to_string()
    }
}

#[async_trait]
impl Handler for ChatHandler {
    fn route(&self) -> Route {
        Route::SmallTalk
    }

    async fn handle(&self, req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        Ok(HandlerOutcome::reply(converse(req, deps).await))
    }
}
