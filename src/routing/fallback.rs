//! LLM fallback router.
//!
//! When the semantic router abstains, the message and a short window of
//! conversation context go to the LLM with the surviving candidate routes.
//! Every failure mode (timeout, transport error, unusable output, a route
//! outside the allowed set) collapses to `None`, which the pipeline answers
//! with a clarification instead of a guess.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::route::Route;
use crate::providers::CompletionClient;
use crate::session::ConversationTurn;

/// Narrow classification interface so tests can substitute a canned router.
#[async_trait]
pub trait RouteClassifier: Send + Sync {
    /// Pick one of `allowed`, or `None` when no route fits.
    async fn classify(
        &self,
        text: &str,
        context: &[ConversationTurn],
        allowed: &[Route],
    ) -> Result<Option<Route>>;
}

// ---------------------------------------------------------------------------
// LLM-backed implementation
// ---------------------------------------------------------------------------

pub struct LlmRouteClassifier {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl LlmRouteClassifier {
    pub fn new(client: Arc<dyn CompletionClient>, timeout_ms: u64) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn build_prompt(text: &str, context: &[ConversationTurn], allowed: &[Route]) -> Vec<serde_json::Value> {
        let mut options = String::new();
        for route in allowed {
            options.push_str(&format!("- {}: {}\n", route.as_str(), route.purpose()));
        }
        let system = format!(
            "You classify a user message into exactly one category.\n\
             Categories:\n{options}- none: the message fits no category\n\n\
             Respond with JSON: {{\"route\": \"<category>\"}}. Nothing else."
        );

        let mut messages = vec![serde_json::json!({"role": "system", "content": system})];
        if !context.is_empty() {
            let mut ctx = String::from("Recent conversation:\n");
            for turn in context {
                ctx.push_str(&format!("{}: {}\n", turn.role, turn.text));
            }
            messages.push(serde_json::json!({"role": "system", "content": ctx}));
        }
        messages.push(serde_json::json!({"role": "user", "content": text}));
        messages
    }
}

#[async_trait]
impl RouteClassifier for LlmRouteClassifier {
    async fn classify(
        &self,
        text: &str,
        context: &[ConversationTurn],
        allowed: &[Route],
    ) -> Result<Option<Route>> {
        let messages = Self::build_prompt(text, context, allowed);
        let fut = self.client.chat(&messages, 64, 0.0);
        let reply = match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("fallback classifier request failed: {}", e);
                return Ok(None);
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "fallback classifier timed out");
                return Ok(None);
            }
        };

        let route = parse_route_reply(&reply, allowed);
        debug!(reply = %reply, route = ?route, "fallback classification");
        Ok(route)
    }
}

// ---------------------------------------------------------------------------
// Lenient reply parsing
// ---------------------------------------------------------------------------

static JSON_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""route"\s*:\s*"([a-z_-]+)""#).expect("route regex"));

/// Extract a route name from the model reply.
///
/// Accepts strict JSON, JSON inside code fences or prose, or a bare route
/// name. Anything else, "none", or a route outside the allowed set yields
/// `None`.
pub fn parse_route_reply(reply: &str, allowed: &[Route]) -> Option<Route> {
    let trimmed = reply.trim();

    let name = if let Some(caps) = JSON_ROUTE.captures(trimmed) {
        caps.get(1)?.as_str().to_string()
    } else {
        trimmed
            .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.')
            .to_lowercase()
    };

    if name == "none" {
        return None;
    }
    let route = Route::parse(&name)?;
    if allowed.contains(&route) {
        Some(route)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strict_json() {
        let r = parse_route_reply(r#"{"route": "mail"}"#, &Route::ALL);
        assert_eq!(r, Some(Route::Mail));
    }

    #[test]
    fn test_parse_fenced_json() {
        let r = parse_route_reply("```json\n{\"route\": \"web\"}\n```", &Route::ALL);
        assert_eq!(r, Some(Route::Web));
    }

    #[test]
    fn test_parse_bare_name() {
        let r = parse_route_reply("schedule", &Route::ALL);
        assert_eq!(r, Some(Route::Schedule));
    }

    #[test]
    fn test_parse_none() {
        assert_eq!(parse_route_reply(r#"{"route": "none"}"#, &Route::ALL), None);
        assert_eq!(parse_route_reply("none", &Route::ALL), None);
    }

    #[test]
    fn test_route_outside_allowed_set_rejected() {
        let allowed = [Route::Mail, Route::Workspace];
        assert_eq!(parse_route_reply(r#"{"route": "web"}"#, &allowed), None);
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(
            parse_route_reply("I think this is probably about cooking", &Route::ALL),
            None
        );
    }
}
