//! The routing pipeline.
//!
//! One message runs to completion before the chat's next message starts:
//! confirmation interception, sequence planning, then per-step detection,
//! context filtering, semantic scoring, LLM fallback, and handler dispatch,
//! with one telemetry record per routing decision.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bus::InboundMessage;
use crate::config::schema::Config;
use crate::handlers::workspace::{delete_report, execute_delete};
use crate::handlers::{chat, HandlerDeps, HandlerRegistry, HandlerRequest};
use crate::routing::detect::DetectorBank;
use crate::routing::fallback::RouteClassifier;
use crate::routing::filter::{filter, ChatView};
use crate::routing::normalize::normalize;
use crate::routing::planner::Planner;
use crate::routing::route::Route;
use crate::routing::semantic::SemanticRouter;
use crate::session::{classify_reply, confirmation_prompt, plausible_path, PendingConfirmation, ReplyKind};
use crate::telemetry::{ScoredAlternative, TelemetryEntry, TelemetrySink};

/// What the pipeline produced for one inbound message.
#[derive(Debug, Clone)]
pub struct PipelineReply {
    pub text: String,
    pub route: Option<Route>,
    pub handled: bool,
    /// Set when a sequence plan paused on a pending confirmation.
    pub paused_at_step: Option<usize>,
}

pub struct Pipeline {
    config: Config,
    bank: DetectorBank,
    semantic: SemanticRouter,
    classifier: Option<Arc<dyn RouteClassifier>>,
    planner: Planner,
    registry: HandlerRegistry,
    deps: HandlerDeps,
    telemetry: TelemetrySink,
}

impl Pipeline {
    pub fn new(
        config: Config,
        deps: HandlerDeps,
        classifier: Option<Arc<dyn RouteClassifier>>,
        telemetry: TelemetrySink,
    ) -> Self {
        let semantic = SemanticRouter::new(config.routing.clone());
        let planner = Planner::new(
            config.planner.clone(),
            deps.client.clone(),
            config.routing.llm_timeout_ms,
        );
        Self {
            config,
            bank: DetectorBank::standard(),
            semantic,
            classifier,
            planner,
            registry: HandlerRegistry::standard(),
            deps,
            telemetry,
        }
    }

    /// Process one inbound message end to end and return the reply.
    pub async fn process(&self, msg: &InboundMessage) -> PipelineReply {
        let normalized = normalize(&msg.content);

        if msg.source == "user" {
            self.deps.sessions.with(&msg.chat_id, |s| {
                s.push_turn("user", &msg.content, &msg.source)
            });
        }

        let reply = self.process_inner(msg, &normalized).await;

        self.deps.sessions.with(&msg.chat_id, |s| {
            s.push_turn("assistant", &reply.text, &msg.source)
        });
        reply
    }

    async fn process_inner(&self, msg: &InboundMessage, normalized: &str) -> PipelineReply {
        // Confirmation and path-prompt interception come before everything
        // else; an unrelated reply falls through with the pending state
        // intact.
        if let Some(reply) = self.intercept_pending(msg, normalized) {
            return reply;
        }

        // Sequence planning applies to root user messages only; steps and
        // reminder deliveries never re-plan.
        if msg.source == "user" {
            if let Some(plan) = self.planner.plan(&msg.content).await {
                return self.run_plan(msg, plan).await;
            }
        }

        self.route_one(msg, normalized, None).await
    }

    // -----------------------------------------------------------------------
    // Pending-state interception
    // -----------------------------------------------------------------------

    fn intercept_pending(&self, msg: &InboundMessage, normalized: &str) -> Option<PipelineReply> {
        let has_confirmation = self
            .deps
            .sessions
            .with(&msg.chat_id, |s| s.pending_confirmation().is_some());

        if has_confirmation {
            match classify_reply(normalized) {
                ReplyKind::Confirm => {
                    let pending = self
                        .deps
                        .sessions
                        .with(&msg.chat_id, |s| s.take_pending_confirmation())?;
                    let results = execute_delete(&self.deps.workspace, &pending.paths);
                    let text = delete_report(&results);
                    info!(chat = %msg.chat_id, items = results.len(), "confirmed delete executed");

                    let mut entry = self.base_entry(msg);
                    entry.final_route = Some(Route::Workspace);
                    entry.filter_reason = "confirmation-reply".to_string();
                    entry.handled = true;
                    self.telemetry.record(entry);

                    return Some(PipelineReply {
                        text,
                        route: Some(Route::Workspace),
                        handled: true,
                        paused_at_step: None,
                    });
                }
                ReplyKind::Cancel => {
                    self.deps
                        .sessions
                        .with(&msg.chat_id, |s| s.take_pending_confirmation());
                    let mut entry = self.base_entry(msg);
                    entry.final_route = Some(Route::Workspace);
                    entry.filter_reason = "confirmation-reply".to_string();
                    entry.handled = true;
                    self.telemetry.record(entry);
                    return Some(PipelineReply {
                        text: "Cancelled. Nothing was deleted.".to_string(),
                        route: Some(Route::Workspace),
                        handled: true,
                        paused_at_step: None,
                    });
                }
                ReplyKind::Unrelated => return None,
            }
        }

        let has_path_prompt = self
            .deps
            .sessions
            .with(&msg.chat_id, |s| s.pending_path().is_some());
        if has_path_prompt {
            if let Some(path) = plausible_path(&msg.content) {
                let paths = vec![path];
                let pending = PendingConfirmation::new(
                    &msg.chat_id,
                    paths.clone(),
                    &msg.source,
                    Some(&msg.sender_id),
                );
                self.deps.sessions.with(&msg.chat_id, |s| {
                    s.clear_pending_path();
                    s.set_pending_confirmation(pending);
                });
                let mut entry = self.base_entry(msg);
                entry.final_route = Some(Route::Workspace);
                entry.filter_reason = "path-reply".to_string();
                entry.handled = true;
                self.telemetry.record(entry);
                return Some(PipelineReply {
                    text: confirmation_prompt(&paths),
                    route: Some(Route::Workspace),
                    handled: true,
                    paused_at_step: None,
                });
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Sequence execution
    // -----------------------------------------------------------------------

    async fn run_plan(
        &self,
        msg: &InboundMessage,
        plan: crate::routing::planner::Plan,
    ) -> PipelineReply {
        let total = plan.steps.len();
        info!(chat = %msg.chat_id, steps = total, "executing sequence plan");
        let mut parts = Vec::new();
        let mut paused_at = None;

        // Explicit queue, strictly sequential. A failed step reports and the
        // next one still runs; only a pending confirmation pauses the plan.
        for step in plan.steps {
            let step_msg = msg.step(step.index, step.text.clone());
            let step_normalized = normalize(&step_msg.content);
            let content = match &step.content_prompt {
                Some(prompt) => self.generate_step_content(prompt, &step.text).await,
                None => None,
            };
            let reply = self.route_one(&step_msg, &step_normalized, content).await;
            parts.push(format!("Step {}: {}", step.index, reply.text));

            let pending = self
                .deps
                .sessions
                .with(&msg.chat_id, |s| s.pending_confirmation().is_some());
            if pending {
                paused_at = Some(step.index);
                if step.index < total {
                    parts.push(format!(
                        "Paused at step {} — the remaining steps wait for your reply.",
                        step.index
                    ));
                } else {
                    parts.push(format!("Paused at step {} for your confirmation.", step.index));
                }
                break;
            }
        }

        PipelineReply {
            text: parts.join("\n"),
            route: None,
            handled: true,
            paused_at_step: paused_at,
        }
    }

    /// Run a plan step's content sub-prompt through the completion client.
    ///
    /// Any failure degrades to `None`; the step then runs on its bare text.
    async fn generate_step_content(&self, prompt: &str, step_text: &str) -> Option<String> {
        let client = self.deps.client.as_ref()?;
        let messages = vec![
            serde_json::json!({
                "role": "system",
                "content": "Produce only the requested content, no preamble.",
            }),
            serde_json::json!({
                "role": "user",
                "content": format!("{prompt}\n\nStep: {step_text}"),
            }),
        ];
        let timeout = Duration::from_millis(self.config.routing.llm_timeout_ms);
        match tokio::time::timeout(timeout, client.chat(&messages, 1024, 0.7)).await {
            Ok(Ok(reply)) => Some(reply),
            Ok(Err(e)) => {
                warn!("step content generation failed: {}", e);
                None
            }
            Err(_) => {
                warn!("step content generation timed out");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Single-step routing
    // -----------------------------------------------------------------------

    async fn route_one(
        &self,
        msg: &InboundMessage,
        normalized: &str,
        content: Option<String>,
    ) -> PipelineReply {
        let mut entry = self.base_entry(msg);

        let candidates = self.bank.detect_all(&msg.content, normalized);
        entry.candidates = candidates.iter().map(|c| c.route).collect();

        let view = self.deps.sessions.with(&msg.chat_id, |s| ChatView {
            pending_confirmation: s.pending_confirmation().is_some(),
            pending_path: s.pending_path().is_some(),
            list_kind: s.list().map(|l| l.kind),
            fresh_focus: s.fresh_focus(),
        });

        let (allowed, reason) = if candidates.is_empty() {
            (Route::ALL.to_vec(), "no-candidates")
        } else {
            let candidate_routes: Vec<Route> = candidates.iter().map(|c| c.route).collect();
            filter(&view, normalized, &candidate_routes)
        };
        entry.filtered = allowed.clone();
        entry.filter_reason = reason.to_string();

        // Semantic scoring, then LLM fallback on abstention.
        let mut final_route = None;
        if let Some(decision) = self.semantic.route(normalized, &allowed) {
            entry.semantic_route = Some(decision.route);
            entry.semantic_score = Some(decision.score);
            entry.alternatives = decision
                .alternatives
                .iter()
                .map(|a| ScoredAlternative {
                    route: a.route,
                    score: a.score,
                })
                .collect();
            final_route = Some(decision.route);
        } else if let Some(classifier) = &self.classifier {
            let context = self.deps.sessions.with(&msg.chat_id, |s| {
                s.recent_turns(self.config.routing.context_turns)
            });
            if let Ok(route) = classifier.classify(&msg.content, &context, &allowed).await {
                entry.llm_route = route;
                final_route = route;
            }
        }

        // A single surviving candidate with a detector match is a commitment
        // even when scoring abstained; with several we'd be guessing.
        if final_route.is_none() && allowed.len() == 1 && !candidates.is_empty() {
            final_route = Some(allowed[0]);
        }

        debug!(chat = %msg.chat_id, route = ?final_route, reason, "routing decision");

        let request = HandlerRequest {
            channel: msg.channel.clone(),
            chat_id: msg.chat_id.clone(),
            user_id: Some(msg.sender_id.clone()),
            source: msg.source.clone(),
            raw: msg.content.clone(),
            normalized: normalized.to_string(),
            params: final_route.and_then(|route| {
                candidates
                    .iter()
                    .find(|c| c.route == route)
                    .map(|c| c.params.clone())
            }),
            content,
        };

        let (text, handled) = match final_route {
            Some(route) => {
                let outcome = self.registry.dispatch(route, &request, &self.deps).await;
                if outcome.handled {
                    (
                        outcome
                            .reply
                            .unwrap_or_else(|| "Done.".to_string()),
                        true,
                    )
                } else {
                    (chat::converse(&request, &self.deps).await, false)
                }
            }
            None => (chat::converse(&request, &self.deps).await, false),
        };

        entry.final_route = if handled { final_route } else { None };
        entry.handled = handled;
        self.telemetry.record(entry);

        PipelineReply {
            text,
            route: final_route,
            handled,
            paused_at_step: None,
        }
    }

    fn base_entry(&self, msg: &InboundMessage) -> TelemetryEntry {
        TelemetryEntry::new(
            &msg.chat_id,
            Some(&msg.sender_id),
            &msg.source,
            &msg.content,
        )
    }
}
