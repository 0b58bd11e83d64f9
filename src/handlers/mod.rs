//! Route handlers and dispatch.
//!
//! The pipeline commits to a route, then dispatches to the handler registered
//! for it. Handlers are side-effecting but must not fail the message: the
//! registry catches any error and turns it into a short user-visible reply.

pub mod chat;
pub mod domains;
pub mod workspace;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::providers::CompletionClient;
use crate::reminders::ReminderService;
use crate::routing::detect::RouteParams;
use crate::routing::route::Route;
use crate::session::SessionStore;

/// Everything a handler may need. Cheap to clone; shared services are behind
/// `Arc`.
#[derive(Clone)]
pub struct HandlerDeps {
    pub sessions: Arc<SessionStore>,
    pub reminders: Arc<ReminderService>,
    pub workspace: std::path::PathBuf,
    pub client: Option<Arc<dyn CompletionClient>>,
}

/// One message, as seen by a handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub channel: String,
    pub chat_id: String,
    pub user_id: Option<String>,
    pub source: String,
    pub raw: String,
    pub normalized: String,
    /// Structured params from the winning detector, when one applied. The
    /// LLM fallback can commit to a route no detector matched, so handlers
    /// must cope with `None`.
    pub params: Option<RouteParams>,
    /// Pre-generated content for this message, produced from a plan step's
    /// content sub-prompt. Handlers that write or send something use it as
    /// the body.
    pub content: Option<String>,
}

/// What a handler did with the message.
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub handled: bool,
    pub reply: Option<String>,
}

impl HandlerOutcome {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            handled: true,
            reply: Some(text.into()),
        }
    }

    pub fn unhandled() -> Self {
        Self {
            handled: false,
            reply: None,
        }
    }
}

/// One domain capability.
#[async_trait]
pub trait Handler: Send + Sync {
    fn route(&self) -> Route;
    async fn handle(&self, req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered list of handlers, dispatched by committed route.
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }

    /// The standard registry covering every route.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(domains::MaintenanceHandler),
            Arc::new(domains::ConnectorHandler),
            Arc::new(domains::ScheduleHandler),
            Arc::new(domains::ContactsHandler),
            Arc::new(domains::MailHandler),
            Arc::new(workspace::WorkspaceHandler),
            Arc::new(domains::DocumentHandler),
            Arc::new(domains::WebHandler),
            Arc::new(domains::MemoryHandler),
            Arc::new(chat::ChatHandler),
        ])
    }

    /// Dispatch to the handler registered for `route`.
    ///
    /// A handler error is contained here: logged, converted to an apology
    /// reply, and reported as handled so the pipeline records the failure
    /// without aborting the message.
    pub async fn dispatch(
        &self,
        route: Route,
        req: &HandlerRequest,
        deps: &HandlerDeps,
    ) -> HandlerOutcome {
        let Some(handler) = self.handlers.iter().find(|h| h.route() == route) else {
            warn!(route = route.as_str(), "no handler registered");
            return HandlerOutcome::unhandled();
        };
        match handler.handle(req, deps).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(route = route.as_str(), "handler failed: {e:#}");
                HandlerOutcome::reply("Something went wrong while handling that. I logged the details.")
            }
        }
    }
}
