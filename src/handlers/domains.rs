//! Handlers for the remaining domain routes.
//!
//! Scheduling and contacts are backed by local persistence; mail, web,
//! document and connector operations terminate at the process boundary, so
//! their handlers resolve parameters and list references, then report what
//! the external collaborator is asked to do.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use super::{Handler, HandlerDeps, HandlerOutcome, HandlerRequest};
use crate::routing::detect::{
    ConnectorAction, ContactsAction, DocumentAction, MailAction, MaintenanceAction, RouteParams,
    WebAction,
};
use crate::routing::route::Route;
use crate::session::{resolve_reference, ListKind};

/// Resolve an ordinal reference against the chat's live list of `kind`.
fn resolve_list_items(
    req: &HandlerRequest,
    deps: &HandlerDeps,
    kind: ListKind,
) -> Vec<(usize, String, String)> {
    deps.sessions.with(&req.chat_id, |s| {
        let Some(list) = s.list() else {
            return Vec::new();
        };
        if list.kind != kind {
            return Vec::new();
        }
        let Some(selection) = resolve_reference(&req.normalized, list.len()) else {
            return Vec::new();
        };
        selection
            .indices
            .iter()
            .filter_map(|i| list.get(*i))
            .map(|item| (item.index, item.label.clone(), item.reference.clone()))
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

pub struct MaintenanceHandler;

#[async_trait]
impl Handler for MaintenanceHandler {
    fn route(&self) -> Route {
        Route::Maintenance
    }

    async fn handle(&self, req: &HandlerRequest, _deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let action = match &req.params {
            Some(RouteParams::Maintenance(p)) => p.action,
            _ => MaintenanceAction::Status,
        };
        let reply = match action {
            MaintenanceAction::Status => format!(
                "Running adjutant v{}. Pipeline healthy.",
                env!("CARGO_PKG_VERSION")
            ),
            MaintenanceAction::Restart => {
                "Restart requested. The supervisor will bring me back up.".to_string()
            }
            MaintenanceAction::Update => {
                "Update requested. I'll restart on the new version once it's installed.".to_string()
            }
            MaintenanceAction::Logs => {
                "Recent logs are written to the data directory; check adjutant.log there."
                    .to_string()
            }
        };
        Ok(HandlerOutcome::reply(reply))
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct ConnectorHandler;

#[async_trait]
impl Handler for ConnectorHandler {
    fn route(&self) -> Route {
        Route::Connector
    }

    async fn handle(&self, req: &HandlerRequest, _deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let Some(RouteParams::Connector(p)) = &req.params else {
            return Ok(HandlerOutcome::reply(
                "Which connector do you mean, and should it start or stop?",
            ));
        };
        let service = p.service.as_deref().unwrap_or("that connector");
        let reply = match p.action {
            ConnectorAction::Start => format!("Starting the {service} connector."),
            ConnectorAction::Stop => format!("Stopping the {service} connector."),
            ConnectorAction::Status => format!("Checking the {service} connector status."),
        };
        Ok(HandlerOutcome::reply(reply))
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

pub struct ScheduleHandler;

#[async_trait]
impl Handler for ScheduleHandler {
    fn route(&self) -> Route {
        Route::Schedule
    }

    async fn handle(&self, req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        use crate::routing::detect::ScheduleAction;

        let Some(RouteParams::Schedule(p)) = &req.params else {
            return Ok(HandlerOutcome::reply(
                "What should I remind you about, and when?",
            ));
        };
        let reply = match p.action {
            ScheduleAction::Add => {
                let task = p.task.clone().unwrap_or_else(|| req.raw.clone());
                let when = p.when_hint.clone().unwrap_or_default();
                let reminder = deps.reminders.add(&req.chat_id, &req.channel, &task, &when);
                format!(
                    "Reminder set: '{}' at {}.",
                    reminder.task,
                    reminder.due_at.format("%Y-%m-%d %H:%M")
                )
            }
            ScheduleAction::List => {
                let reminders = deps.reminders.list(&req.chat_id);
                if reminders.is_empty() {
                    "No reminders set.".to_string()
                } else {
                    let mut out = String::from("Your reminders:\n");
                    for (i, r) in reminders.iter().enumerate() {
                        out.push_str(&format!(
                            "{}. {} ({})\n",
                            i + 1,
                            r.task,
                            r.due_at.format("%Y-%m-%d %H:%M")
                        ));
                    }
                    out.trim_end().to_string()
                }
            }
            ScheduleAction::Remove => {
                let needle = p.task.clone().unwrap_or_default();
                if needle.is_empty() {
                    "Which reminder should I remove?".to_string()
                } else {
                    match deps.reminders.remove(&req.chat_id, &needle) {
                        0 => format!("No reminder matched '{needle}'."),
                        n => format!("Removed {n} reminder(s)."),
                    }
                }
            }
        };
        Ok(HandlerOutcome::reply(reply))
    }
}

// ---------------------------------------------------------------------------
// Mail contacts
// ---------------------------------------------------------------------------

pub struct ContactsHandler;

impl ContactsHandler {
    fn load(deps: &HandlerDeps) -> BTreeMap<String, String> {
        let path = deps.workspace.join("contacts.json");
        std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn save(deps: &HandlerDeps, contacts: &BTreeMap<String, String>) -> Result<()> {
        std::fs::create_dir_all(&deps.workspace)?;
        let path = deps.workspace.join("contacts.json");
        std::fs::write(path, serde_json::to_string_pretty(contacts)?)?;
        Ok(())
    }
}

#[async_trait]
impl Handler for ContactsHandler {
    fn route(&self) -> Route {
        Route::MailContacts
    }

    async fn handle(&self, req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let Some(RouteParams::MailContacts(p)) = &req.params else {
            return Ok(HandlerOutcome::reply("Whose address do you need?"));
        };
        let reply = match p.action {
            ContactsAction::Save => match (&p.name, &p.address) {
                (Some(name), Some(address)) => {
                    let mut contacts = Self::load(deps);
                    contacts.insert(name.to_lowercase(), address.clone());
                    Self::save(deps, &contacts)?;
                    format!("Saved {name} as {address}.")
                }
                _ => "I need both a name and an address to save a contact.".to_string(),
            },
            ContactsAction::Lookup => match &p.name {
                Some(name) => match Self::load(deps).get(&name.to_lowercase()) {
                    Some(address) => format!("{name} is {address}."),
                    None => format!("I have no address saved for {name}."),
                },
                None => "Whose address do you need?".to_string(),
            },
            ContactsAction::List => {
                let contacts = Self::load(deps);
                if contacts.is_empty() {
                    "No contacts saved yet.".to_string()
                } else {
                    let mut out = String::from("Saved contacts:\n");
                    for (name, address) in &contacts {
                        out.push_str(&format!("- {name}: {address}\n"));
                    }
                    out.trim_end().to_string()
                }
            }
        };
        Ok(HandlerOutcome::reply(reply))
    }
}

// ---------------------------------------------------------------------------
// Mail
// ---------------------------------------------------------------------------

pub struct MailHandler;

#[async_trait]
impl Handler for MailHandler {
    fn route(&self) -> Route {
        Route::Mail
    }

    async fn handle(&self, req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let Some(RouteParams::Mail(p)) = &req.params else {
            return Ok(HandlerOutcome::reply(
                "Should I read your inbox or send something?",
            ));
        };
        let reply = match p.action {
            MailAction::Send => {
                let recipient = p.recipient.as_deref().unwrap_or("the recipient");
                match &p.query {
                    Some(subject) => format!("Sending '{subject}' to {recipient} via the mail connector."),
                    None => format!("Composing a mail to {recipient} via the mail connector."),
                }
            }
            MailAction::Read => {
                let items = resolve_list_items(req, deps, ListKind::Mail);
                match items.first() {
                    Some((index, label, _)) => format!("Opening mail {index}: {label}."),
                    None => "Fetching the latest mail from your inbox.".to_string(),
                }
            }
            MailAction::List => "Fetching your inbox listing from the mail connector.".to_string(),
            MailAction::Search => match &p.query {
                Some(q) => format!("Searching your mail for '{q}'."),
                None => "What should I search your mail for?".to_string(),
            },
        };
        Ok(HandlerOutcome::reply(reply))
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

pub struct DocumentHandler;

#[async_trait]
impl Handler for DocumentHandler {
    fn route(&self) -> Route {
        Route::Document
    }

    async fn handle(&self, req: &HandlerRequest, _deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let Some(RouteParams::Document(p)) = &req.params else {
            return Ok(HandlerOutcome::reply("Which document should I open?"));
        };
        let target = p.target.as_deref().unwrap_or("the document");
        let reply = match p.action {
            DocumentAction::Read => format!("Extracting the text of {target}."),
            DocumentAction::Summarize => format!("Summarizing {target}."),
            DocumentAction::Extract => format!("Extracting tables and figures from {target}."),
        };
        Ok(HandlerOutcome::reply(reply))
    }
}

// ---------------------------------------------------------------------------
// Web
// ---------------------------------------------------------------------------

pub struct WebHandler;

#[async_trait]
impl Handler for WebHandler {
    fn route(&self) -> Route {
        Route::Web
    }

    async fn handle(&self, req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let Some(RouteParams::Web(p)) = &req.params else {
            return Ok(HandlerOutcome::reply("What should I look up?"));
        };
        let reply = match p.action {
            WebAction::Search => match &p.query {
                Some(q) => format!("Searching the web for '{q}'."),
                None => "What should I search for?".to_string(),
            },
            WebAction::Open => {
                let items = resolve_list_items(req, deps, ListKind::Web);
                match items.first() {
                    Some((index, label, reference)) => {
                        format!("Opening result {index}: {label} ({reference}).")
                    }
                    None => match &p.query {
                        Some(url) => format!("Opening {url}."),
                        None => "Which result should I open?".to_string(),
                    },
                }
            }
            WebAction::Fetch => match &p.query {
                Some(url) => format!("Fetching {url}."),
                None => "Which page should I fetch?".to_string(),
            },
        };
        Ok(HandlerOutcome::reply(reply))
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

pub struct MemoryHandler;

#[async_trait]
impl Handler for MemoryHandler {
    fn route(&self) -> Route {
        Route::Memory
    }

    async fn handle(&self, req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let query = match &req.params {
            Some(RouteParams::Memory(p)) => p.query.clone(),
            _ => req.normalized.clone(),
        };
        let words: Vec<String> = query
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .map(|w| w.to_string())
            .collect();

        let matches = deps.sessions.with(&req.chat_id, |s| {
            s.recent_turns(20)
                .into_iter()
                .filter(|t| {
                    t.role == "user" && {
                        let lower = t.text.to_lowercase();
                        words.iter().any(|w| lower.contains(w.as_str()))
                    }
                })
                .map(|t| t.text)
                .collect::<Vec<_>>()
        });

        let reply = if matches.is_empty() {
            "I don't have anything about that in our recent conversation.".to_string()
        } else {
            let mut out = String::from("From our recent conversation:\n");
            for m in matches.iter().take(3) {
                out.push_str(&format!("- \"{m}\"\n"));
            }
            out.trim_end().to_string()
        };
        Ok(HandlerOutcome::reply(reply))
    }
}
