//! The closed set of routes a message can be dispatched to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A domain capability that can act on a message.
///
/// The set is closed and known at compile time. "No route" is expressed as
/// `Option<Route>` throughout the pipeline and serialized as `"none"` in
/// telemetry, so the enum itself never carries a sentinel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "small-talk")]
    SmallTalk,
    #[serde(rename = "self-maintenance")]
    Maintenance,
    #[serde(rename = "connector")]
    Connector,
    #[serde(rename = "schedule")]
    Schedule,
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "mail-contacts")]
    MailContacts,
    #[serde(rename = "mail")]
    Mail,
    #[serde(rename = "workspace")]
    Workspace,
    #[serde(rename = "document")]
    Document,
    #[serde(rename = "web")]
    Web,
}

impl Route {
    /// All routes in detector priority order.
    ///
    /// The ordering is tuned, not principled: more specific domains come
    /// before broad ones so that equal-score ties break toward specificity.
    pub const ALL: [Route; 10] = [
        Route::Maintenance,
        Route::Connector,
        Route::Schedule,
        Route::MailContacts,
        Route::Mail,
        Route::Document,
        Route::Workspace,
        Route::Web,
        Route::Memory,
        Route::SmallTalk,
    ];

    /// Canonical wire/config name for this route.
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::SmallTalk => "small-talk",
            Route::Maintenance => "self-maintenance",
            Route::Connector => "connector",
            Route::Schedule => "schedule",
            Route::Memory => "memory",
            Route::MailContacts => "mail-contacts",
            Route::Mail => "mail",
            Route::Workspace => "workspace",
            Route::Document => "document",
            Route::Web => "web",
        }
    }

    /// Parse a route name. Accepts a few loose aliases the LLM fallback has
    /// been seen to produce ("smalltalk", "files", "search").
    pub fn parse(name: &str) -> Option<Route> {
        match name.trim().to_lowercase().as_str() {
            "small-talk" | "smalltalk" | "chat" => Some(Route::SmallTalk),
            "self-maintenance" | "maintenance" => Some(Route::Maintenance),
            "connector" | "service" => Some(Route::Connector),
            "schedule" | "scheduling" => Some(Route::Schedule),
            "memory" | "memory-recall" => Some(Route::Memory),
            "mail-contacts" | "contacts" => Some(Route::MailContacts),
            "mail" | "email" => Some(Route::Mail),
            "workspace" | "files" => Some(Route::Workspace),
            "document" | "documents" => Some(Route::Document),
            "web" | "search" | "web-search" => Some(Route::Web),
            _ => None,
        }
    }

    /// One-line purpose, used when prompting the LLM fallback router.
    pub fn purpose(&self) -> &'static str {
        match self {
            Route::SmallTalk => "casual conversation, greetings, questions with no actionable task",
            Route::Maintenance => "status, restart, update or logs of the assistant itself",
            Route::Connector => "starting, stopping or checking external service connectors",
            Route::Schedule => "reminders and scheduled tasks",
            Route::Memory => "recalling things the user told the assistant earlier",
            Route::MailContacts => "saving or looking up mail contacts",
            Route::Mail => "sending, reading, listing or searching email",
            Route::Workspace => "files in the user's workspace: list, read, create, delete, move",
            Route::Document => "reading or summarizing a specific document (pdf, docx, ...)",
            Route::Web => "web search and opening web results",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_names() {
        for route in Route::ALL {
            assert_eq!(Route::parse(route.as_str()), Some(route));
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Route::parse("email"), Some(Route::Mail));
        assert_eq!(Route::parse("files"), Some(Route::Workspace));
        assert_eq!(Route::parse("SMALLTALK"), Some(Route::SmallTalk));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Route::parse("telepathy"), None);
        assert_eq!(Route::parse(""), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Route::MailContacts).unwrap();
        assert_eq!(json, "\"mail-contacts\"");
        let back: Route = serde_json::from_str("\"self-maintenance\"").unwrap();
        assert_eq!(back, Route::Maintenance);
    }

    #[test]
    fn test_all_is_complete() {
        assert_eq!(Route::ALL.len(), 10);
    }
}
