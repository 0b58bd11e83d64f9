//! Service-connector detector: start/stop/status of external connectors.

use serde::Serialize;

use super::{has_any_word, has_word, Detector, RouteParams};
use crate::routing::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectorAction {
    Start,
    Stop,
    Status,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorParams {
    pub action: ConnectorAction,
    /// Named connector, when the message names one ("telegram", "imap", ...).
    pub service: Option<String>,
}

const CONNECTOR_WORDS: &[&str] = &["connector", "bridge", "integration", "service"];

/// Known connector names; the first one found in the text is extracted.
const KNOWN_SERVICES: &[&str] = &[
    "telegram", "whatsapp", "imap", "smtp", "matrix", "slack", "discord", "calendar",
];

const START_WORDS: &[&str] = &["start", "enable", "connect", "activate", "launch"];
const STOP_WORDS: &[&str] = &["stop", "disable", "disconnect", "deactivate", "kill"];
const STATUS_WORDS: &[&str] = &["status", "running", "state", "check"];

pub struct ConnectorDetector;

impl Detector for ConnectorDetector {
    fn route(&self) -> Route {
        Route::Connector
    }

    fn detect(&self, _raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }

        let service = KNOWN_SERVICES
            .iter()
            .find(|s| has_word(normalized, s))
            .map(|s| s.to_string());

        // Either the generic connector vocabulary or a known service name must
        // appear; a bare "start" is not enough.
        if !has_any_word(normalized, CONNECTOR_WORDS) && service.is_none() {
            return None;
        }

        let action = if has_any_word(normalized, STOP_WORDS) {
            ConnectorAction::Stop
        } else if has_any_word(normalized, START_WORDS) {
            ConnectorAction::Start
        } else if has_any_word(normalized, STATUS_WORDS) {
            ConnectorAction::Status
        } else {
            return None;
        };

        Some(RouteParams::Connector(ConnectorParams { action, service }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::normalize::normalize;

    fn detect(raw: &str) -> Option<ConnectorParams> {
        match ConnectorDetector.detect(raw, &normalize(raw)) {
            Some(RouteParams::Connector(p)) => Some(p),
            _ => None,
        }
    }

    #[test]
    fn test_start_named_service() {
        let p = detect("start the telegram bridge").unwrap();
        assert_eq!(p.action, ConnectorAction::Start);
        assert_eq!(p.service.as_deref(), Some("telegram"));
    }

    #[test]
    fn test_stop_generic_connector() {
        let p = detect("stop the mail connector").unwrap();
        assert_eq!(p.action, ConnectorAction::Stop);
        assert_eq!(p.service, None);
    }

    #[test]
    fn test_status() {
        let p = detect("is the imap service running").unwrap();
        assert_eq!(p.action, ConnectorAction::Status);
        assert_eq!(p.service.as_deref(), Some("imap"));
    }

    #[test]
    fn test_bare_verb_does_not_apply() {
        assert!(detect("start").is_none());
        assert!(detect("stop doing that").is_none());
    }
}
