//! Self-maintenance detector: the assistant managing itself.

use serde::Serialize;

use super::{has_any_phrase, has_any_word, Detector, RouteParams};
use crate::routing::route::Route;

/// What the user wants done to the assistant process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MaintenanceAction {
    Status,
    Restart,
    Update,
    Logs,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceParams {
    pub action: MaintenanceAction,
}

/// Rule table: phrases that must refer to the assistant itself.
const SELF_WORDS: &[&str] = &["yourself", "bot", "assistant", "adjutant", "daemon"];

const STATUS_PHRASES: &[&str] = &[
    "are you running",
    "are you alive",
    "are you online",
    "system status",
    "bot status",
    "your status",
    "health check",
];

const RESTART_WORDS: &[&str] = &["restart", "reboot", "reload"];
const UPDATE_WORDS: &[&str] = &["update", "upgrade"];
const LOG_PHRASES: &[&str] = &["show logs", "your logs", "show the log", "error log"];

pub struct MaintenanceDetector;

impl Detector for MaintenanceDetector {
    fn route(&self) -> Route {
        Route::Maintenance
    }

    fn detect(&self, _raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }

        let action = if has_any_phrase(normalized, STATUS_PHRASES) {
            Some(MaintenanceAction::Status)
        } else if has_any_phrase(normalized, LOG_PHRASES) {
            Some(MaintenanceAction::Logs)
        } else if has_any_word(normalized, RESTART_WORDS)
            && has_any_word(normalized, SELF_WORDS)
        {
            Some(MaintenanceAction::Restart)
        } else if has_any_word(normalized, UPDATE_WORDS)
            && has_any_word(normalized, SELF_WORDS)
        {
            Some(MaintenanceAction::Update)
        } else {
            None
        };

        action.map(|action| RouteParams::Maintenance(MaintenanceParams { action }))
    }
}
