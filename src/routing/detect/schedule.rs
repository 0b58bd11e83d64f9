//! Scheduling detector: reminders and timed tasks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{has_any_phrase, has_any_word, Detector, RouteParams};
use crate::routing::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleAction {
    Add,
    List,
    Remove,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleParams {
    pub action: ScheduleAction,
    /// Raw time expression, when one was found ("tomorrow at 9", "in 2 hours").
    pub when_hint: Option<String>,
    /// The task description with the leading reminder verb stripped.
    pub task: Option<String>,
}

const REMIND_PHRASES: &[&str] = &["remind me", "set a reminder", "set reminder", "schedule a"];
const LIST_PHRASES: &[&str] = &["list reminders", "show reminders", "my reminders", "what reminders"];
const REMOVE_PHRASES: &[&str] = &["delete reminder", "remove reminder", "cancel the reminder", "cancel reminder"];
const SCHEDULE_WORDS: &[&str] = &["remind", "reminder", "reminders"];

static WHEN_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \b(tomorrow|tonight|today)\b(\s+at\s+[\d:apm.\s]+)?
        | \bin\s+\d+\s+(minutes?|hours?|days?|weeks?)\b
        | \bat\s+\d{1,2}(:\d{2})?\s*(am|pm)?\b
        | \bevery\s+(day|morning|evening|week|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b
        | \bon\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    )
    .expect("when-hint regex")
});

pub struct ScheduleDetector;

impl Detector for ScheduleDetector {
    fn route(&self) -> Route {
        Route::Schedule
    }

    fn detect(&self, _raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }

        let action = if has_any_phrase(normalized, REMOVE_PHRASES) {
            ScheduleAction::Remove
        } else if has_any_phrase(normalized, LIST_PHRASES) {
            ScheduleAction::List
        } else if has_any_phrase(normalized, REMIND_PHRASES)
            || (has_any_word(normalized, SCHEDULE_WORDS) && WHEN_HINT.is_match(normalized))
        {
            ScheduleAction::Add
        } else {
            return None;
        };

        let when_hint = WHEN_HINT
            .find(normalized)
            .map(|m| m.as_str().trim().to_string());

        let task = if action == ScheduleAction::Add {
            extract_task(normalized)
        } else {
            None
        };

        Some(RouteParams::Schedule(ScheduleParams {
            action,
            when_hint,
            task,
        }))
    }
}

/// Strip the reminder verb and time expression to leave the task text.
fn extract_task(normalized: &str) -> Option<String> {
    let mut rest = normalized.to_string();
    for prefix in ["remind me to ", "remind me ", "set a reminder to ", "set a reminder "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped.to_string();
            break;
        }
    }
    let scan = rest.clone();
    if let Some(m) = WHEN_HINT.find(&scan) {
        rest.replace_range(m.range(), "");
    }
    let rest = rest.trim().trim_end_matches(',').trim().to_string();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}
