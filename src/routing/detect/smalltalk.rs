//! Small-talk detector: greetings, thanks, and conversational filler.

use serde::Serialize;

use super::{has_any_phrase, has_any_word, Detector, RouteParams};
use crate::routing::normalize::word_count;
use crate::routing::route::Route;

const GREETINGS: &[&str] = &[
    "hello", "hi", "hey", "hallo", "moin", "servus", "yo", "good",
];

const GREETING_PHRASES: &[&str] = &[
    "good morning",
    "good evening",
    "good night",
    "how are you",
    "whats up",
    "what's up",
];

const THANKS: &[&str] = &["thanks", "thank", "danke", "cheers", "great", "nice", "cool"];

const CHATTY_PHRASES: &[&str] = &[
    "tell me a joke",
    "who are you",
    "what can you do",
    "how do you feel",
];

/// Parameters for a small-talk candidate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmallTalkParams {
    /// True when the message opens with a greeting.
    pub greeting: bool,
}

pub struct SmallTalkDetector;

impl Detector for SmallTalkDetector {
    fn route(&self) -> Route {
        Route::SmallTalk
    }

    fn detect(&self, _raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }
        let words = word_count(normalized);
        // Normalization keeps punctuation, so "hi," must still read as "hi".
        let first = normalized
            .split(' ')
            .next()
            .unwrap_or("")
            .trim_matches(|c: char| !c.is_alphanumeric());
        let greeting = GREETINGS.contains(&first) || has_any_phrase(normalized, GREETING_PHRASES);

        // Short appreciative or chatty messages count, longer ones only when
        // they open with a greeting (the rest is likely an actual task).
        let applies = greeting
            || (words <= 4 && has_any_word(normalized, THANKS))
            || has_any_phrase(normalized, CHATTY_PHRASES);

        if applies {
            Some(RouteParams::SmallTalk(SmallTalkParams { greeting }))
        } else {
            None
        }
    }
}
