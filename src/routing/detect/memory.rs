//! Memory-recall detector: "what did I tell you about ...".

use serde::Serialize;

use super::{has_any_phrase, Detector, RouteParams};
use crate::routing::route::Route;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryParams {
    /// The recall query with the recall phrasing stripped where possible.
    pub query: String,
}

/// Vocabulary that signals recall of earlier conversation, as opposed to
/// mail/file/web retrieval.
pub const RECALL_PHRASES: &[&str] = &[
    "do you remember",
    "do you recall",
    "what did i tell you",
    "what did i say",
    "did i mention",
    "did i tell you",
    "what do you know about me",
    "from our conversation",
    "we talked about",
    "we spoke about",
];

pub struct MemoryDetector;

impl Detector for MemoryDetector {
    fn route(&self) -> Route {
        Route::Memory
    }

    fn detect(&self, _raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() || !has_any_phrase(normalized, RECALL_PHRASES) {
            return None;
        }
        let query = strip_recall_prefix(normalized);
        Some(RouteParams::Memory(MemoryParams { query }))
    }
}

fn strip_recall_prefix(normalized: &str) -> String {
    for phrase in RECALL_PHRASES {
        if let Some(pos) = normalized.find(phrase) {
            let rest = normalized[pos + phrase.len()..]
                .trim_start_matches([' ', ',', ':'])
                .trim_start_matches("about ")
                .trim_end_matches('?')
                .trim();
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    normalized.trim_end_matches('?').to_string()
}
