//! Web detector: search queries and opening web results.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{has_any_phrase, has_any_word, mentions_ordinal_reference, urls, Detector, RouteParams};
use crate::routing::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WebAction {
    Search,
    Open,
    Fetch,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebParams {
    pub action: WebAction,
    /// Search query or URL, depending on the action.
    pub query: Option<String>,
}

const SEARCH_PHRASES: &[&str] = &[
    "search the web",
    "search the internet",
    "search online",
    "google for",
    "look up online",
    "web search",
];
const SEARCH_PREFIXES: &[&str] = &["search for ", "google ", "look up "];
const OPEN_WORDS: &[&str] = &["open", "visit", "browse"];
const RESULT_WORDS: &[&str] = &["result", "results", "link", "hit", "hits"];

static QUERY_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:search (?:the web |the internet |online )?for|google for|google|look up(?: online)?)\s+(.+)").expect("query regex"));

pub struct WebDetector;

impl Detector for WebDetector {
    fn route(&self) -> Route {
        Route::Web
    }

    fn detect(&self, raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }

        let url = urls(raw).into_iter().next();

        // An explicit URL with an open/browse verb, or alone, is a fetch.
        if let Some(ref u) = url {
            let action = if has_any_word(normalized, OPEN_WORDS) {
                WebAction::Open
            } else {
                WebAction::Fetch
            };
            return Some(RouteParams::Web(WebParams {
                action,
                query: Some(u.clone()),
            }));
        }

        if has_any_phrase(normalized, SEARCH_PHRASES)
            || SEARCH_PREFIXES.iter().any(|p| normalized.starts_with(p))
        {
            let query = QUERY_TAIL
                .captures(normalized)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim_end_matches('?').trim().to_string())
                .filter(|q| !q.is_empty());
            return Some(RouteParams::Web(WebParams {
                action: WebAction::Search,
                query,
            }));
        }

        // "open the third result" — an ordinal back-reference into a shown
        // result list; indices are resolved by the list context, not here.
        if has_any_word(normalized, OPEN_WORDS)
            && (has_any_word(normalized, RESULT_WORDS) || mentions_ordinal_reference(normalized))
        {
            return Some(RouteParams::Web(WebParams {
                action: WebAction::Open,
                query: None,
            }));
        }

        None
    }
}
