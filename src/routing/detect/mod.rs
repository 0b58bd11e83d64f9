//! Candidate detector bank.
//!
//! One deterministic, side-effect-free detector per route. Each detector owns
//! a data-driven rule table (keyword slices and lazily compiled regexes) and a
//! param extractor; it never reads chat state. A message may match zero, one
//! or several routes — ambiguity is resolved downstream by the context filter
//! and semantic router, not here.

pub mod connector;
pub mod contacts;
pub mod document;
pub mod mail;
pub mod maintenance;
pub mod memory;
pub mod schedule;
pub mod smalltalk;
pub mod web;
pub mod workspace;

pub use connector::{ConnectorAction, ConnectorDetector, ConnectorParams};
pub use contacts::{ContactsAction, ContactsDetector, ContactsParams};
pub use document::{DocumentAction, DocumentDetector, DocumentParams};
pub use mail::{MailAction, MailDetector, MailParams};
pub use maintenance::{MaintenanceAction, MaintenanceDetector, MaintenanceParams};
pub use memory::{MemoryDetector, MemoryParams};
pub use schedule::{ScheduleAction, ScheduleDetector, ScheduleParams};
pub use smalltalk::{SmallTalkDetector, SmallTalkParams};
pub use web::{WebAction, WebDetector, WebParams};
pub use workspace::{WorkspaceAction, WorkspaceDetector, WorkspaceParams};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::routing::route::Route;

// ---------------------------------------------------------------------------
// Candidate types
// ---------------------------------------------------------------------------

/// Route-specific structured parameters extracted by a detector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteParams {
    SmallTalk(SmallTalkParams),
    Maintenance(MaintenanceParams),
    Connector(ConnectorParams),
    Schedule(ScheduleParams),
    Memory(MemoryParams),
    MailContacts(ContactsParams),
    Mail(MailParams),
    Workspace(WorkspaceParams),
    Document(DocumentParams),
    Web(WebParams),
}

/// A route a detector judged applicable, with its extracted parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub route: Route,
    pub params: RouteParams,
}

// ---------------------------------------------------------------------------
// Detector trait and bank
// ---------------------------------------------------------------------------

/// A pure applicability judgment for one route.
///
/// `detect` receives both the raw text (for param extraction, preserving
/// original spelling of paths and names) and the normalized text (for
/// matching). Returning `None` means "does not apply"; a malformed or partial
/// match must degrade to `None` rather than guessing.
pub trait Detector: Send + Sync {
    fn route(&self) -> Route;
    fn detect(&self, raw: &str, normalized: &str) -> Option<RouteParams>;
}

/// The full bank of detectors, run independently per message.
pub struct DetectorBank {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorBank {
    /// The standard ten-detector bank in priority order.
    pub fn standard() -> Self {
        Self {
            detectors: vec![
                Box::new(MaintenanceDetector),
                Box::new(ConnectorDetector),
                Box::new(ScheduleDetector),
                Box::new(ContactsDetector),
                Box::new(MailDetector),
                Box::new(DocumentDetector),
                Box::new(WorkspaceDetector),
                Box::new(WebDetector),
                Box::new(MemoryDetector),
                Box::new(SmallTalkDetector),
            ],
        }
    }

    /// Run every detector and collect the applicable candidates.
    ///
    /// Empty or whitespace-only input yields no candidates (fail closed).
    pub fn detect_all(&self, raw: &str, normalized: &str) -> Vec<Candidate> {
        if normalized.is_empty() {
            return Vec::new();
        }
        self.detectors
            .iter()
            .filter_map(|d| {
                d.detect(raw, normalized).map(|params| Candidate {
                    route: d.route(),
                    params,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Shared extraction helpers
// ---------------------------------------------------------------------------

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("quoted regex"));

static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    // A token that looks like a file path: contains a slash, or has a short
    // alphanumeric extension after a dot (report.pdf, notes.txt, a/b.rs).
    Regex::new(r"[\w~./-]*[\w-]+\.[A-Za-z0-9]{1,5}\b|[\w~.-]+/[\w~./-]+")
        .expect("path regex")
});

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex"));

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s]+|www\.[^\s]+").expect("url regex"));

/// Extract the contents of single- or double-quoted spans, in order.
pub(crate) fn quoted_strings(raw: &str) -> Vec<String> {
    QUOTED
        .captures_iter(raw)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract tokens that plausibly name files or paths, excluding bare URLs
/// and email addresses.
///
/// Exclusion works on match spans in the raw text: a path-looking fragment
/// carved out of a larger address or URL (the domain of `bob@example.com`,
/// the tail of `https://a.b/c.pdf`) overlaps that span and is dropped.
pub(crate) fn path_tokens(raw: &str) -> Vec<String> {
    let excluded: Vec<std::ops::Range<usize>> = EMAIL
        .find_iter(raw)
        .chain(URL.find_iter(raw))
        .map(|m| m.range())
        .collect();

    let mut out = Vec::new();
    for m in PATH_TOKEN.find_iter(raw) {
        if excluded
            .iter()
            .any(|r| m.start() < r.end && m.end() > r.start)
        {
            continue;
        }
        let tok = m.as_str().trim_matches(|c: char| c == ',' || c == ';');
        // A trailing sentence period would have been captured as an
        // "extension" of length 0; the regex already requires 1+, but strip
        // terminal dots anyway.
        let tok = tok.trim_end_matches('.');
        if !tok.is_empty() && !out.contains(&tok.to_string()) {
            out.push(tok.to_string());
        }
    }
    out
}

/// Extract email addresses from raw text.
pub(crate) fn email_addresses(raw: &str) -> Vec<String> {
    EMAIL.find_iter(raw).map(|m| m.as_str().to_string()).collect()
}

/// Extract URLs from raw text.
pub(crate) fn urls(raw: &str) -> Vec<String> {
    URL.find_iter(raw).map(|m| m.as_str().to_string()).collect()
}

static ORDINAL_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:the\s+)?\d{1,2}(?:st|nd|rd|th)?\b").expect("ordinal regex"));

/// Ordinal vocabulary recognized by the list context resolver.
pub(crate) const ORDINAL_WORDS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
    "tenth", "last", "all",
];

/// True when the message plausibly points back into a previously shown list
/// ("the third one", "number 2", "open 4", "the last one").
///
/// Shared by the web/mail/workspace detectors and the context filter; the
/// actual index resolution lives in the session list context.
pub(crate) fn mentions_ordinal_reference(normalized: &str) -> bool {
    has_any_word(normalized, ORDINAL_WORDS) || ORDINAL_NUMBER.is_match(normalized)
}

/// True when the normalized text contains the word with word boundaries.
pub(crate) fn has_word(normalized: &str, word: &str) -> bool {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}

/// True when any of the words is present.
pub(crate) fn has_any_word(normalized: &str, words: &[&str]) -> bool {
    words.iter().any(|w| has_word(normalized, w))
}

/// True when any of the multi-word phrases is present as a substring.
pub(crate) fn has_any_phrase(normalized: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| normalized.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_empty_input_fails_closed() {
        let bank = DetectorBank::standard();
        assert!(bank.detect_all("", "").is_empty());
        assert!(bank.detect_all("   ", "").is_empty());
    }

    #[test]
    fn test_bank_never_panics_on_odd_input() {
        let bank = DetectorBank::standard();
        let odd = [
            "\"\"''",
            "....",
            "🤖🤖🤖",
            "a",
            "delete",
            "http://",
            "@@@@",
            "\u{0301}\u{0301}",
        ];
        for raw in odd {
            let normalized = crate::routing::normalize::normalize(raw);
            let _ = bank.detect_all(raw, &normalized);
        }
    }

    #[test]
    fn test_quoted_strings() {
        assert_eq!(
            quoted_strings(r#"create "my notes.txt" and 'draft.md'"#),
            vec!["my notes.txt", "draft.md"]
        );
    }

    #[test]
    fn test_path_tokens() {
        let paths = path_tokens("delete report.pdf and docs/old.txt please.");
        assert_eq!(paths, vec!["report.pdf", "docs/old.txt"]);
    }

    #[test]
    fn test_path_tokens_skip_emails_and_urls() {
        let paths = path_tokens("mail bob@example.com the file notes.txt from https://a.b/c.pdf");
        assert_eq!(paths, vec!["notes.txt"]);
    }

    #[test]
    fn test_path_tokens_skip_email_domain_fragment() {
        // The domain inside an address must not surface as a path.
        assert!(path_tokens("send it to anna.miller@corp.example.org").is_empty());
        assert!(path_tokens("fetch www.example.com/page.html").is_empty());
    }

    #[test]
    fn test_has_word_boundaries() {
        assert!(has_word("delete the file", "delete"));
        assert!(!has_word("undeletable stuff", "delete"));
    }
}
