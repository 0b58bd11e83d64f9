//! Confirmation state machine: classifying free-text replies to a pending
//! destructive operation.
//!
//! States: `none → pending-path → pending-confirm → none`. The records live
//! in the chat's session; this module owns the lexical reply classification
//! and the path-plausibility check used for the `pending-path` transition.

use once_cell::sync::Lazy;
use regex::Regex;

/// How a free-text reply relates to a live pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Explicit consent: execute the destructive action.
    Confirm,
    /// Explicit refusal: discard the pending record, no side effects.
    Cancel,
    /// Anything else: not consumed here, falls through to normal routing
    /// (the pending record survives until its TTL).
    Unrelated,
}

const YES_WORDS: &[&str] = &["yes", "y", "yeah", "yep", "ja", "si", "sure", "ok", "okay", "confirm"];

const ACTION_AFFIRMATIVES: &[&str] = &[
    "go ahead",
    "do it",
    "delete it",
    "delete them",
    "proceed",
    "please do",
    "yes please",
];

const NO_WORDS: &[&str] = &["no", "n", "nope", "nah", "cancel", "stop", "abort", "dont", "don't", "nein"];

/// Softened negations that read affirmative word-by-word ("better not").
const SOFT_NEGATIONS: &[&str] = &[
    "better not",
    "rather not",
    "not now",
    "not yet",
    "hold off",
    "leave it",
    "never mind",
    "nevermind",
    "forget it",
];

/// Classify a reply against a live pending confirmation.
///
/// Softened negations are checked before yes-words so "ok, better not" reads
/// as a cancel. Long messages that merely contain "ok" somewhere are
/// unrelated; consent must be the point of the reply, so only short replies
/// (or explicit action affirmatives) count.
pub fn classify_reply(normalized: &str) -> ReplyKind {
    if normalized.is_empty() {
        return ReplyKind::Unrelated;
    }

    if SOFT_NEGATIONS.iter().any(|p| normalized.contains(p)) {
        return ReplyKind::Cancel;
    }

    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| NO_WORDS.contains(w)) {
        return ReplyKind::Cancel;
    }

    if ACTION_AFFIRMATIVES.iter().any(|p| normalized.contains(p)) {
        return ReplyKind::Confirm;
    }

    if words.len() <= 3 && words.iter().any(|w| YES_WORDS.contains(w)) {
        return ReplyKind::Confirm;
    }

    ReplyKind::Unrelated
}

static PATH_LIKE: Lazy<Regex> = Lazy::new(|| {
    // A lone path-ish token: optional directories, a stem, usually an
    // extension. Deliberately conservative; free-form sentences must not
    // pass as paths.
    Regex::new(r"^[\w ~./-]+\.[A-Za-z0-9]{1,5}$|^[\w~.-]+(/[\w ~.-]+)+$").expect("path regex")
});

/// Is this reply plausibly just a path, answering a pending path prompt?
pub fn plausible_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('"').trim_matches('\'');
    if trimmed.is_empty() || trimmed.split_whitespace().count() > 3 {
        return None;
    }
    if PATH_LIKE.is_match(trimmed) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// The plain-text prompt shown when a destructive operation needs consent.
pub fn confirmation_prompt(paths: &[String]) -> String {
    let mut out = String::from("This will delete:\n");
    for p in paths {
        out.push_str("  - ");
        out.push_str(p);
        out.push('\n');
    }
    out.push_str("Reply yes to proceed or no to cancel.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::normalize::normalize;

    fn classify(raw: &str) -> ReplyKind {
        classify_reply(&normalize(raw))
    }

    #[test]
    fn test_plain_yes() {
        assert_eq!(classify("yes"), ReplyKind::Confirm);
        assert_eq!(classify("Yes please"), ReplyKind::Confirm);
        assert_eq!(classify("ok"), ReplyKind::Confirm);
    }

    #[test]
    fn test_action_affirmative() {
        assert_eq!(classify("go ahead and do it"), ReplyKind::Confirm);
        assert_eq!(classify("delete them"), ReplyKind::Confirm);
    }

    #[test]
    fn test_plain_no() {
        assert_eq!(classify("no"), ReplyKind::Cancel);
        assert_eq!(classify("cancel"), ReplyKind::Cancel);
        assert_eq!(classify("don't"), ReplyKind::Cancel);
    }

    #[test]
    fn test_softened_negation() {
        assert_eq!(classify("better not"), ReplyKind::Cancel);
        assert_eq!(classify("ok, better not"), ReplyKind::Cancel);
        assert_eq!(classify("hmm, rather not"), ReplyKind::Cancel);
    }

    #[test]
    fn test_unrelated_falls_through() {
        assert_eq!(classify("what's the weather tomorrow"), ReplyKind::Unrelated);
        assert_eq!(classify(""), ReplyKind::Unrelated);
    }

    #[test]
    fn test_long_message_with_ok_is_unrelated() {
        assert_eq!(
            classify("ok so next week I need you to check my mail"),
            ReplyKind::Unrelated
        );
    }

    #[test]
    fn test_plausible_path() {
        assert_eq!(plausible_path("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            plausible_path("  docs/old notes.txt ").as_deref(),
            Some("docs/old notes.txt")
        );
        assert!(plausible_path("please delete the report from last week").is_none());
        assert!(plausible_path("").is_none());
    }

    #[test]
    fn test_confirmation_prompt_lists_paths() {
        let prompt = confirmation_prompt(&["a.txt".into(), "b.txt".into()]);
        assert!(prompt.contains("a.txt"));
        assert!(prompt.contains("b.txt"));
        assert!(prompt.contains("yes"));
        assert!(prompt.contains("no"));
    }
}
