//! Mail detector: sending, reading, listing and searching email.

use serde::Serialize;

use super::{
    email_addresses, has_any_phrase, has_any_word, mentions_ordinal_reference, quoted_strings,
    Detector, RouteParams,
};
use crate::routing::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MailAction {
    Send,
    Read,
    List,
    Search,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailParams {
    pub action: MailAction,
    /// Explicit address or the name tail after "to".
    pub recipient: Option<String>,
    /// Subject (first quoted span) for sends, search query otherwise.
    pub query: Option<String>,
}

/// Vocabulary shared with the context filter's mail-focus rule.
pub const MAIL_WORDS: &[&str] = &["mail", "email", "emails", "inbox", "message", "messages"];

const SEND_WORDS: &[&str] = &["send", "write", "compose", "forward", "reply"];
const READ_PHRASES: &[&str] = &["read the mail", "read the email", "open the mail", "open the email", "read it to me"];
const LIST_PHRASES: &[&str] = &[
    "check my mail",
    "check my email",
    "check my inbox",
    "any new mail",
    "any new emails",
    "new emails",
    "list my emails",
    "show my inbox",
    "latest emails",
];
const SEARCH_PHRASES: &[&str] = &["search my mail", "search my email", "find the mail", "find the email", "search the inbox"];
const READ_VERBS: &[&str] = &["read", "open", "show"];

pub struct MailDetector;

impl Detector for MailDetector {
    fn route(&self) -> Route {
        Route::Mail
    }

    fn detect(&self, raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }

        let mentions_mail = has_any_word(normalized, MAIL_WORDS);
        let addresses = email_addresses(raw);

        let action = if has_any_phrase(normalized, SEARCH_PHRASES) {
            MailAction::Search
        } else if has_any_phrase(normalized, LIST_PHRASES) {
            MailAction::List
        } else if has_any_phrase(normalized, READ_PHRASES) && mentions_mail {
            MailAction::Read
        } else if has_any_word(normalized, READ_VERBS) && mentions_ordinal_reference(normalized) {
            // "open the third one" — which list it points into is decided by
            // the context filter, so mail stays a candidate here.
            MailAction::Read
        } else if has_any_word(normalized, SEND_WORDS) && (mentions_mail || !addresses.is_empty())
        {
            MailAction::Send
        } else {
            return None;
        };

        let recipient = addresses
            .into_iter()
            .next()
            .or_else(|| recipient_name(normalized));

        let query = match action {
            MailAction::Send => quoted_strings(raw).into_iter().next(),
            MailAction::Search => search_tail(normalized),
            _ => None,
        };

        Some(RouteParams::Mail(MailParams {
            action,
            recipient,
            query,
        }))
    }
}

/// `"... to NAME"` tail, stopping at common continuations.
fn recipient_name(normalized: &str) -> Option<String> {
    let pos = normalized.find(" to ")?;
    let tail = &normalized[pos + 4..];
    let name: String = tail
        .split([',', ';'])
        .next()
        .unwrap_or("")
        .split(' ')
        .take_while(|w| !matches!(*w, "about" | "with" | "saying" | "that" | "and"))
        .collect::<Vec<_>>()
        .join(" ");
    let name = name.trim().to_string();
    if name.is_empty() || name.len() > 60 {
        None
    } else {
        Some(name)
    }
}

/// Query text after a search phrase ("search my mail for X" -> "x").
fn search_tail(normalized: &str) -> Option<String> {
    let pos = normalized.find(" for ")?;
    let tail = normalized[pos + 5..].trim().trim_end_matches('?').to_string();
    if tail.is_empty() {
        None
    } else {
        Some(tail)
    }
}
