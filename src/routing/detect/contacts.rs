//! Mail-contacts detector: saving and looking up addresses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{email_addresses, has_any_phrase, Detector, RouteParams};
use crate::routing::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactsAction {
    Save,
    Lookup,
    List,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsParams {
    pub action: ContactsAction,
    pub name: Option<String>,
    pub address: Option<String>,
}

const SAVE_PHRASES: &[&str] = &[
    "save the contact",
    "save contact",
    "add the contact",
    "add contact",
    "remember the address",
    "remember the email of",
    "new contact",
];

const LOOKUP_PHRASES: &[&str] = &[
    "whats the email of",
    "what's the email of",
    "what is the email of",
    "email address of",
    "mail address of",
    "look up the contact",
    "find the contact",
];

const LIST_PHRASES: &[&str] = &["list contacts", "show contacts", "my contacts", "all contacts"];

/// `"... of NAME"` / `"contact NAME"` — a short capitalized-ish name tail.
static NAME_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:of|contact|for)\s+([a-z][a-z .'-]{1,40}?)(?:\s+is\b|\?|$)").expect("name regex"));

pub struct ContactsDetector;

impl Detector for ContactsDetector {
    fn route(&self) -> Route {
        Route::MailContacts
    }

    fn detect(&self, raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }

        let action = if has_any_phrase(normalized, LIST_PHRASES) {
            ContactsAction::List
        } else if has_any_phrase(normalized, SAVE_PHRASES) {
            ContactsAction::Save
        } else if has_any_phrase(normalized, LOOKUP_PHRASES) {
            ContactsAction::Lookup
        } else {
            return None;
        };

        let address = email_addresses(raw).into_iter().next();
        let name = NAME_TAIL
            .captures(normalized)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            // The captured tail must not itself be the email address.
            .filter(|n| !n.contains('@'));

        // Saving requires an address; degrade to lookup-shaped "does not
        // apply" rather than guessing at a half-formed save.
        if action == ContactsAction::Save && address.is_none() {
            return None;
        }

        Some(RouteParams::MailContacts(ContactsParams {
            action,
            name,
            address,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::normalize::normalize;

    fn detect(raw: &str) -> Option<ContactsParams> {
        match ContactsDetector.detect(raw, &normalize(raw)) {
            Some(RouteParams::MailContacts(p)) => Some(p),
            _ => None,
        }
    }

    #[test]
    fn test_save_contact() {
        let p = detect("save the contact for Anna, anna@example.com").unwrap();
        assert_eq!(p.action, ContactsAction::Save);
        assert_eq!(p.address.as_deref(), Some("anna@example.com"));
    }

    #[test]
    fn test_save_without_address_fails_closed() {
        assert!(detect("save the contact for Anna").is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let p = detect("what's the email of Bob Miller?").unwrap();
        assert_eq!(p.action, ContactsAction::Lookup);
        assert_eq!(p.name.as_deref(), Some("bob miller"));
    }

    #[test]
    fn test_list() {
        assert_eq!(detect("show contacts").unwrap().action, ContactsAction::List);
    }

    #[test]
    fn test_unrelated() {
        assert!(detect("send a mail to bob@example.com").is_none());
    }
}
