//! Context filter: narrows the candidate route set using live chat state.
//!
//! Pure function of the text and a small snapshot of session state. Rules
//! apply in priority order and only ever narrow the set; a rule whose result
//! would be empty is skipped, so a non-empty input always yields a non-empty
//! output.

use crate::routing::detect::mail::MAIL_WORDS;
use crate::routing::detect::memory::RECALL_PHRASES;
use crate::routing::detect::mentions_ordinal_reference;
use crate::routing::normalize::word_count;
use crate::routing::route::Route;
use crate::session::list_context::ListKind;
use crate::session::state::Focus;

/// Snapshot of the chat state the filter is allowed to see.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatView {
    pub pending_confirmation: bool,
    pub pending_path: bool,
    pub list_kind: Option<ListKind>,
    pub fresh_focus: Option<Focus>,
}

const ANAPHORA: &[&str] = &["it", "that", "them", "those", "this", "these", "one"];

/// Narrow `candidates` according to the chat's live state.
///
/// Returns the allowed routes and a static reason tag for telemetry.
pub fn filter(
    view: &ChatView,
    normalized: &str,
    candidates: &[Route],
) -> (Vec<Route>, &'static str) {
    let mut allowed: Vec<Route> = candidates.to_vec();
    let mut reason = "no-narrowing";

    // 1. A live pending confirmation or path prompt pins the conversation to
    //    the file domain.
    if view.pending_confirmation || view.pending_path {
        narrow(
            &mut allowed,
            &[Route::Workspace, Route::Document],
            &mut reason,
            "pending-file-op",
        );
        return (allowed, reason);
    }

    // 2. An ordinal reference into a live list restricts to the list's route
    //    family.
    if let Some(kind) = view.list_kind {
        if mentions_ordinal_reference(normalized) {
            let family: &[Route] = match kind {
                ListKind::Web => &[Route::Web],
                ListKind::Mail => &[Route::Mail, Route::MailContacts],
                ListKind::File => &[Route::Workspace, Route::Document],
            };
            narrow(&mut allowed, family, &mut reason, "list-reference");
            return (allowed, reason);
        }
    }

    // 3. Short anaphoric messages lean on the most recent focus.
    if word_count(normalized) <= 5 && has_anaphora(normalized) {
        if let Some(focus) = view.fresh_focus {
            let family: &[Route] = match focus {
                Focus::Mail => &[Route::Mail, Route::MailContacts],
                Focus::Files => &[Route::Workspace, Route::Document],
            };
            narrow(&mut allowed, family, &mut reason, "recent-focus");
            return (allowed, reason);
        }
    }

    // 4. Mail vocabulary without recall vocabulary pins to the mail family;
    //    recall vocabulary pins to memory/small-talk.
    let mentions_mail = MAIL_WORDS.iter().any(|w| has_word(normalized, w));
    let mentions_recall = RECALL_PHRASES.iter().any(|p| normalized.contains(p));
    if mentions_recall {
        narrow(
            &mut allowed,
            &[Route::Memory, Route::SmallTalk],
            &mut reason,
            "recall-vocabulary",
        );
    } else if mentions_mail {
        narrow(
            &mut allowed,
            &[Route::Mail, Route::MailContacts],
            &mut reason,
            "mail-vocabulary",
        );
    }

    (allowed, reason)
}

/// Intersect `allowed` with `family`, keeping the original order. Skipped
/// when the intersection would be empty.
fn narrow(
    allowed: &mut Vec<Route>,
    family: &[Route],
    reason: &mut &'static str,
    tag: &'static str,
) {
    let narrowed: Vec<Route> = allowed
        .iter()
        .copied()
        .filter(|r| family.contains(r))
        .collect();
    if !narrowed.is_empty() {
        *allowed = narrowed;
        *reason = tag;
    }
}

fn has_anaphora(normalized: &str) -> bool {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| ANAPHORA.contains(&w))
}

fn has_word(normalized: &str, word: &str) -> bool {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Route; 4] = [Route::Workspace, Route::Document, Route::Mail, Route::Web];

    #[test]
    fn test_no_state_no_narrowing() {
        let view = ChatView::default();
        let (allowed, reason) = filter(&view, "do something", &ALL);
        assert_eq!(allowed, ALL.to_vec());
        assert_eq!(reason, "no-narrowing");
    }

    #[test]
    fn test_pending_confirmation_restricts_to_files() {
        let view = ChatView {
            pending_confirmation: true,
            ..Default::default()
        };
        let (allowed, reason) = filter(&view, "yes", &ALL);
        assert_eq!(allowed, vec![Route::Workspace, Route::Document]);
        assert_eq!(reason, "pending-file-op");
    }

    #[test]
    fn test_web_list_reference() {
        let view = ChatView {
            list_kind: Some(ListKind::Web),
            ..Default::default()
        };
        let (allowed, reason) = filter(&view, "open the third one", &ALL);
        assert_eq!(allowed, vec![Route::Web]);
        assert_eq!(reason, "list-reference");
    }

    #[test]
    fn test_mail_list_reference() {
        let view = ChatView {
            list_kind: Some(ListKind::Mail),
            ..Default::default()
        };
        let (allowed, _) = filter(&view, "read the first one", &[Route::Mail, Route::Web]);
        assert_eq!(allowed, vec![Route::Mail]);
    }

    #[test]
    fn test_list_without_ordinal_does_not_narrow() {
        let view = ChatView {
            list_kind: Some(ListKind::Web),
            ..Default::default()
        };
        let (allowed, reason) = filter(&view, "search for something else", &ALL);
        assert_eq!(allowed, ALL.to_vec());
        assert_eq!(reason, "no-narrowing");
    }

    #[test]
    fn test_anaphora_with_fresh_mail_focus() {
        let view = ChatView {
            fresh_focus: Some(Focus::Mail),
            ..Default::default()
        };
        let (allowed, reason) = filter(&view, "forward it", &ALL);
        assert_eq!(allowed, vec![Route::Mail]);
        assert_eq!(reason, "recent-focus");
    }

    #[test]
    fn test_mail_vocabulary_rule() {
        let (allowed, reason) = filter(&ChatView::default(), "check my inbox for news", &ALL);
        assert_eq!(allowed, vec![Route::Mail]);
        assert_eq!(reason, "mail-vocabulary");
    }

    #[test]
    fn test_recall_beats_mail_vocabulary() {
        let routes = [Route::Mail, Route::Memory, Route::SmallTalk];
        let (allowed, reason) = filter(
            &ChatView::default(),
            "do you remember the mail from anna",
            &routes,
        );
        assert_eq!(allowed, vec![Route::Memory, Route::SmallTalk]);
        assert_eq!(reason, "recall-vocabulary");
    }

    #[test]
    fn test_never_empties_nonempty_input() {
        // Pending file op, but neither workspace nor document is a candidate:
        // narrowing would empty the set, so it is skipped.
        let view = ChatView {
            pending_confirmation: true,
            ..Default::default()
        };
        let (allowed, reason) = filter(&view, "yes", &[Route::Mail]);
        assert_eq!(allowed, vec![Route::Mail]);
        assert_eq!(reason, "no-narrowing");
    }

    #[test]
    fn test_empty_input_stays_empty() {
        let (allowed, _) = filter(&ChatView::default(), "anything", &[]);
        assert!(allowed.is_empty());
    }
}
