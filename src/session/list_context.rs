//! Indexed list context: ordinal back-references into the last shown list.
//!
//! Whenever a handler renders an enumerable result (search hits, an inbox
//! page, a directory listing) it remembers the list here. The next message
//! can then say "open the 3rd one" and the resolver turns that into concrete
//! 1-based indices.

use chrono::{DateTime, Duration, Local};
use serde::Serialize;

/// What kind of list was rendered; decides which route family an ordinal
/// reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Web,
    Mail,
    File,
}

/// One entry of a rendered list. Indices are 1-based and dense.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub index: usize,
    /// What the user saw.
    pub label: String,
    /// What the handler needs to act on the item (URL, message id, path).
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

/// The last rendered enumerable result for a chat.
///
/// Replaced wholesale on every new render; items are read-only after
/// creation.
#[derive(Debug, Clone)]
pub struct IndexedList {
    pub kind: ListKind,
    pub title: String,
    pub source: String,
    items: Vec<ListItem>,
    pub created_at: DateTime<Local>,
    ttl: Duration,
}

impl IndexedList {
    /// Build a list context from plain (label, reference) pairs. Indices are
    /// assigned densely starting at 1.
    pub fn new(
        kind: ListKind,
        title: impl Into<String>,
        source: impl Into<String>,
        entries: Vec<(String, String)>,
        ttl: Duration,
    ) -> Self {
        let items = entries
            .into_iter()
            .enumerate()
            .map(|(i, (label, reference))| ListItem {
                index: i + 1,
                label,
                reference,
                item_type: None,
            })
            .collect();
        Self {
            kind,
            title: title.into(),
            source: source.into(),
            items,
            created_at: Local::now(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_expired(&self) -> bool {
        Local::now() - self.created_at > self.ttl
    }

    /// Item lookup by 1-based index.
    pub fn get(&self, index: usize) -> Option<&ListItem> {
        if index == 0 {
            return None;
        }
        self.items.get(index - 1)
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }
}

// ---------------------------------------------------------------------------
// Reference resolution
// ---------------------------------------------------------------------------

/// Maximum span a range reference may select ("1 to 50" is clamped to 10).
const MAX_RANGE_SPAN: usize = 10;

/// Indices a message resolved to within a live list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSelection {
    /// 1-based, de-duplicated, clamped to the item count, in order.
    pub indices: Vec<usize>,
}

const ORDINALS: &[(&str, usize)] = &[
    ("first", 1),
    ("second", 2),
    ("third", 3),
    ("fourth", 4),
    ("fifth", 5),
    ("sixth", 6),
    ("seventh", 7),
    ("eighth", 8),
    ("ninth", 9),
    ("tenth", 10),
];

/// Resolve an ordinal/number reference against a list of `count` items.
///
/// Recognizes explicit numbers ("open 3", "number 2"), ranges ("3 to 5",
/// capped at a span of 10), ordinal words, "last" / "second-to-last" and
/// "all". Returns `None` when nothing in the text references the list, which
/// callers must treat as "fall through to normal routing".
pub fn resolve_reference(normalized: &str, count: usize) -> Option<ListSelection> {
    if count == 0 || normalized.is_empty() {
        return None;
    }

    if has_word(normalized, "all") {
        return Some(ListSelection {
            indices: (1..=count).collect(),
        });
    }

    // "second to last" / "second-to-last" before plain "last"/"second".
    if normalized.contains("second to last") || normalized.contains("second-to-last") {
        if count >= 2 {
            return Some(ListSelection {
                indices: vec![count - 1],
            });
        }
        return Some(ListSelection { indices: vec![count] });
    }
    if has_word(normalized, "last") {
        return Some(ListSelection { indices: vec![count] });
    }

    // Range: "3 to 5", "2-4".
    if let Some((a, b)) = parse_range(normalized) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let hi = hi.min(lo + MAX_RANGE_SPAN - 1).min(count);
        let lo = lo.max(1);
        if lo <= hi {
            return Some(ListSelection {
                indices: (lo..=hi).collect(),
            });
        }
        return None;
    }

    let mut indices: Vec<usize> = Vec::new();

    for (word, idx) in ORDINALS {
        if has_word(normalized, word) {
            indices.push(*idx);
        }
    }
    for num in explicit_numbers(normalized) {
        indices.push(num);
    }

    indices.retain(|i| *i >= 1);
    indices.iter_mut().for_each(|i| *i = (*i).min(count));
    // De-duplicate, preserving order (clamping can create duplicates).
    let mut seen = Vec::new();
    indices.retain(|i| {
        if seen.contains(i) {
            false
        } else {
            seen.push(*i);
            true
        }
    });

    if indices.is_empty() {
        None
    } else {
        Some(ListSelection { indices })
    }
}

fn has_word(normalized: &str, word: &str) -> bool {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}

fn parse_range(normalized: &str) -> Option<(usize, usize)> {
    use once_cell::sync::Lazy;
    use regex::Regex;
    static RANGE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(\d{1,3})\s*(?:to|until|through|-)\s*(\d{1,3})\b").expect("range regex")
    });
    let caps = RANGE.captures(normalized)?;
    let a = caps.get(1)?.as_str().parse().ok()?;
    let b = caps.get(2)?.as_str().parse().ok()?;
    Some((a, b))
}

fn explicit_numbers(normalized: &str) -> Vec<usize> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter_map(|w| {
            // Accept "3", "3rd", "2nd", "1st", "4th".
            let digits: &str = w
                .strip_suffix("st")
                .or_else(|| w.strip_suffix("nd"))
                .or_else(|| w.strip_suffix("rd"))
                .or_else(|| w.strip_suffix("th"))
                .unwrap_or(w);
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.parse::<usize>().ok().filter(|n| *n >= 1 && *n <= 999)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> IndexedList {
        let entries = (1..=n)
            .map(|i| (format!("item {i}"), format!("ref-{i}")))
            .collect();
        IndexedList::new(ListKind::Web, "results", "test", entries, Duration::minutes(5))
    }

    #[test]
    fn test_indices_dense_and_one_based() {
        let list = sample(4);
        assert_eq!(list.len(), 4);
        for (i, item) in list.items().iter().enumerate() {
            assert_eq!(item.index, i + 1);
        }
        assert!(list.get(0).is_none());
        assert_eq!(list.get(1).unwrap().reference, "ref-1");
        assert!(list.get(5).is_none());
    }

    #[test]
    fn test_ordinal_word() {
        let sel = resolve_reference("open the third one", 5).unwrap();
        assert_eq!(sel.indices, vec![3]);
    }

    #[test]
    fn test_explicit_number() {
        let sel = resolve_reference("open number 2", 5).unwrap();
        assert_eq!(sel.indices, vec![2]);
    }

    #[test]
    fn test_suffixed_number() {
        let sel = resolve_reference("the 4th one please", 5).unwrap();
        assert_eq!(sel.indices, vec![4]);
    }

    #[test]
    fn test_last() {
        let sel = resolve_reference("show the last one", 7).unwrap();
        assert_eq!(sel.indices, vec![7]);
    }

    #[test]
    fn test_second_to_last() {
        let sel = resolve_reference("the second to last", 7).unwrap();
        assert_eq!(sel.indices, vec![6]);
    }

    #[test]
    fn test_range_clamped_to_count() {
        // "3 to 5" on a 4-item list yields {3, 4}.
        let sel = resolve_reference("delete 3 to 5", 4).unwrap();
        assert_eq!(sel.indices, vec![3, 4]);
    }

    #[test]
    fn test_range_span_capped() {
        let sel = resolve_reference("open 1 to 50", 100).unwrap();
        assert_eq!(sel.indices.len(), MAX_RANGE_SPAN);
        assert_eq!(sel.indices[0], 1);
    }

    #[test]
    fn test_all() {
        let sel = resolve_reference("delete all of them", 3).unwrap();
        assert_eq!(sel.indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_out_of_range_clamped() {
        let sel = resolve_reference("open the 9th", 4).unwrap();
        assert_eq!(sel.indices, vec![4]);
    }

    #[test]
    fn test_no_reference() {
        assert!(resolve_reference("how are you", 5).is_none());
    }

    #[test]
    fn test_empty_list_no_match() {
        assert!(resolve_reference("open the third one", 0).is_none());
    }

    #[test]
    fn test_expiry() {
        let mut list = sample(2);
        assert!(!list.is_expired());
        list.created_at = Local::now() - Duration::minutes(10);
        assert!(list.is_expired());
    }
}
