//! Case- and diacritic-insensitive text canonicalization.
//!
//! Every detector and the context filter match against the normalized form,
//! while param extractors read the raw text so that paths, names and queries
//! keep their original spelling.

use unicode_normalization::UnicodeNormalization;

/// Canonicalize text for matching: NFKD-decompose, strip combining marks,
/// lowercase, collapse runs of whitespace to single spaces, trim.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut out = String::with_capacity(stripped.len());
    let mut last_was_space = true;
    for c in stripped.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Unicode combining marks (Mn/Mc/Me ranges that matter for Latin scripts).
fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{FE20}'..='\u{FE2F}')
}

/// Count whitespace-separated words in already-normalized text.
pub fn word_count(normalized: &str) -> usize {
    if normalized.is_empty() {
        return 0;
    }
    normalized.split(' ').count()
}
