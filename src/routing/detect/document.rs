//! Document detector: reading or summarizing a specific document.

use serde::Serialize;

use super::{has_any_word, path_tokens, urls, Detector, RouteParams};
use crate::routing::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentAction {
    Read,
    Summarize,
    Extract,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentParams {
    pub action: DocumentAction,
    pub target: Option<String>,
}

/// Extensions the document extractor understands.
const DOC_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "odt", "epub", "rtf", "pptx", "xlsx"];

const SUMMARIZE_WORDS: &[&str] = &["summarize", "summarise", "summary", "tldr"];
const EXTRACT_WORDS: &[&str] = &["extract", "tables", "figures"];
const READ_WORDS: &[&str] = &["read", "open", "show", "contents"];

pub struct DocumentDetector;

impl Detector for DocumentDetector {
    fn route(&self) -> Route {
        Route::Document
    }

    fn detect(&self, raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }

        // A document target is either a path with a document extension or a
        // URL when the verbs are summarize/extract.
        let doc_path = path_tokens(raw).into_iter().find(|p| {
            p.rsplit('.')
                .next()
                .map(|ext| DOC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        });
        let url = urls(raw).into_iter().next();

        let action = if has_any_word(normalized, SUMMARIZE_WORDS) {
            DocumentAction::Summarize
        } else if has_any_word(normalized, EXTRACT_WORDS) {
            DocumentAction::Extract
        } else if has_any_word(normalized, READ_WORDS) {
            DocumentAction::Read
        } else {
            return None;
        };

        // Reading requires a document-typed path; summarize/extract also
        // accept a URL target.
        let target = match action {
            DocumentAction::Read => doc_path,
            _ => doc_path.or(url),
        };
        target.map(|target| {
            RouteParams::Document(DocumentParams {
                action,
                target: Some(target),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::normalize::normalize;

    fn detect(raw: &str) -> Option<DocumentParams> {
        match DocumentDetector.detect(raw, &normalize(raw)) {
            Some(RouteParams::Document(p)) => Some(p),
            _ => None,
        }
    }

    #[test]
    fn test_read_pdf() {
        let p = detect("read report.pdf").unwrap();
        assert_eq!(p.action, DocumentAction::Read);
        assert_eq!(p.target.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_summarize_docx() {
        let p = detect("summarize meeting-minutes.docx for me").unwrap();
        assert_eq!(p.action, DocumentAction::Summarize);
    }

    #[test]
    fn test_summarize_url() {
        let p = detect("summarize https://example.com/whitepaper").unwrap();
        assert_eq!(p.action, DocumentAction::Summarize);
        assert_eq!(p.target.as_deref(), Some("https://example.com/whitepaper"));
    }

    #[test]
    fn test_read_txt_is_not_a_document() {
        // Plain text files belong to the workspace route.
        assert!(detect("read notes.txt").is_none());
    }

    #[test]
    fn test_verb_without_target_fails_closed() {
        assert!(detect("summarize it").is_none());
    }
}
