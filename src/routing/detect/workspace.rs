//! Workspace detector: file operations in the user's workspace.

use serde::Serialize;

use super::{
    has_any_phrase, has_any_word, mentions_ordinal_reference, path_tokens, quoted_strings,
    Detector, RouteParams,
};
use crate::routing::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkspaceAction {
    List,
    Read,
    Create,
    Delete,
    Move,
    Search,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceParams {
    pub action: WorkspaceAction,
    /// Paths named in the message, raw spelling preserved. May be empty —
    /// the handler then prompts for a path (pending-path state).
    pub paths: Vec<String>,
}

/// Vocabulary shared with the context filter's file-focus rule.
pub const FILE_WORDS: &[&str] = &[
    "file", "files", "folder", "folders", "directory", "workspace", "document", "documents",
];

const DELETE_WORDS: &[&str] = &["delete", "remove", "erase", "trash"];
const CREATE_WORDS: &[&str] = &["create", "make", "new", "touch"];
const MOVE_WORDS: &[&str] = &["move", "rename"];
const READ_WORDS: &[&str] = &["read", "open", "show", "cat", "display"];
const LIST_PHRASES: &[&str] = &[
    "list the files",
    "list files",
    "list my files",
    "show the files",
    "show my files",
    "whats in the workspace",
    "what's in the workspace",
    "list the workspace",
    "list the directory",
    "list the folder",
];
const SEARCH_PHRASES: &[&str] = &["find the file", "search the workspace", "search for a file", "look for the file"];

pub struct WorkspaceDetector;

impl Detector for WorkspaceDetector {
    fn route(&self) -> Route {
        Route::Workspace
    }

    fn detect(&self, raw: &str, normalized: &str) -> Option<RouteParams> {
        if normalized.is_empty() {
            return None;
        }

        let mut paths = quoted_strings(raw);
        for p in path_tokens(raw) {
            // A token carved out of an already-captured quoted name
            // ("notes.txt" inside "meeting notes.txt") is not a second path.
            if paths.iter().any(|q| q.contains(p.as_str())) {
                continue;
            }
            paths.push(p);
        }
        let mentions_files = has_any_word(normalized, FILE_WORDS) || !paths.is_empty();

        let action = if has_any_phrase(normalized, LIST_PHRASES) {
            WorkspaceAction::List
        } else if has_any_phrase(normalized, SEARCH_PHRASES) {
            WorkspaceAction::Search
        } else if has_any_word(normalized, DELETE_WORDS) && mentions_files {
            WorkspaceAction::Delete
        } else if has_any_word(normalized, MOVE_WORDS) && !paths.is_empty() {
            WorkspaceAction::Move
        } else if has_any_word(normalized, CREATE_WORDS) && mentions_files {
            WorkspaceAction::Create
        } else if has_any_word(normalized, READ_WORDS)
            && (!paths.is_empty() || mentions_ordinal_reference(normalized))
        {
            WorkspaceAction::Read
        } else {
            return None;
        };

        Some(RouteParams::Workspace(WorkspaceParams { action, paths }))
    }
}
