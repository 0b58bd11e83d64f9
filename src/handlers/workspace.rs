//! Workspace file handler.
//!
//! Destructive operations never execute directly: a delete first records a
//! PendingConfirmation and asks for consent; the pipeline executes it on the
//! next confirming reply via [`execute_delete`], item by item, reporting
//! partial failure.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use tracing::info;

use super::{Handler, HandlerDeps, HandlerOutcome, HandlerRequest};
use crate::errors::AdjutantError;
use crate::routing::detect::{RouteParams, WorkspaceAction, WorkspaceParams};
use crate::routing::route::Route;
use crate::session::state::LIST_TTL_SECS;
use crate::session::{
    confirmation_prompt, resolve_reference, IndexedList, ListKind, PendingConfirmation,
    PendingPathPrompt,
};
use crate::utils::truncate_string;

const READ_CAP: usize = 4000;

pub struct WorkspaceHandler;

/// Join `rel` under `root`, rejecting traversal out of the workspace.
pub fn resolve_in_workspace(root: &Path, rel: &str) -> Result<PathBuf, AdjutantError> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute()
        || rel_path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(AdjutantError::PathOutsideWorkspace(rel.to_string()));
    }
    Ok(root.join(rel_path))
}

/// Delete each path independently, collecting per-item results.
///
/// One failed item never aborts the rest; the caller reports the split.
pub fn execute_delete(root: &Path, paths: &[String]) -> Vec<(String, Result<(), String>)> {
    paths
        .iter()
        .map(|p| {
            let result = match resolve_in_workspace(root, p) {
                Ok(full) => {
                    if full.is_dir() {
                        std::fs::remove_dir_all(&full).map_err(|e| e.to_string())
                    } else {
                        std::fs::remove_file(&full).map_err(|e| e.to_string())
                    }
                }
                Err(e) => Err(e.to_string()),
            };
            (p.clone(), result)
        })
        .collect()
}

/// Render a partial-failure report for a completed delete.
pub fn delete_report(results: &[(String, Result<(), String>)]) -> String {
    let mut lines = Vec::new();
    for (path, result) in results {
        match result {
            Ok(()) => lines.push(format!("Deleted {path}.")),
            Err(e) => lines.push(format!("Could not delete {path}: {e}.")),
        }
    }
    lines.join("\n")
}

impl WorkspaceHandler {
    fn list_dir(req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let mut entries: Vec<String> = std::fs::read_dir(&deps.workspace)?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        entries.sort();
        if entries.is_empty() {
            return Ok(HandlerOutcome::reply("The workspace is empty."));
        }

        let pairs: Vec<(String, String)> =
            entries.iter().map(|n| (n.clone(), n.clone())).collect();
        let list = IndexedList::new(
            ListKind::File,
            "workspace files",
            req.source.clone(),
            pairs,
            Duration::seconds(LIST_TTL_SECS),
        );
        let mut out = String::from("Workspace files:\n");
        for item in list.items() {
            out.push_str(&format!("{}. {}\n", item.index, item.label));
        }
        deps.sessions
            .with(&req.chat_id, |s| s.remember_list(list));
        Ok(HandlerOutcome::reply(out.trim_end().to_string()))
    }

    fn read_file(
        req: &HandlerRequest,
        deps: &HandlerDeps,
        paths: &[String],
    ) -> Result<HandlerOutcome> {
        let target = match Self::pick_targets(req, deps, paths) {
            targets if !targets.is_empty() => targets[0].clone(),
            _ => {
                return Ok(Self::prompt_for_path(req, deps, "read"));
            }
        };
        let full = resolve_in_workspace(&deps.workspace, &target)?;
        let content = std::fs::read_to_string(&full)?;
        Ok(HandlerOutcome::reply(format!(
            "{}:\n{}",
            target,
            truncate_string(&content, READ_CAP)
        )))
    }

    fn create_files(req: &HandlerRequest, deps: &HandlerDeps, paths: &[String]) -> Result<HandlerOutcome> {
        if paths.is_empty() {
            return Ok(HandlerOutcome::reply(
                "What should the new file be called?",
            ));
        }
        let mut created = Vec::new();
        for p in paths {
            let full = resolve_in_workspace(&deps.workspace, p)?;
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            // Pre-generated content (from a plan step's sub-prompt) becomes
            // the file body; otherwise an empty file is touched.
            match &req.content {
                Some(content) => std::fs::write(&full, content)?,
                None => {
                    std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&full)?;
                }
            }
            created.push(p.clone());
        }
        info!(count = created.len(), "created workspace files");
        Ok(HandlerOutcome::reply(format!(
            "Created {}.",
            created.join(", ")
        )))
    }

    fn move_file(deps: &HandlerDeps, paths: &[String]) -> Result<HandlerOutcome> {
        if paths.len() < 2 {
            return Ok(HandlerOutcome::reply(
                "I need both a source and a destination to move a file.",
            ));
        }
        let src = resolve_in_workspace(&deps.workspace, &paths[0])?;
        let dst = resolve_in_workspace(&deps.workspace, &paths[1])?;
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&src, &dst)?;
        Ok(HandlerOutcome::reply(format!(
            "Moved {} to {}.",
            paths[0], paths[1]
        )))
    }

    fn search(req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        // Search by filename substring; the query is whatever words remain
        // after the search verb.
        let query = req
            .normalized
            .split_whitespace()
            .filter(|w| !["search", "find", "look", "for", "file", "files", "a", "the"].contains(w))
            .collect::<Vec<_>>()
            .join(" ");
        if query.is_empty() {
            return Ok(HandlerOutcome::reply("What should I search for?"));
        }
        let mut hits: Vec<String> = std::fs::read_dir(&deps.workspace)?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.to_lowercase().contains(&query))
            .collect();
        hits.sort();
        if hits.is_empty() {
            return Ok(HandlerOutcome::reply(format!("No files matching '{query}'.")));
        }
        let pairs: Vec<(String, String)> = hits.iter().map(|n| (n.clone(), n.clone())).collect();
        let list = IndexedList::new(
            ListKind::File,
            format!("files matching '{query}'"),
            req.source.clone(),
            pairs,
            Duration::seconds(LIST_TTL_SECS),
        );
        let mut out = format!("Files matching '{query}':\n");
        for item in list.items() {
            out.push_str(&format!("{}. {}\n", item.index, item.label));
        }
        deps.sessions.with(&req.chat_id, |s| s.remember_list(list));
        Ok(HandlerOutcome::reply(out.trim_end().to_string()))
    }

    fn request_delete(
        req: &HandlerRequest,
        deps: &HandlerDeps,
        paths: &[String],
    ) -> HandlerOutcome {
        let targets = Self::pick_targets(req, deps, paths);
        if targets.is_empty() {
            return Self::prompt_for_path(req, deps, "delete");
        }
        let pending = PendingConfirmation::new(
            &req.chat_id,
            targets.clone(),
            &req.source,
            req.user_id.as_deref(),
        );
        deps.sessions
            .with(&req.chat_id, |s| s.set_pending_confirmation(pending));
        HandlerOutcome::reply(confirmation_prompt(&targets))
    }

    /// Explicit paths win; otherwise a live file list plus an ordinal
    /// reference supplies the targets.
    fn pick_targets(req: &HandlerRequest, deps: &HandlerDeps, paths: &[String]) -> Vec<String> {
        if !paths.is_empty() {
            return paths.to_vec();
        }
        deps.sessions.with(&req.chat_id, |s| {
            let Some(list) = s.list() else {
                return Vec::new();
            };
            if list.kind != ListKind::File {
                return Vec::new();
            }
            let Some(selection) = resolve_reference(&req.normalized, list.len()) else {
                return Vec::new();
            };
            selection
                .indices
                .iter()
                .filter_map(|i| list.get(*i))
                .map(|item| item.reference.clone())
                .collect()
        })
    }

    fn prompt_for_path(req: &HandlerRequest, deps: &HandlerDeps, verb: &str) -> HandlerOutcome {
        let prompt = PendingPathPrompt::new(&req.chat_id, &req.source, req.user_id.as_deref());
        deps.sessions.with(&req.chat_id, |s| s.set_pending_path(prompt));
        HandlerOutcome::reply(format!("Which file should I {verb}?"))
    }
}

#[async_trait]
impl Handler for WorkspaceHandler {
    fn route(&self) -> Route {
        Route::Workspace
    }

    async fn handle(&self, req: &HandlerRequest, deps: &HandlerDeps) -> Result<HandlerOutcome> {
        let params = match &req.params {
            Some(RouteParams::Workspace(p)) => p.clone(),
            // Route committed without a detector match: a directory listing
            // is the safe interpretation.
            _ => WorkspaceParams {
                action: WorkspaceAction::List,
                paths: Vec::new(),
            },
        };

        match params.action {
            WorkspaceAction::List => Self::list_dir(req, deps),
            WorkspaceAction::Read => Self::read_file(req, deps, &params.paths),
            WorkspaceAction::Create => Self::create_files(req, deps, &params.paths),
            WorkspaceAction::Delete => Ok(Self::request_delete(req, deps, &params.paths)),
            WorkspaceAction::Move => Self::move_file(deps, &params.paths),
            WorkspaceAction::Search => Self::search(req, deps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::ReminderService;
    use crate::session::SessionStore;
    use std::sync::Arc;

    fn deps(dir: &tempfile::TempDir) -> HandlerDeps {
        HandlerDeps {
            sessions: Arc::new(SessionStore::new()),
            reminders: Arc::new(ReminderService::new(dir.path().join("reminders.json"))),
            workspace: dir.path().join("ws"),
            client: None,
        }
    }

    fn request(text: &str) -> HandlerRequest {
        HandlerRequest {
            channel: "cli".into(),
            chat_id: "c1".into(),
            user_id: None,
            source: "user".into(),
            raw: text.into(),
            normalized: crate::routing::normalize(text),
            params: None,
            content: None,
        }
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = Path::new("/tmp/ws");
        assert!(resolve_in_workspace(root, "../etc/passwd").is_err());
        assert!(resolve_in_workspace(root, "/etc/passwd").is_err());
        assert!(resolve_in_workspace(root, "docs/a.txt").is_ok());
    }

    #[test]
    fn test_execute_delete_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("b.txt"), "data").unwrap();

        let results = execute_delete(root, &["a.txt".into(), "b.txt".into()]);
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());
        assert!(!root.join("b.txt").exists());

        let report = delete_report(&results);
        assert!(report.contains("Could not delete a.txt"));
        assert!(report.contains("Deleted b.txt"));
    }

    #[tokio::test]
    async fn test_delete_sets_pending_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps(&dir);
        let mut req = request("delete report.pdf");
        req.params = Some(RouteParams::Workspace(WorkspaceParams {
            action: WorkspaceAction::Delete,
            paths: vec!["report.pdf".into()],
        }));

        let outcome = WorkspaceHandler.handle(&req, &deps).await.unwrap();
        assert!(outcome.handled);
        assert!(outcome.reply.unwrap().contains("report.pdf"));
        deps.sessions.with("c1", |s| {
            let pending = s.pending_confirmation().unwrap();
            assert_eq!(pending.paths, vec!["report.pdf"]);
        });
    }

    #[tokio::test]
    async fn test_delete_without_path_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps(&dir);
        let mut req = request("delete the file");
        req.params = Some(RouteParams::Workspace(WorkspaceParams {
            action: WorkspaceAction::Delete,
            paths: vec![],
        }));

        let outcome = WorkspaceHandler.handle(&req, &deps).await.unwrap();
        assert!(outcome.reply.unwrap().contains("Which file"));
        deps.sessions.with("c1", |s| {
            assert!(s.pending_path().is_some());
            assert!(s.pending_confirmation().is_none());
        });
    }

    #[tokio::test]
    async fn test_delete_via_list_reference() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps(&dir);
        deps.sessions.with("c1", |s| {
            s.remember_list(IndexedList::new(
                ListKind::File,
                "files",
                "user",
                vec![
                    ("a.txt".into(), "a.txt".into()),
                    ("b.txt".into(), "b.txt".into()),
                ],
                Duration::minutes(5),
            ));
        });
        let mut req = request("delete the second one");
        req.params = Some(RouteParams::Workspace(WorkspaceParams {
            action: WorkspaceAction::Delete,
            paths: vec![],
        }));

        let outcome = WorkspaceHandler.handle(&req, &deps).await.unwrap();
        assert!(outcome.reply.unwrap().contains("b.txt"));
        deps.sessions.with("c1", |s| {
            assert_eq!(s.pending_confirmation().unwrap().paths, vec!["b.txt"]);
        });
    }

    #[tokio::test]
    async fn test_create_with_generated_content() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps(&dir);
        std::fs::create_dir_all(&deps.workspace).unwrap();

        let mut req = request("create notes.txt");
        req.params = Some(RouteParams::Workspace(WorkspaceParams {
            action: WorkspaceAction::Create,
            paths: vec!["notes.txt".into()],
        }));
        req.content = Some("dear diary".into());

        WorkspaceHandler.handle(&req, &deps).await.unwrap();
        let body = std::fs::read_to_string(deps.workspace.join("notes.txt")).unwrap();
        assert_eq!(body, "dear diary");
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps(&dir);
        std::fs::create_dir_all(&deps.workspace).unwrap();

        let mut req = request("create notes.txt");
        req.params = Some(RouteParams::Workspace(WorkspaceParams {
            action: WorkspaceAction::Create,
            paths: vec!["notes.txt".into()],
        }));
        let outcome = WorkspaceHandler.handle(&req, &deps).await.unwrap();
        assert!(outcome.reply.unwrap().contains("notes.txt"));
        assert!(deps.workspace.join("notes.txt").exists());

        let mut req = request("list my files");
        req.params = Some(RouteParams::Workspace(WorkspaceParams {
            action: WorkspaceAction::List,
            paths: vec![],
        }));
        let outcome = WorkspaceHandler.handle(&req, &deps).await.unwrap();
        assert!(outcome.reply.unwrap().contains("1. notes.txt"));
        deps.sessions.with("c1", |s| {
            assert_eq!(s.list().unwrap().len(), 1);
        });
    }
}
