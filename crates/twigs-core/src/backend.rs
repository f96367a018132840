//! Version-control query interface
//!
//! Everything the engine learns about a repository, and the only two
//! mutations it ever performs, go through [`RepoBackend`]. The decision
//! layers never see this trait; they work on the facts the reader builds.

use crate::error::Result;
use crate::types::CommitSummary;
use std::path::{Path, PathBuf};

/// A local branch as listed by the backend, before any range queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub tip: String,
    pub tip_time: i64,
    /// Configured upstream (e.g. `origin/topic`)
    pub upstream: Option<String>,
    /// Upstream is configured but its remote ref no longer exists
    pub upstream_gone: bool,
}

/// A registered worktree as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    /// Short name of the checked-out branch
    pub branch: Option<String>,
    pub is_primary: bool,
    pub is_prunable: bool,
}

/// Read queries plus the two mutation verbs used by the execution engine
pub trait RepoBackend: Sync {
    /// Top-level directory of the working tree
    fn repo_root(&self) -> &Path;

    /// All local branches with tracking information
    fn list_branches(&self) -> Result<Vec<BranchRef>>;

    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Branch the remote's HEAD points at, if the remote records one
    fn remote_head(&self, remote: &str) -> Result<Option<String>>;

    /// Commits reachable from `tip` but not from `base` (all of `tip` when
    /// `base` is `None`), newest first, at most `limit` entries
    fn log(&self, base: Option<&str>, tip: &str, limit: Option<usize>)
    -> Result<Vec<CommitSummary>>;

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    fn list_worktrees(&self) -> Result<Vec<WorktreeEntry>>;

    /// Uncommitted or untracked changes in the given working directory
    fn is_dirty(&self, worktree: &Path) -> Result<bool>;

    /// Delete a local branch; `force` bypasses the merged-ness check
    fn delete_branch(&self, name: &str, force: bool) -> Result<()>;

    /// Remove a linked worktree; `force` discards uncommitted changes
    fn remove_worktree(&self, path: &Path, force: bool) -> Result<()>;
}
