//! Core data types for twigs
//!
//! Facts are gathered fresh on every run and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single commit as seen in a log range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Full commit id
    pub id: String,
    /// First line of the message
    pub subject: String,
    /// Remaining message lines
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    /// Author timestamp (unix seconds)
    pub author_time: i64,
}

impl CommitSummary {
    /// Abbreviated id for display
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// Same change by content: identical id, or identical subject and author
    /// timestamp (both survive a rebase or cherry-pick)
    pub fn same_change(&self, other: &CommitSummary) -> bool {
        self.id == other.id
            || (self.author_time == other.author_time && self.subject == other.subject)
    }
}

/// Abbreviate a commit id to 10 characters
pub fn short_id(id: &str) -> &str {
    id.get(..10).unwrap_or(id)
}

/// Tracking relationship between a local branch and its remote counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteTrackingState {
    /// No upstream configured
    NoRemote,
    /// Upstream configured and the remote ref exists
    RemotePresent,
    /// Upstream configured but the remote ref is gone
    RemoteDeleted,
}

impl fmt::Display for RemoteTrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteTrackingState::NoRemote => write!(f, "no-remote"),
            RemoteTrackingState::RemotePresent => write!(f, "remote-present"),
            RemoteTrackingState::RemoteDeleted => write!(f, "remote-deleted"),
        }
    }
}

/// Whether every query for a branch completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FactStatus {
    #[default]
    Complete,
    /// A query timed out or failed; the remaining fields are not trustworthy
    Degraded { reason: String },
}

/// Everything known about one non-protected local branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchFact {
    /// Short branch name (e.g. `feature/login`)
    pub name: String,
    /// Tip commit id
    pub tip: String,
    /// Author timestamp of the tip commit
    pub tip_time: i64,
    /// Upstream ref (e.g. `origin/feature/login`) when configured
    pub upstream: Option<String>,
    /// Commits on this branch that are not on the default branch, newest first
    pub unique_commits: Vec<CommitSummary>,
    /// Commits on this branch that are not on its upstream, newest first
    pub unpushed_commits: Vec<CommitSummary>,
    pub remote_tracking_state: RemoteTrackingState,
    /// Every commit on the branch is an ancestor of the default branch tip
    pub merged_into_default: bool,
    #[serde(flatten)]
    pub status: FactStatus,
}

impl BranchFact {
    /// Fact for a branch whose queries could not complete
    pub fn degraded(
        name: impl Into<String>,
        tip: impl Into<String>,
        tip_time: i64,
        upstream: Option<String>,
        remote_tracking_state: RemoteTrackingState,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tip: tip.into(),
            tip_time,
            upstream,
            unique_commits: Vec::new(),
            unpushed_commits: Vec::new(),
            remote_tracking_state,
            merged_into_default: false,
            status: FactStatus::Degraded {
                reason: reason.into(),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, FactStatus::Degraded { .. })
    }

    /// Creation proxy: author time of the oldest unique commit, else the tip
    pub fn created_at(&self) -> i64 {
        self.unique_commits
            .iter()
            .map(|c| c.author_time)
            .min()
            .unwrap_or(self.tip_time)
    }
}

/// One registered worktree, including the primary working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeFact {
    pub path: PathBuf,
    /// Checked-out branch; `None` for a detached HEAD or bare entry
    pub associated_branch: Option<String>,
    /// Uncommitted modifications present (tracked or untracked)
    pub is_dirty: bool,
    /// The repository's main working directory
    pub is_primary: bool,
    /// Registered, but the directory no longer exists
    pub is_prunable: bool,
}

/// Commit log of the default branch, or why it could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DefaultLog {
    Available { commits: Vec<CommitSummary> },
    Unavailable { reason: String },
}

impl DefaultLog {
    pub fn commits(&self) -> Option<&[CommitSummary]> {
        match self {
            DefaultLog::Available { commits } => Some(commits),
            DefaultLog::Unavailable { .. } => None,
        }
    }
}

/// Output of the repository state reader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub repo_root: PathBuf,
    pub default_branch: String,
    /// Non-protected local branches, sorted by name
    pub branches: Vec<BranchFact>,
    pub worktrees: Vec<WorktreeFact>,
    pub default_log: DefaultLog,
}

impl RepoSnapshot {
    pub fn branch(&self, name: &str) -> Option<&BranchFact> {
        self.branches.iter().find(|b| b.name == name)
    }
}

/// Classifier output, one per branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    SafeToDelete,
    SquashMerged,
    Superseded,
    RemoteGone,
    UnpushedWork,
    LocalWork,
    SyncedWithRemote,
    /// Facts or evidence could not be gathered
    NeedsReview,
}

impl Category {
    /// Only these categories may appear as items of a cleanup plan
    pub fn is_plannable(self) -> bool {
        matches!(
            self,
            Category::SafeToDelete | Category::SquashMerged | Category::Superseded
        )
    }

    /// Deletion of a branch in this category must bypass ancestry checks
    pub fn requires_force(self) -> bool {
        matches!(self, Category::SquashMerged | Category::Superseded)
    }

    /// Categories that must never be deleted without a person looking
    pub fn needs_review(self) -> bool {
        matches!(self, Category::RemoteGone | Category::NeedsReview)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::SafeToDelete => "SAFE_TO_DELETE",
            Category::SquashMerged => "SQUASH_MERGED",
            Category::Superseded => "SUPERSEDED",
            Category::RemoteGone => "REMOTE_GONE",
            Category::UnpushedWork => "UNPUSHED_WORK",
            Category::LocalWork => "LOCAL_WORK",
            Category::SyncedWithRemote => "SYNCED_WITH_REMOTE",
            Category::NeedsReview => "NEEDS_REVIEW",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
