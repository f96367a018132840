//! Dirty-state guard
//!
//! Scans every worktree (the primary working directory included) for
//! uncommitted changes, and vetoes removal of any branch whose checkout
//! would lose them.

use crate::backend::{RepoBackend, WorktreeEntry};
use crate::types::WorktreeFact;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Check each worktree for uncommitted modifications
///
/// A worktree whose status cannot be read counts as dirty.
pub fn scan_worktrees<B: RepoBackend + ?Sized>(
    backend: &B,
    entries: Vec<WorktreeEntry>,
) -> Vec<WorktreeFact> {
    entries
        .into_iter()
        .map(|entry| {
            let is_dirty = if entry.is_prunable {
                false
            } else {
                backend.is_dirty(&entry.path).unwrap_or_else(|e| {
                    tracing::warn!(
                        worktree = %entry.path.display(),
                        error = %e,
                        "could not read worktree status; treating it as dirty"
                    );
                    true
                })
            };
            WorktreeFact {
                path: entry.path,
                associated_branch: entry.branch,
                is_dirty,
                is_primary: entry.is_primary,
                is_prunable: entry.is_prunable,
            }
        })
        .collect()
}

/// A worktree that must be removed before its branch can be deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeRemoval {
    pub path: PathBuf,
    /// Dirty worktree removed under an explicit override
    pub force: bool,
}

/// Guard decision for one branch slated for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Clear { removals: Vec<WorktreeRemoval> },
    Blocked { reason: String },
}

/// Decide whether `branch` may be deleted given the worktrees that use it
pub fn check_branch(branch: &str, worktrees: &[WorktreeFact], allow_dirty: bool) -> GuardVerdict {
    let mut removals = Vec::new();

    for worktree in worktrees
        .iter()
        .filter(|w| w.associated_branch.as_deref() == Some(branch))
    {
        if worktree.is_primary {
            return GuardVerdict::Blocked {
                reason: format!(
                    "checked out in the primary working directory {}",
                    worktree.path.display()
                ),
            };
        }
        if worktree.is_prunable {
            return GuardVerdict::Blocked {
                reason: format!(
                    "checked out in missing worktree {} (run `git worktree prune` first)",
                    worktree.path.display()
                ),
            };
        }
        if worktree.is_dirty && !allow_dirty {
            return GuardVerdict::Blocked {
                reason: format!(
                    "uncommitted changes in worktree {}",
                    worktree.path.display()
                ),
            };
        }
        removals.push(WorktreeRemoval {
            path: worktree.path.clone(),
            force: worktree.is_dirty,
        });
    }

    GuardVerdict::Clear { removals }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worktree(path: &str, branch: Option<&str>, dirty: bool, primary: bool) -> WorktreeFact {
        WorktreeFact {
            path: PathBuf::from(path),
            associated_branch: branch.map(str::to_string),
            is_dirty: dirty,
            is_primary: primary,
            is_prunable: false,
        }
    }

    #[test]
    fn test_branch_without_worktree_is_clear() {
        let worktrees = vec![worktree("/repo", Some("main"), true, true)];
        assert_eq!(
            check_branch("fix/typo", &worktrees, false),
            GuardVerdict::Clear { removals: vec![] }
        );
    }

    #[test]
    fn test_dirty_worktree_vetoes_removal() {
        let worktrees = vec![
            worktree("/repo", Some("main"), false, true),
            worktree("/wt/login", Some("feature/login"), true, false),
        ];
        let verdict = check_branch("feature/login", &worktrees, false);
        match verdict {
            GuardVerdict::Blocked { reason } => assert!(reason.contains("/wt/login")),
            other => panic!("expected veto, got {:?}", other),
        }
    }

    #[test]
    fn test_override_forces_dirty_removal() {
        let worktrees = vec![worktree("/wt/login", Some("feature/login"), true, false)];
        assert_eq!(
            check_branch("feature/login", &worktrees, true),
            GuardVerdict::Clear {
                removals: vec![WorktreeRemoval {
                    path: PathBuf::from("/wt/login"),
                    force: true,
                }]
            }
        );
    }

    #[test]
    fn test_clean_linked_worktree_is_removed_first() {
        let worktrees = vec![worktree("/wt/api", Some("feature/api"), false, false)];
        let GuardVerdict::Clear { removals } = check_branch("feature/api", &worktrees, false)
        else {
            panic!("clean worktree should not block");
        };
        assert_eq!(removals.len(), 1);
        assert!(!removals[0].force);
    }

    #[test]
    fn test_primary_checkout_always_blocks() {
        let worktrees = vec![worktree("/repo", Some("fix/typo"), false, true)];
        assert!(matches!(
            check_branch("fix/typo", &worktrees, true),
            GuardVerdict::Blocked { .. }
        ));
    }

    #[test]
    fn test_missing_worktree_blocks() {
        let mut missing = worktree("/gone", Some("old/topic"), false, false);
        missing.is_prunable = true;
        assert!(matches!(
            check_branch("old/topic", &[missing], true),
            GuardVerdict::Blocked { .. }
        ));
    }
}
