//! Cleanup plan builder
//!
//! Turns classifications into an ordered list of deletions. Only
//! `SAFE_TO_DELETE`, `SQUASH_MERGED` and `SUPERSEDED` branches become plan
//! items; every other branch lands in `keep` or `review`, and branches the
//! dirty-state guard vetoes land in `blocked`.

use crate::classify::Classification;
use crate::guard::{self, GuardVerdict};
use crate::types::{Category, WorktreeFact};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What a plan item removes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Branch { name: String },
    /// Linked worktree holding `branch`; removed before the branch itself
    Worktree { path: PathBuf, branch: String },
}

impl Target {
    /// Branch this item belongs to
    pub fn branch(&self) -> &str {
        match self {
            Target::Branch { name } => name,
            Target::Worktree { branch, .. } => branch,
        }
    }
}

/// One destructive command, ready for review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub target: Target,
    /// Category of the branch the item belongs to
    pub category: Category,
    /// Exact command that will run
    pub command: String,
    pub requires_force: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_refs: Vec<String>,
}

/// A deletable branch the guard refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedItem {
    pub branch: String,
    pub category: Category,
    pub reason: String,
}

/// Ordered deletions plus everything deliberately left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPlan {
    pub items: Vec<PlanItem>,
    pub blocked: Vec<BlockedItem>,
    /// Branches with work worth keeping
    pub keep: Vec<Classification>,
    /// Branches a person should look at before anything happens
    pub review: Vec<Classification>,
    /// Registered worktrees whose directories are gone
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stale_worktrees: Vec<PathBuf>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of branch deletions in the plan
    pub fn branch_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.target, Target::Branch { .. }))
            .count()
    }
}

/// Build the plan from classifier output and worktree facts
pub fn build_plan(
    classifications: &[Classification],
    worktrees: &[WorktreeFact],
    allow_dirty: bool,
) -> CleanupPlan {
    let mut plan = CleanupPlan {
        stale_worktrees: worktrees
            .iter()
            .filter(|w| w.is_prunable)
            .map(|w| w.path.clone())
            .collect(),
        ..CleanupPlan::default()
    };

    let mut deletable: Vec<&Classification> = Vec::new();
    let mut seen = HashSet::new();
    for classification in classifications {
        if !seen.insert(classification.branch.as_str()) {
            continue;
        }
        if classification.category.is_plannable() {
            deletable.push(classification);
        } else if classification.category.needs_review() {
            plan.review.push(classification.clone());
        } else {
            plan.keep.push(classification.clone());
        }
    }
    deletable.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.branch.cmp(&b.branch))
    });

    let mut removed_paths = HashSet::new();
    for classification in deletable {
        let removals = match guard::check_branch(&classification.branch, worktrees, allow_dirty) {
            GuardVerdict::Clear { removals } => removals,
            GuardVerdict::Blocked { reason } => {
                tracing::info!(branch = %classification.branch, %reason, "deletion blocked");
                plan.blocked.push(BlockedItem {
                    branch: classification.branch.clone(),
                    category: classification.category,
                    reason,
                });
                continue;
            }
        };

        for removal in removals {
            if !removed_paths.insert(removal.path.clone()) {
                continue;
            }
            plan.items.push(PlanItem {
                command: worktree_command(&removal.path, removal.force),
                target: Target::Worktree {
                    path: removal.path,
                    branch: classification.branch.clone(),
                },
                category: classification.category,
                requires_force: removal.force,
                evidence_refs: Vec::new(),
            });
        }

        let force = classification.category.requires_force();
        plan.items.push(PlanItem {
            target: Target::Branch {
                name: classification.branch.clone(),
            },
            category: classification.category,
            command: branch_command(&classification.branch, force),
            requires_force: force,
            evidence_refs: classification.evidence_refs.clone(),
        });
    }

    plan
}

fn branch_command(name: &str, force: bool) -> String {
    format!(
        "git branch {} {}",
        if force { "-D" } else { "-d" },
        shell_quote(name)
    )
}

fn worktree_command(path: &Path, force: bool) -> String {
    format!(
        "git worktree remove {}{}",
        if force { "--force " } else { "" },
        shell_quote(&path.display().to_string())
    )
}

/// Single-quote a word for display if a shell would split or expand it
fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./@+=:,%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
