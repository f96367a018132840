//! Execution engine
//!
//! Runs an approved plan one item at a time. A failed item never stops the
//! run; the engine records it and moves on, except that a branch whose
//! worktree could not be removed is skipped.

use crate::approval::ApprovedPlan;
use crate::backend::RepoBackend;
use crate::cancel::CancelToken;
use crate::error::TwigsError;
use crate::plan::{PlanItem, Target};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Result of one plan item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Deleted,
    Failed {
        reason: String,
        /// The repository disagreed with the classification (a plain
        /// delete was refused as not fully merged)
        #[serde(default)]
        classification_mismatch: bool,
    },
    Skipped {
        reason: String,
    },
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemOutcome::Deleted => write!(f, "deleted"),
            ItemOutcome::Failed { reason, .. } => write!(f, "failed: {}", reason),
            ItemOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub item: PlanItem,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Per-item outcomes of one cleanup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub run_id: String,
    /// RFC 3339
    pub started_at: String,
    pub finished_at: String,
    pub outcomes: Vec<ItemResult>,
    /// Local branches left afterwards; `None` if they could not be listed
    pub remaining_branches: Option<Vec<String>>,
}

impl ExecutionReport {
    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn deleted_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Deleted))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Branches whose deletion contradicted their classification
    pub fn mismatches(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    ItemOutcome::Failed {
                        classification_mismatch: true,
                        ..
                    }
                )
            })
            .map(|r| r.item.target.branch())
            .collect()
    }
}

/// Execute approved items sequentially, checking for cancellation between
/// items. Items not reached after cancellation are reported as skipped.
pub fn execute<B: RepoBackend + ?Sized>(
    backend: &B,
    plan: ApprovedPlan,
    cancel: &CancelToken,
) -> ExecutionReport {
    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now().to_rfc3339();
    tracing::info!(%run_id, items = plan.len(), "executing cleanup plan");

    let mut blocked_branches: HashSet<String> = HashSet::new();
    let mut outcomes = Vec::with_capacity(plan.len());

    for item in plan.items() {
        let outcome = if cancel.is_cancelled() {
            ItemOutcome::Skipped {
                reason: "cancelled".to_string(),
            }
        } else {
            run_item(backend, item, &blocked_branches)
        };

        if matches!(item.target, Target::Worktree { .. })
            && !matches!(outcome, ItemOutcome::Deleted)
        {
            blocked_branches.insert(item.target.branch().to_string());
        }

        match &outcome {
            ItemOutcome::Failed { reason, .. } => {
                tracing::warn!(command = %item.command, %reason, "plan item failed")
            }
            other => tracing::debug!(command = %item.command, outcome = %other, "plan item done"),
        }
        outcomes.push(ItemResult {
            item: item.clone(),
            outcome,
        });
    }

    let remaining_branches = match backend.list_branches() {
        Ok(branches) => Some(branches.into_iter().map(|b| b.name).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "could not list branches after cleanup");
            None
        }
    };

    ExecutionReport {
        run_id,
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        outcomes,
        remaining_branches,
    }
}

fn run_item<B: RepoBackend + ?Sized>(
    backend: &B,
    item: &PlanItem,
    blocked_branches: &HashSet<String>,
) -> ItemOutcome {
    let result = match &item.target {
        Target::Worktree { path, .. } => backend.remove_worktree(path, item.requires_force),
        Target::Branch { name } => {
            if blocked_branches.contains(name) {
                return ItemOutcome::Skipped {
                    reason: "worktree removal did not succeed".to_string(),
                };
            }
            backend.delete_branch(name, item.requires_force)
        }
    };

    match result {
        Ok(()) => ItemOutcome::Deleted,
        Err(e) => {
            let classification_mismatch = matches!(item.target, Target::Branch { .. })
                && !item.requires_force
                && is_not_merged_refusal(&e);
            ItemOutcome::Failed {
                reason: failure_reason(&e),
                classification_mismatch,
            }
        }
    }
}

fn is_not_merged_refusal(error: &TwigsError) -> bool {
    matches!(error, TwigsError::MutationFailed { stderr, .. } if stderr.contains("not fully merged"))
}

fn failure_reason(error: &TwigsError) -> String {
    match error {
        TwigsError::MutationFailed { stderr, .. } if !stderr.is_empty() => stderr
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or(stderr)
            .trim()
            .to_string(),
        other => other.to_string(),
    }
}
