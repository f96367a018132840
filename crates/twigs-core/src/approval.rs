//! Approval gate
//!
//! The execution engine accepts only an [`ApprovedPlan`], and the only way
//! to obtain one is [`Approval::apply`] on the answer an [`ApprovalGate`]
//! gave for the plan it was shown.

use crate::lineage::LineageGroup;
use crate::plan::{CleanupPlan, PlanItem, Target};
use std::collections::BTreeSet;

/// Answer from the person (or policy) reviewing a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    ApproveAll,
    /// Indices into `CleanupPlan::items`
    Subset(Vec<usize>),
    Reject,
}

/// Presents a plan and returns the reviewer's decision
pub trait ApprovalGate {
    fn review(&self, plan: &CleanupPlan, groups: &[LineageGroup]) -> Approval;
}

/// Plan items cleared for execution, in plan order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedPlan {
    items: Vec<PlanItem>,
}

impl ApprovedPlan {
    pub fn items(&self) -> &[PlanItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Approval {
    /// Resolve against the plan that was reviewed
    ///
    /// Returns `None` for a rejection or an approval that selects nothing.
    /// Selecting a branch deletion also selects the worktree removals that
    /// must run before it; out-of-range indices are ignored.
    pub fn apply(self, plan: &CleanupPlan) -> Option<ApprovedPlan> {
        let items = match self {
            Approval::Reject => return None,
            Approval::ApproveAll => plan.items.clone(),
            Approval::Subset(indices) => {
                let mut selected: BTreeSet<usize> = indices
                    .into_iter()
                    .filter(|&i| i < plan.items.len())
                    .collect();

                let branches: Vec<&str> = selected
                    .iter()
                    .filter_map(|&i| match &plan.items[i].target {
                        Target::Branch { name } => Some(name.as_str()),
                        Target::Worktree { .. } => None,
                    })
                    .collect();
                let prerequisites: Vec<usize> = plan
                    .items
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| {
                        matches!(&item.target, Target::Worktree { branch, .. } if branches.contains(&branch.as_str()))
                    })
                    .map(|(i, _)| i)
                    .collect();
                selected.extend(prerequisites);

                selected.into_iter().map(|i| plan.items[i].clone()).collect()
            }
        };

        if items.is_empty() {
            None
        } else {
            Some(ApprovedPlan { items })
        }
    }
}
