//! Branch classifier
//!
//! A pure function from facts, evidence and lineage context to a
//! [`Category`]. Rules are evaluated in order and the first match wins:
//!
//! | Rule | Condition                                   | Category             |
//! |------|---------------------------------------------|----------------------|
//! | 0    | facts degraded, or evidence unavailable     | `NEEDS_REVIEW`       |
//! | 1    | merged into default                         | `SAFE_TO_DELETE`     |
//! | 2    | superseded lineage member                   | `SUPERSEDED`         |
//! | 3    | squash/rebase evidence found                | `SQUASH_MERGED`      |
//! | 4    | remote deleted, no evidence                 | `REMOTE_GONE`        |
//! | 5    | unpushed commits                            | `UNPUSHED_WORK`      |
//! | 6    | remote present, nothing unpushed            | `SYNCED_WITH_REMOTE` |
//! | 7    | no remote, unique commits                   | `LOCAL_WORK`         |
//! | 8    | no remote, no unique commits                | `SAFE_TO_DELETE`     |

use crate::evidence::MergeEvidence;
use crate::lineage::{LineageGroup, SupersededBy, Supersession};
use crate::types::{BranchFact, Category, FactStatus, RemoteTrackingState, RepoSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classifier verdict for one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub branch: String,
    pub category: Category,
    /// Number of the rule that matched
    pub rule: u8,
    pub reason: String,
    /// Commit ids backing a destructive category; empty otherwise
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_refs: Vec<String>,
}

/// Classify one branch
pub fn classify(
    fact: &BranchFact,
    evidence: Option<&MergeEvidence>,
    supersession: Option<&Supersession>,
) -> Classification {
    let verdict = |category: Category, rule: u8, reason: String| Classification {
        branch: fact.name.clone(),
        category,
        rule,
        reason,
        evidence_refs: Vec::new(),
    };

    if let FactStatus::Degraded { reason } = &fact.status {
        return verdict(
            Category::NeedsReview,
            0,
            format!("facts incomplete: {}", reason),
        );
    }

    if fact.merged_into_default {
        return verdict(
            Category::SafeToDelete,
            1,
            "fully merged into the default branch".to_string(),
        );
    }

    if let Some(supersession) = supersession {
        let refs = supersession.evidence_refs();
        if !refs.is_empty() {
            let reason = match &supersession.by {
                SupersededBy::NewerMember { branch, .. } => {
                    format!("all commits reappear in newer branch {}", branch)
                }
                SupersededBy::DefaultBranch { .. } => {
                    "lineage member whose work reached the default branch".to_string()
                }
            };
            return Classification {
                evidence_refs: refs,
                ..verdict(Category::Superseded, 2, reason)
            };
        }
    }

    match evidence {
        Some(MergeEvidence::Incorporated { proof }) => {
            return Classification {
                evidence_refs: proof.commit_ids(),
                ..verdict(
                    Category::SquashMerged,
                    3,
                    format!(
                        "work found on the default branch ({} reference{})",
                        proof.refs().len(),
                        if proof.refs().len() == 1 { "" } else { "s" }
                    ),
                )
            };
        }
        Some(MergeEvidence::Unavailable { reason }) => {
            return verdict(
                Category::NeedsReview,
                0,
                format!("merge evidence unavailable: {}", reason),
            );
        }
        Some(MergeEvidence::NotFound) | None => {}
    }

    if fact.remote_tracking_state == RemoteTrackingState::RemoteDeleted {
        return verdict(
            Category::RemoteGone,
            4,
            format!(
                "upstream {} was deleted and no merge evidence was found",
                fact.upstream.as_deref().unwrap_or("branch")
            ),
        );
    }

    if !fact.unpushed_commits.is_empty() {
        return verdict(
            Category::UnpushedWork,
            5,
            format!("{} commit(s) not pushed", fact.unpushed_commits.len()),
        );
    }

    if fact.remote_tracking_state == RemoteTrackingState::RemotePresent {
        return verdict(
            Category::SyncedWithRemote,
            6,
            "in sync with its upstream".to_string(),
        );
    }

    if !fact.unique_commits.is_empty() {
        return verdict(
            Category::LocalWork,
            7,
            format!(
                "{} local-only commit(s) with no upstream",
                fact.unique_commits.len()
            ),
        );
    }

    verdict(
        Category::SafeToDelete,
        8,
        "no upstream and no commits beyond the default branch".to_string(),
    )
}

/// Classify every branch of a snapshot, in branch-name order
pub fn classify_all(
    snapshot: &RepoSnapshot,
    evidence: &BTreeMap<String, MergeEvidence>,
    groups: &[LineageGroup],
) -> Vec<Classification> {
    snapshot
        .branches
        .iter()
        .map(|fact| {
            let supersession = groups.iter().find_map(|g| g.supersession(&fact.name));
            classify(fact, evidence.get(&fact.name), supersession)
        })
        .collect()
}
