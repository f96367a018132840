//! Lineage grouper
//!
//! Branches such as `feature/api`, `feature/api-v2` and `feature/api-v3-fix`
//! are usually iterations of one piece of work. A shared name prefix only
//! forms the group; a member is superseded only with direct evidence that
//! its commits live on in a newer member or on the default branch.

use crate::evidence::{MergeEvidence, Proof};
use crate::types::BranchFact;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TOKEN_SEPARATORS: [char; 3] = ['-', '_', '.'];

/// What a superseded member was replaced by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SupersededBy {
    /// Every unique commit reappears in a newer member
    NewerMember {
        branch: String,
        /// Commit ids in the newer member that matched
        matched: Vec<String>,
    },
    /// The default branch incorporated the member's work
    DefaultBranch { proof: Proof },
}

/// A superseded member and the evidence for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supersession {
    pub branch: String,
    pub by: SupersededBy,
}

impl Supersession {
    /// Commit ids cited for this supersession; never empty
    pub fn evidence_refs(&self) -> Vec<String> {
        match &self.by {
            SupersededBy::NewerMember { matched, .. } => matched.clone(),
            SupersededBy::DefaultBranch { proof } => proof.commit_ids(),
        }
    }
}

/// Two or more branches sharing a name prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGroup {
    /// Longest common prefix of the member names, on a token boundary
    pub prefix: String,
    /// Oldest to newest by first unique commit
    pub members: Vec<String>,
    pub superseded: Vec<Supersession>,
}

impl LineageGroup {
    pub fn supersession(&self, branch: &str) -> Option<&Supersession> {
        self.superseded.iter().find(|s| s.branch == branch)
    }

    /// No member has been shown to replace another
    pub fn is_hint_only(&self) -> bool {
        self.superseded.is_empty()
    }
}

/// Group key: directory part plus the first token of the last path segment
pub fn lineage_key(name: &str) -> String {
    let (dir, leaf) = match name.rfind('/') {
        Some(idx) => (&name[..=idx], &name[idx + 1..]),
        None => ("", name),
    };
    let first = leaf.split(TOKEN_SEPARATORS).next().unwrap_or(leaf);
    format!("{}{}", dir, first)
}

/// Group branches into lineages and find superseded members
pub fn group_lineages(
    branches: &[BranchFact],
    evidence: &BTreeMap<String, MergeEvidence>,
) -> Vec<LineageGroup> {
    let mut buckets: BTreeMap<String, Vec<&BranchFact>> = BTreeMap::new();
    for branch in branches {
        buckets.entry(lineage_key(&branch.name)).or_default().push(branch);
    }

    buckets
        .into_values()
        .filter(|members| members.len() >= 2)
        .map(|mut members| {
            members.sort_by(|a, b| {
                a.created_at()
                    .cmp(&b.created_at())
                    .then_with(|| a.name.cmp(&b.name))
            });
            let superseded = find_supersessions(&members, evidence);
            let names: Vec<String> = members.iter().map(|b| b.name.clone()).collect();
            LineageGroup {
                prefix: common_prefix(&names),
                members: names,
                superseded,
            }
        })
        .collect()
}

/// Members are ordered oldest first; only newer members can supersede
fn find_supersessions(
    members: &[&BranchFact],
    evidence: &BTreeMap<String, MergeEvidence>,
) -> Vec<Supersession> {
    let mut superseded = Vec::new();

    for (index, older) in members.iter().enumerate() {
        if older.is_degraded() || older.merged_into_default || older.unique_commits.is_empty() {
            continue;
        }

        if let Some(MergeEvidence::Incorporated { proof }) = evidence.get(&older.name) {
            superseded.push(Supersession {
                branch: older.name.clone(),
                by: SupersededBy::DefaultBranch {
                    proof: proof.clone(),
                },
            });
            continue;
        }

        let container = members[index + 1..]
            .iter()
            .rev()
            .filter(|newer| !newer.is_degraded())
            .find_map(|newer| containment(older, newer).map(|matched| (newer, matched)));

        if let Some((newer, matched)) = container {
            tracing::debug!(branch = %older.name, by = %newer.name, "superseded by newer lineage member");
            superseded.push(Supersession {
                branch: older.name.clone(),
                by: SupersededBy::NewerMember {
                    branch: newer.name.clone(),
                    matched,
                },
            });
        }
    }

    superseded
}

/// Ids of `newer`'s commits matching every unique commit of `older`, or
/// `None` if any commit of `older` is missing from `newer`
fn containment(older: &BranchFact, newer: &BranchFact) -> Option<Vec<String>> {
    let mut matched = Vec::with_capacity(older.unique_commits.len());
    for commit in &older.unique_commits {
        let hit = newer.unique_commits.iter().find(|c| c.same_change(commit))?;
        if !matched.contains(&hit.id) {
            matched.push(hit.id.clone());
        }
    }
    if matched.is_empty() { None } else { Some(matched) }
}

/// Longest common prefix, cut back to a token or path boundary
fn common_prefix(names: &[String]) -> String {
    let Some(first) = names.first() else {
        return String::new();
    };

    let mut len = first.len();
    for name in &names[1..] {
        len = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, c), _)| i + c.len_utf8())
            .unwrap_or(0)
            .min(len);
    }

    let is_boundary = |name: &String| {
        name[len..]
            .chars()
            .next()
            .is_none_or(|c| c == '/' || TOKEN_SEPARATORS.contains(&c))
    };
    if names.iter().all(is_boundary) {
        return first[..len].to_string();
    }

    let cut = first[..len]
        .rfind(|c: char| c == '/' || TOKEN_SEPARATORS.contains(&c))
        .unwrap_or(0);
    first[..cut].to_string()
}
