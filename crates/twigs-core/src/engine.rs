//! Pipeline orchestration
//!
//! Reader, evidence analyzer, lineage grouper, classifier and plan builder
//! run in that order; each consumes the previous stage's output. Cleanup
//! adds the approval gate and the execution engine on top.

use crate::approval::ApprovalGate;
use crate::backend::RepoBackend;
use crate::cancel::CancelToken;
use crate::classify::{Classification, classify_all};
use crate::config::TwigsConfig;
use crate::error::{Result, TwigsError};
use crate::evidence::{MergeEvidence, analyze_snapshot};
use crate::execute::{ExecutionReport, execute};
use crate::lineage::{LineageGroup, group_lineages};
use crate::plan::{CleanupPlan, build_plan};
use crate::reader::read_state;
use crate::types::RepoSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

/// Options that change what the plan may contain
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    /// Plan forced removal of dirty linked worktrees instead of blocking
    pub allow_dirty: bool,
}

/// Everything a read-only run learns
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub snapshot: RepoSnapshot,
    pub evidence: BTreeMap<String, MergeEvidence>,
    pub groups: Vec<LineageGroup>,
    pub classifications: Vec<Classification>,
    pub plan: CleanupPlan,
}

impl Analysis {
    pub fn classification(&self, branch: &str) -> Option<&Classification> {
        self.classifications.iter().find(|c| c.branch == branch)
    }
}

/// Run every read-only stage and build the cleanup plan
pub fn analyze<B: RepoBackend + ?Sized>(
    backend: &B,
    config: &TwigsConfig,
    options: AnalyzeOptions,
    cancel: &CancelToken,
) -> Result<Analysis> {
    let snapshot = read_state(backend, config, cancel)?;

    cancel.check()?;
    let evidence = analyze_snapshot(&snapshot, config.min_subject_len, config.worker_count());
    let groups = group_lineages(&snapshot.branches, &evidence);

    let classifications = classify_all(&snapshot, &evidence, &groups);
    let plan = build_plan(&classifications, &snapshot.worktrees, options.allow_dirty);
    tracing::info!(
        branches = snapshot.branches.len(),
        items = plan.items.len(),
        blocked = plan.blocked.len(),
        review = plan.review.len(),
        "analysis complete"
    );

    Ok(Analysis {
        snapshot,
        evidence,
        groups,
        classifications,
        plan,
    })
}

/// Present the plan to `gate` and execute whatever it approves
///
/// A rejection, or an approval that selects nothing, is `PlanRejected`;
/// nothing is executed in either case.
pub fn run_cleanup<B, G>(
    backend: &B,
    analysis: &Analysis,
    gate: &G,
    cancel: &CancelToken,
) -> Result<ExecutionReport>
where
    B: RepoBackend + ?Sized,
    G: ApprovalGate + ?Sized,
{
    cancel.check()?;
    let approval = gate.review(&analysis.plan, &analysis.groups);
    cancel.check()?;

    let approved = approval
        .apply(&analysis.plan)
        .ok_or(TwigsError::PlanRejected)?;
    Ok(execute(backend, approved, cancel))
}
