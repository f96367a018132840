//! Repository state reader
//!
//! Turns backend queries into [`RepoSnapshot`] facts. Never mutates. A
//! failure to list branches or worktrees is fatal (`RepositoryUnavailable`);
//! a failure in one branch's range queries only degrades that branch.

use crate::backend::{BranchRef, RepoBackend};
use crate::cancel::CancelToken;
use crate::config::TwigsConfig;
use crate::error::{Result, TwigsError};
use crate::guard::scan_worktrees;
use crate::pool::map_bounded;
use crate::types::{BranchFact, DefaultLog, FactStatus, RemoteTrackingState, RepoSnapshot};
use regex::Regex;

/// Read branches, worktrees and the default-branch log
pub fn read_state<B: RepoBackend + ?Sized>(
    backend: &B,
    config: &TwigsConfig,
    cancel: &CancelToken,
) -> Result<RepoSnapshot> {
    let protected = config.protected_regex()?;

    let refs = backend.list_branches().map_err(unavailable)?;
    let default_branch = detect_default_branch(backend, config, &refs)?;
    tracing::info!(default_branch = %default_branch, branches = refs.len(), "reading repository state");

    let candidates: Vec<BranchRef> = refs
        .into_iter()
        .filter(|r| !is_protected(&r.name, &default_branch, &protected))
        .collect();

    let entries = backend.list_worktrees().map_err(unavailable)?;
    cancel.check()?;
    let worktrees = scan_worktrees(backend, entries);

    let mut branches = map_bounded(&candidates, config.worker_count(), |branch| {
        if cancel.is_cancelled() {
            return None;
        }
        Some(gather_branch(backend, &default_branch, branch))
    })
    .into_iter()
    .collect::<Option<Vec<_>>>()
    .ok_or(TwigsError::UserAborted)?;
    branches.sort_by(|a, b| a.name.cmp(&b.name));
    cancel.check()?;

    let default_ref = local_ref(&default_branch);
    let default_log = match backend.log(None, &default_ref, Some(config.evidence_log_depth)) {
        Ok(commits) => DefaultLog::Available { commits },
        Err(e) => {
            tracing::warn!(error = %e, "default-branch log unavailable; merge evidence disabled");
            DefaultLog::Unavailable {
                reason: e.to_string(),
            }
        }
    };

    Ok(RepoSnapshot {
        repo_root: backend.repo_root().to_path_buf(),
        default_branch,
        branches,
        worktrees,
        default_log,
    })
}

/// Default branch: configured override, remote HEAD, then `main` / `master`
pub fn detect_default_branch<B: RepoBackend + ?Sized>(
    backend: &B,
    config: &TwigsConfig,
    refs: &[BranchRef],
) -> Result<String> {
    let has_local = |name: &str| refs.iter().any(|r| r.name == name);

    if let Some(name) = &config.default_branch {
        if has_local(name) || backend.branch_exists(name).unwrap_or(false) {
            return Ok(name.clone());
        }
        return Err(TwigsError::DefaultBranchNotFound);
    }

    match backend.remote_head(&config.remote) {
        Ok(Some(name)) if has_local(&name) => return Ok(name),
        Ok(Some(name)) => {
            tracing::debug!(remote_head = %name, "remote HEAD has no local branch");
        }
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %e, "could not read remote HEAD"),
    }

    ["main", "master"]
        .into_iter()
        .find(|name| has_local(name))
        .map(str::to_string)
        .ok_or(TwigsError::DefaultBranchNotFound)
}

fn is_protected(name: &str, default_branch: &str, protected: &Regex) -> bool {
    name == default_branch || protected.is_match(name)
}

fn tracking_state(branch: &BranchRef) -> RemoteTrackingState {
    match (&branch.upstream, branch.upstream_gone) {
        (None, _) => RemoteTrackingState::NoRemote,
        (Some(_), true) => RemoteTrackingState::RemoteDeleted,
        (Some(_), false) => RemoteTrackingState::RemotePresent,
    }
}

fn local_ref(name: &str) -> String {
    format!("refs/heads/{}", name)
}

/// Gather one branch's facts; query failures degrade instead of failing
fn gather_branch<B: RepoBackend + ?Sized>(
    backend: &B,
    default_branch: &str,
    branch: &BranchRef,
) -> BranchFact {
    let state = tracking_state(branch);
    let tip_ref = local_ref(&branch.name);
    let default_ref = local_ref(default_branch);

    let facts = (|| -> Result<BranchFact> {
        let unique_commits = backend.log(Some(&default_ref), &tip_ref, None)?;
        let merged_into_default =
            unique_commits.is_empty() && backend.is_ancestor(&tip_ref, &default_ref)?;
        let unpushed_commits = match (&branch.upstream, state) {
            (Some(upstream), RemoteTrackingState::RemotePresent) => {
                backend.log(Some(upstream), &tip_ref, None)?
            }
            _ => Vec::new(),
        };
        Ok(BranchFact {
            name: branch.name.clone(),
            tip: branch.tip.clone(),
            tip_time: branch.tip_time,
            upstream: branch.upstream.clone(),
            unique_commits,
            unpushed_commits,
            remote_tracking_state: state,
            merged_into_default,
            status: FactStatus::Complete,
        })
    })();

    facts.unwrap_or_else(|e| {
        tracing::warn!(branch = %branch.name, error = %e, "branch facts degraded; needs review");
        BranchFact::degraded(
            branch.name.clone(),
            branch.tip.clone(),
            branch.tip_time,
            branch.upstream.clone(),
            state,
            e.to_string(),
        )
    })
}

fn unavailable(e: TwigsError) -> TwigsError {
    match e {
        TwigsError::RepositoryUnavailable { .. } => e,
        other => TwigsError::RepositoryUnavailable {
            reason: other.to_string(),
        },
    }
}
