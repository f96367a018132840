//! JSON output formatting

use serde::{Deserialize, Serialize};
use twigs_core::execute::ItemResult;
use twigs_core::{
    Analysis, BranchFact, Category, Classification, CleanupPlan, ExecutionReport, LineageGroup,
    TwigsError,
};

const SCHEMA_VERSION: &str = "1";

/// JSON response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    /// Schema version for forward compatibility
    pub schema_version: String,
    /// Command that generated this response
    pub command: String,
    /// Status: "ok" or "error"
    pub status: String,
    /// Command-specific payload
    pub data: T,
    /// Errors and warnings
    pub issues: Vec<JsonIssue>,
}

impl<T> JsonResponse<T> {
    pub fn ok(command: &str, data: T) -> Self {
        Self::ok_with_issues(command, data, vec![])
    }

    pub fn ok_with_issues(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "ok".to_string(),
            data,
            issues,
        }
    }

    pub fn error(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "error".to_string(),
            data,
            issues,
        }
    }
}

impl<T: Serialize> JsonResponse<T> {
    /// Write the envelope to stdout
    pub fn print(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// Issue object structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonIssue {
    /// Error code (e.g. "E101"), or "W" codes for warnings
    pub code: String,
    pub severity: String,
    pub message: String,
    /// Branch the issue concerns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl JsonIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity: "warning".to_string(),
            message: message.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }
}

impl From<&TwigsError> for JsonIssue {
    fn from(err: &TwigsError) -> Self {
        Self {
            code: err.code().to_string(),
            severity: "error".to_string(),
            message: err.to_string(),
            branch: None,
        }
    }
}

/// One classified branch, with the facts that decided it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchSummary {
    pub name: String,
    pub category: Category,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_refs: Vec<String>,
    pub remote_tracking_state: String,
    pub unique_commits: usize,
    pub unpushed_commits: usize,
}

impl BranchSummary {
    fn new(classification: &Classification, fact: Option<&BranchFact>) -> Self {
        Self {
            name: classification.branch.clone(),
            category: classification.category,
            reason: classification.reason.clone(),
            evidence_refs: classification.evidence_refs.clone(),
            remote_tracking_state: fact
                .map(|f| f.remote_tracking_state.to_string())
                .unwrap_or_default(),
            unique_commits: fact.map_or(0, |f| f.unique_commits.len()),
            unpushed_commits: fact.map_or(0, |f| f.unpushed_commits.len()),
        }
    }
}

/// Data payload for the analyze command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeData {
    pub repo_root: String,
    pub default_branch: String,
    pub branches: Vec<BranchSummary>,
    pub lineage_groups: Vec<LineageGroup>,
    pub plan: CleanupPlan,
}

impl From<&Analysis> for AnalyzeData {
    fn from(analysis: &Analysis) -> Self {
        Self {
            repo_root: analysis.snapshot.repo_root.display().to_string(),
            default_branch: analysis.snapshot.default_branch.clone(),
            branches: analysis
                .classifications
                .iter()
                .map(|c| BranchSummary::new(c, analysis.snapshot.branch(&c.branch)))
                .collect(),
            lineage_groups: analysis.groups.clone(),
            plan: analysis.plan.clone(),
        }
    }
}

/// Data payload for the clean command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanData {
    pub plan: CleanupPlan,
    pub dry_run: bool,
    /// Absent when nothing was executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<ItemResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_branches: Option<Vec<String>>,
}

impl From<&ExecutionReport> for ReportData {
    fn from(report: &ExecutionReport) -> Self {
        Self {
            run_id: report.run_id.clone(),
            started_at: report.started_at.clone(),
            finished_at: report.finished_at.clone(),
            deleted: report.deleted_count(),
            failed: report.failed_count(),
            skipped: report.skipped_count(),
            outcomes: report.outcomes.clone(),
            remaining_branches: report.remaining_branches.clone(),
        }
    }
}

/// Warnings worth surfacing alongside a successful analysis
pub fn analysis_issues(analysis: &Analysis) -> Vec<JsonIssue> {
    let plan = &analysis.plan;
    let blocked = plan.blocked.iter().map(|b| {
        JsonIssue::warning("W201", format!("deletion blocked: {}", b.reason)).with_branch(&b.branch)
    });
    let review = plan.review.iter().map(|c| {
        JsonIssue::warning("W202", format!("{}: {}", c.category, c.reason)).with_branch(&c.branch)
    });
    let stale = plan.stale_worktrees.iter().map(|p| {
        JsonIssue::warning(
            "W203",
            format!("worktree {} no longer exists; run `git worktree prune`", p.display()),
        )
    });
    blocked.chain(review).chain(stale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_fields() {
        let response = JsonResponse::ok("analyze", serde_json::json!({"x": 1}));
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["schema_version"], "1");
        assert_eq!(value["command"], "analyze");
        assert_eq!(value["status"], "ok");
        assert!(value["issues"].as_array().expect("array").is_empty());
    }

    #[test]
    fn test_error_issue_carries_code() {
        let err = TwigsError::RepositoryUnavailable {
            reason: "not a git repository".to_string(),
        };
        let issue = JsonIssue::from(&err);
        assert_eq!(issue.code, "E101");
        assert_eq!(issue.severity, "error");
        let json = serde_json::to_string(&issue).expect("serialize");
        assert!(!json.contains("branch"));
    }
}
