//! Implementation of the `twigs clean` command

use anyhow::Context as _;
use twigs_core::{
    AnalyzeOptions, Approval, ApprovalGate, CancelToken, CleanupPlan, LineageGroup, TwigsError,
    run_cleanup,
};

use super::analyze::run_pipeline;
use super::{GlobalArgs, report_error};
use crate::interaction::{AutoApprove, CliAdapter};
use crate::output::{CleanData, JsonIssue, JsonResponse, ReportData, analysis_issues};
use crate::render;

/// Flags of the clean command
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanArgs {
    pub yes: bool,
    pub dry_run: bool,
    pub allow_dirty: bool,
}

/// Run the clean command
///
/// Exit codes: 0 when every approved item succeeded (or nothing needed
/// doing), 1 when some items failed, 5 when the plan was rejected or the
/// run cancelled, otherwise the error's own code.
pub fn run_clean(args: &GlobalArgs, clean: CleanArgs, cancel: &CancelToken) -> Result<i32, String> {
    let options = AnalyzeOptions {
        allow_dirty: clean.allow_dirty,
    };
    let (git, analysis) = match run_pipeline(args, options, cancel) {
        Ok(ok) => ok,
        Err(e) => return report_error("clean", &e, serde_json::Value::Null, args.json),
    };
    let mut issues = analysis_issues(&analysis);
    let plan = analysis.plan.clone();

    if !args.json && !args.quiet {
        render::print_analysis(&analysis, args.verbose);
        render::print_plan(&plan);
    }

    if clean.dry_run || plan.is_empty() {
        return emit(
            args,
            CleanData {
                plan,
                dry_run: clean.dry_run,
                report: None,
            },
            issues,
        )
        .map(|()| 0);
    }

    // Nothing is deleted without the exact commands on screen
    if !args.json && args.quiet {
        render::print_plan(&plan);
    }

    let gate: Box<dyn ApprovalGate> = if clean.yes {
        Box::new(AutoApprove)
    } else if args.json {
        // Prompts would interleave with the JSON document
        Box::new(Reject)
    } else {
        Box::new(CliAdapter::new(cancel.clone()))
    };

    let report = match run_cleanup(&git, &analysis, gate.as_ref(), cancel) {
        Ok(report) => report,
        Err(e @ (TwigsError::PlanRejected | TwigsError::UserAborted)) => {
            if args.json {
                issues.push(JsonIssue::from(&e));
                let data = CleanData {
                    plan,
                    dry_run: false,
                    report: None,
                };
                JsonResponse::error("clean", data, issues)
                    .print()
                    .context("failed to write JSON output")
                    .map_err(|e| format!("{:#}", e))?;
            } else if !args.quiet {
                println!("Nothing was deleted.");
            }
            return Ok(e.exit_code());
        }
        Err(e) => return report_error("clean", &e, serde_json::Value::Null, args.json),
    };

    if !args.json {
        render::print_report(&report);
    }
    for branch in report.mismatches() {
        issues.push(
            JsonIssue::warning(
                "W204",
                "delete refused as not fully merged; classification disagrees with git",
            )
            .with_branch(branch),
        );
    }

    let code = if report.has_failures() { 1 } else { 0 };
    emit(
        args,
        CleanData {
            plan,
            dry_run: false,
            report: Some(ReportData::from(&report)),
        },
        issues,
    )
    .map(|()| code)
}

/// Gate used with `--json` and no `--yes`
struct Reject;

impl ApprovalGate for Reject {
    fn review(&self, _plan: &CleanupPlan, _groups: &[LineageGroup]) -> Approval {
        Approval::Reject
    }
}

fn emit(args: &GlobalArgs, data: CleanData, issues: Vec<JsonIssue>) -> Result<(), String> {
    if args.json {
        JsonResponse::ok_with_issues("clean", data, issues)
            .print()
            .context("failed to write JSON output")
            .map_err(|e| format!("{:#}", e))?;
    }
    Ok(())
}
