//! Human-readable rendering of analyses, plans and reports

use owo_colors::OwoColorize;
use twigs_core::lineage::SupersededBy;
use twigs_core::plan::Target;
use twigs_core::types::short_id;
use twigs_core::{Analysis, Category, CleanupPlan, ExecutionReport, ItemOutcome, LineageGroup};

use crate::colors::COLORS;

const CATEGORY_ORDER: [Category; 8] = [
    Category::SafeToDelete,
    Category::SquashMerged,
    Category::Superseded,
    Category::RemoteGone,
    Category::NeedsReview,
    Category::UnpushedWork,
    Category::LocalWork,
    Category::SyncedWithRemote,
];

/// Branches by category, then lineage groups
pub fn print_analysis(analysis: &Analysis, verbose: bool) {
    println!(
        "{} {} (default branch {})",
        "Repository".style(COLORS.active),
        analysis.snapshot.repo_root.display(),
        analysis.snapshot.default_branch.bold()
    );

    if analysis.classifications.is_empty() {
        println!();
        println!("No branches to classify.");
        return;
    }

    for category in CATEGORY_ORDER {
        let members: Vec<_> = analysis
            .classifications
            .iter()
            .filter(|c| c.category == category)
            .collect();
        if members.is_empty() {
            continue;
        }

        println!();
        println!(
            "{} ({})",
            category.as_str().style(COLORS.category(category)).bold(),
            members.len()
        );
        for c in members {
            println!("  {:<32} {}", c.branch, c.reason.style(COLORS.muted));
            if verbose && !c.evidence_refs.is_empty() {
                let refs: Vec<&str> = c.evidence_refs.iter().map(|r| short_id(r)).collect();
                println!("  {:<32} evidence: {}", "", refs.join(", "));
            }
        }
    }

    if !analysis.groups.is_empty() {
        println!();
        println!("{}", "Lineage groups".style(COLORS.active));
        for group in &analysis.groups {
            print_group(group);
        }
    }
}

fn print_group(group: &LineageGroup) {
    println!("  {}*  {}", group.prefix, group.members.join(" -> "));
    if group.is_hint_only() {
        println!("    {}", "related by name only; nothing superseded".style(COLORS.muted));
    }
    for s in &group.superseded {
        let by = match &s.by {
            SupersededBy::NewerMember { branch, .. } => branch.clone(),
            SupersededBy::DefaultBranch { .. } => "the default branch".to_string(),
        };
        println!("    {} superseded by {}", s.branch, by);
    }
}

/// The exact commands a cleanup would run, plus what it leaves alone
pub fn print_plan(plan: &CleanupPlan) {
    println!();
    if plan.items.is_empty() {
        println!("{}", "Nothing to clean up.".style(COLORS.success));
    } else {
        println!("{}", "Cleanup plan".style(COLORS.active));
        for (i, item) in plan.items.iter().enumerate() {
            let marker = match item.target {
                Target::Worktree { .. } => "worktree",
                Target::Branch { .. } => item.category.as_str(),
            };
            println!(
                "  {:>2}. {:<15} {}",
                i + 1,
                marker.style(COLORS.category(item.category)),
                item.command
            );
        }
    }

    if !plan.blocked.is_empty() {
        println!();
        println!("{}", "Blocked".style(COLORS.warning));
        for b in &plan.blocked {
            println!("  {:<32} {}", b.branch, b.reason);
        }
    }

    if !plan.review.is_empty() {
        println!();
        println!("{}", "Needs review (never deleted automatically)".style(COLORS.warning));
        for c in &plan.review {
            println!("  {:<32} {}", c.branch, c.category);
        }
    }

    for path in &plan.stale_worktrees {
        println!(
            "{} worktree {} no longer exists; run `git worktree prune`",
            "warning:".yellow().bold(),
            path.display()
        );
    }
}

/// Per-item outcomes and totals
pub fn print_report(report: &ExecutionReport) {
    println!();
    for result in &report.outcomes {
        let line = &result.item.command;
        match &result.outcome {
            ItemOutcome::Deleted => println!("{} {}", "✓".style(COLORS.success), line),
            ItemOutcome::Failed {
                reason,
                classification_mismatch,
            } => {
                println!("{} {}", "✗".style(COLORS.fail), line);
                println!("    {}", reason.style(COLORS.fail));
                if *classification_mismatch {
                    println!(
                        "    {}",
                        "git does not consider this branch merged; it was left in place"
                            .style(COLORS.warning)
                    );
                }
            }
            ItemOutcome::Skipped { reason } => {
                println!("{} {} ({})", "-".style(COLORS.muted), line, reason)
            }
        }
    }

    println!();
    let summary = format!(
        "{} deleted, {} failed, {} skipped",
        report.deleted_count(),
        report.failed_count(),
        report.skipped_count()
    );
    if report.has_failures() {
        println!("{}", summary.style(COLORS.fail));
    } else {
        println!("{}", summary.style(COLORS.success));
    }
}
