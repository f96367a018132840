//! Terminal approval gate using dialoguer prompts
//!
//! `CliAdapter` asks whether to run the whole plan, pick a subset, or
//! cancel. Without a terminal it rejects the plan.

use std::fmt::Write as FmtWrite;
use std::io::IsTerminal;

use console::Style;
use dialoguer::theme::Theme;
use dialoguer::{MultiSelect, Select};
use owo_colors::OwoColorize;
use twigs_core::plan::Target;
use twigs_core::{Approval, ApprovalGate, CancelToken, CleanupPlan, LineageGroup, PlanItem};

/// Theme with a blank line between list items
struct SpacedTheme {
    prompt_style: Style,
    active_style: Style,
    inactive_style: Style,
}

impl SpacedTheme {
    fn new() -> Self {
        Self {
            prompt_style: Style::new().cyan().bold(),
            active_style: Style::new().cyan(),
            inactive_style: Style::new(),
        }
    }
}

impl Theme for SpacedTheme {
    fn format_select_prompt(&self, f: &mut dyn FmtWrite, prompt: &str) -> std::fmt::Result {
        write!(f, "{}", self.prompt_style.apply_to(format!("? {}", prompt)))
    }

    fn format_select_prompt_selection(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        sel: &str,
    ) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.prompt_style.apply_to(format!("? {}", prompt)),
            self.active_style.apply_to(sel)
        )
    }

    fn format_select_prompt_item(
        &self,
        f: &mut dyn FmtWrite,
        text: &str,
        active: bool,
    ) -> std::fmt::Result {
        writeln!(f)?;
        if active {
            write!(
                f,
                "  {} {}",
                self.active_style.apply_to(">"),
                self.active_style.apply_to(text)
            )
        } else {
            write!(f, "    {}", self.inactive_style.apply_to(text))
        }
    }

    fn format_multi_select_prompt(&self, f: &mut dyn FmtWrite, prompt: &str) -> std::fmt::Result {
        write!(f, "{}", self.prompt_style.apply_to(format!("? {}", prompt)))
    }

    fn format_multi_select_prompt_selection(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        selections: &[&str],
    ) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.prompt_style.apply_to(format!("? {}", prompt)),
            self.active_style
                .apply_to(format!("{} selected", selections.len()))
        )
    }

    fn format_multi_select_prompt_item(
        &self,
        f: &mut dyn FmtWrite,
        text: &str,
        checked: bool,
        active: bool,
    ) -> std::fmt::Result {
        writeln!(f)?;
        let checkbox = if checked { "[✓]" } else { "[ ]" };
        if active {
            write!(
                f,
                "  {} {} {}",
                self.active_style.apply_to(">"),
                self.active_style.apply_to(checkbox),
                self.active_style.apply_to(text)
            )
        } else {
            write!(
                f,
                "    {} {}",
                self.inactive_style.apply_to(checkbox),
                self.inactive_style.apply_to(text)
            )
        }
    }
}

const APPROVE_ALL: usize = 0;
const CHOOSE: usize = 1;

/// Interactive approval gate for terminal sessions
pub struct CliAdapter {
    is_tty: bool,
    cancel: CancelToken,
}

impl CliAdapter {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            is_tty: std::io::stdin().is_terminal() && std::io::stderr().is_terminal(),
            cancel,
        }
    }

    #[cfg(test)]
    pub fn with_tty(is_tty: bool, cancel: CancelToken) -> Self {
        Self { is_tty, cancel }
    }

    fn choose_items(
        &self,
        plan: &CleanupPlan,
        groups: &[LineageGroup],
    ) -> dialoguer::Result<Vec<usize>> {
        // Worktree removals follow their branch automatically
        let selectable: Vec<usize> = plan
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches!(item.target, Target::Branch { .. }))
            .map(|(i, _)| i)
            .collect();
        let labels: Vec<String> = selectable
            .iter()
            .map(|&i| item_label(&plan.items[i], groups))
            .collect();
        let defaults = vec![true; labels.len()];

        let picked = MultiSelect::with_theme(&SpacedTheme::new())
            .with_prompt("Select branches to delete (space toggles, enter confirms)")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;
        Ok(picked.into_iter().map(|p| selectable[p]).collect())
    }
}

/// Selection label, prefixed with the lineage the branch belongs to
fn item_label(item: &PlanItem, groups: &[LineageGroup]) -> String {
    let branch = item.target.branch();
    let line = format!("{:<15} {}", item.category.as_str(), item.command);
    match groups.iter().find(|g| g.members.iter().any(|m| m == branch)) {
        Some(group) => format!("[{}*] {}", group.prefix, line),
        None => line,
    }
}

impl ApprovalGate for CliAdapter {
    fn review(&self, plan: &CleanupPlan, groups: &[LineageGroup]) -> Approval {
        if !self.is_tty {
            eprintln!(
                "{} no terminal to confirm the plan; rerun with --yes to apply it",
                "warning:".yellow().bold()
            );
            return Approval::Reject;
        }
        if self.cancel.is_cancelled() || plan.items.is_empty() {
            return Approval::Reject;
        }

        eprintln!();
        let choice = Select::with_theme(&SpacedTheme::new())
            .with_prompt(format!("Delete {} branch(es)?", plan.branch_count()))
            .items(&["Delete all listed", "Choose which to delete", "Cancel"])
            .default(2)
            .interact();

        let approval = match choice {
            Ok(APPROVE_ALL) => Approval::ApproveAll,
            Ok(CHOOSE) => match self.choose_items(plan, groups) {
                Ok(indices) => Approval::Subset(indices),
                Err(e) => {
                    tracing::debug!(error = %e, "selection prompt ended");
                    Approval::Reject
                }
            },
            Ok(_) => Approval::Reject,
            Err(e) => {
                tracing::debug!(error = %e, "approval prompt ended");
                Approval::Reject
            }
        };

        if self.cancel.is_cancelled() {
            Approval::Reject
        } else {
            approval
        }
    }
}
