//! Terminal interaction: approval prompts, progress spinner, Ctrl+C
//!
//! `CliAdapter` implements the core `ApprovalGate` with dialoguer prompts;
//! `AutoApprove` stands in for it under `--yes`.

mod cli_adapter;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use twigs_core::{Approval, ApprovalGate, CancelToken, CleanupPlan, LineageGroup};

pub use cli_adapter::CliAdapter;

/// Approves every item without asking
pub struct AutoApprove;

impl ApprovalGate for AutoApprove {
    fn review(&self, _plan: &CleanupPlan, _groups: &[LineageGroup]) -> Approval {
        Approval::ApproveAll
    }
}

/// Route Ctrl+C to `cancel`
pub fn install_cancel_handler(cancel: &CancelToken) {
    let cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        cancel.cancel();
        eprintln!();
    }) {
        tracing::warn!(error = %e, "could not set Ctrl+C handler");
    }
}

/// Spinner on stderr; a no-op when disabled
pub struct Spinner {
    bar: Option<ProgressBar>,
    message: String,
}

impl Spinner {
    pub fn start(message: &str, enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} [{elapsed}]")
            {
                pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
            }
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self {
            bar,
            message: message.to_string(),
        }
    }

    pub fn finish(self, success: bool) {
        let Some(pb) = self.bar else {
            return;
        };
        let elapsed = format!("{:.1}s", pb.elapsed().as_secs_f64());
        pb.finish_and_clear();
        if success {
            eprintln!("{} {} [{}]", "✓".green(), self.message.green(), elapsed);
        } else {
            eprintln!("{} {} [{}]", "✗".red(), self.message.red(), elapsed);
        }
    }
}
