//! CLI argument parsing with clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Twigs - find and remove local branches that are safe to delete
#[derive(Parser)]
#[command(name = "twigs")]
#[command(version = VERSION)]
#[command(about = "Find local branches and worktrees that are safe to delete")]
#[command(long_about = "Twigs classifies every local branch of a repository and removes only those it can prove are no longer needed.\n\nA branch is deletable when it is merged into the default branch, when its work reached the default branch through a squash or rebase merge, or when a newer iteration of the same work contains all of its commits. Every other branch is kept or flagged for review.")]
pub struct Cli {
    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output (a cleanup still shows its plan and outcomes)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Repository to operate on (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags that take precedence over `.twigs.toml`
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Default branch name (skips detection)
    #[arg(long, global = true, value_name = "BRANCH")]
    pub default_branch: Option<String>,

    /// Regex of branch names that are never touched
    #[arg(long, global = true, value_name = "REGEX")]
    pub protected: Option<String>,

    /// Concurrent repository queries
    #[arg(long, global = true, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-query timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify branches and show the cleanup plan without changing anything
    ///
    /// Prints each branch's category, lineage groups, and the exact commands a cleanup would run.
    #[command(long_about = "Classify branches and show the cleanup plan without changing anything.\n\nCategories:\n  SAFE_TO_DELETE      merged into the default branch\n  SQUASH_MERGED       work found on the default branch by squash/rebase evidence\n  SUPERSEDED          all commits contained in a newer branch of the same lineage\n  REMOTE_GONE         upstream deleted, no merge evidence (review)\n  UNPUSHED_WORK       commits not on the upstream (kept)\n  LOCAL_WORK          no upstream, unique commits (kept)\n  SYNCED_WITH_REMOTE  in sync with the upstream (kept)\n  NEEDS_REVIEW        facts or evidence could not be gathered (review)")]
    Analyze,

    /// Delete the branches the analysis proves safe, after approval
    ///
    /// Shows the plan, asks for approval, and runs the approved commands one at a time.
    #[command(long_about = "Delete the branches the analysis proves safe, after approval.\n\nOnly SAFE_TO_DELETE, SQUASH_MERGED and SUPERSEDED branches are planned. Linked worktrees holding a planned branch are removed first; a worktree with uncommitted changes blocks its branch unless --allow-dirty is given.\n\nWithout a terminal, nothing is deleted unless --yes is given.")]
    Clean {
        /// Approve the whole plan without prompting
        #[arg(short, long)]
        yes: bool,

        /// Show the plan and stop
        #[arg(long)]
        dry_run: bool,

        /// Force-remove linked worktrees with uncommitted changes
        #[arg(long)]
        allow_dirty: bool,
    },
}

/// Get the command args for use in the application
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "twigs",
            "clean",
            "--dry-run",
            "--json",
            "--default-branch",
            "trunk",
            "--workers",
            "2",
        ])
        .expect("parse");
        assert!(cli.json);
        assert_eq!(cli.overrides.default_branch.as_deref(), Some("trunk"));
        assert_eq!(cli.overrides.workers, Some(2));
        assert!(matches!(
            cli.command,
            Some(Commands::Clean { dry_run: true, yes: false, allow_dirty: false })
        ));
    }
}
