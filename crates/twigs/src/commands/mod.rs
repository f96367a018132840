//! CLI command implementations

pub mod analyze;
pub mod clean;

pub use analyze::run_analyze;
pub use clean::run_clean;

use std::path::PathBuf;

use anyhow::Context as _;
use twigs_core::{Config, GitCli, RepoBackend, TwigsConfig, TwigsError};

use crate::cli::ConfigOverrides;
use crate::output::{JsonIssue, JsonResponse};

/// Settings shared by every command
pub struct GlobalArgs {
    pub repo: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

/// Open the repository and load its configuration, flags taking precedence
fn open_repository(args: &GlobalArgs) -> Result<(GitCli, TwigsConfig), TwigsError> {
    let start = match &args.repo {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let git = GitCli::open(&start, TwigsConfig::default().query_timeout())?;
    let mut config = Config::load(git.repo_root())?.twigs;
    apply_overrides(&mut config, &args.overrides);
    config.protected_regex()?;

    let timeout = config.query_timeout();
    Ok((git.with_timeout(timeout), config))
}

fn apply_overrides(config: &mut TwigsConfig, overrides: &ConfigOverrides) {
    if let Some(branch) = &overrides.default_branch {
        config.default_branch = Some(branch.clone());
    }
    if let Some(pattern) = &overrides.protected {
        config.protected_pattern = pattern.clone();
    }
    if let Some(workers) = overrides.workers {
        config.workers = workers;
    }
    if let Some(secs) = overrides.timeout {
        config.query_timeout_secs = secs;
    }
}

/// Report a fatal error and return its exit code
fn report_error<T: serde::Serialize>(
    command: &str,
    err: &TwigsError,
    empty: T,
    json_output: bool,
) -> Result<i32, String> {
    if json_output {
        JsonResponse::error(command, empty, vec![JsonIssue::from(err)])
            .print()
            .context("failed to write JSON output")
            .map_err(|e| format!("{:#}", e))?;
    } else {
        eprintln!("error: {}", err);
    }
    Ok(err.exit_code())
}
