//! Git CLI implementation of [`RepoBackend`]
//!
//! Every query is a `git -C <root> ...` subprocess bounded by a timeout.
//! Output is parsed from machine-oriented formats (`for-each-ref` with
//! separator bytes, `worktree list --porcelain`), never from porcelain
//! meant for humans.

use crate::backend::{BranchRef, RepoBackend, WorktreeEntry};
use crate::error::{Result, TwigsError};
use crate::types::CommitSummary;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

const LOG_FORMAT: &str = "--format=%H%x1f%at%x1f%s%x1f%b%x1e";
const BRANCH_FORMAT: &str = "--format=%(refname:short)%1f%(objectname)%1f%(authordate:unix)%1f%(upstream:short)%1f%(upstream:track)";

/// Git CLI wrapper bound to one repository
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    timeout: Duration,
}

impl GitCli {
    /// Open the repository containing `path`
    ///
    /// Fails with `RepositoryUnavailable` when git is missing, the path is
    /// not inside a work tree, or the repository cannot be read.
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        let output = git_command(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .map_err(|e| TwigsError::RepositoryUnavailable {
                reason: if e.kind() == std::io::ErrorKind::NotFound {
                    "git executable not found".to_string()
                } else {
                    format!("failed to run git: {}", e)
                },
            })?;

        if !output.status.success() {
            return Err(TwigsError::RepositoryUnavailable {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if root.is_empty() {
            return Err(TwigsError::RepositoryUnavailable {
                reason: format!("{} has no working tree", path.display()),
            });
        }

        Ok(Self {
            repo_root: PathBuf::from(root),
            timeout,
        })
    }

    /// Same repository, different per-query time limit
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Run git in `dir` and return its output regardless of exit status
    fn run_in(&self, dir: &Path, args: &[&str]) -> Result<Output> {
        let command_line = format!("git {}", args.join(" "));
        tracing::debug!(command = %command_line, dir = %dir.display(), "running git");
        let mut cmd = git_command(dir);
        cmd.args(args);
        execute_with_timeout(&mut cmd, &command_line, self.timeout)
    }

    /// Run a read query in the repository root; non-zero exit is an error
    fn query(&self, args: &[&str]) -> Result<String> {
        let output = self.run_in(&self.repo_root, args)?;
        if !output.status.success() {
            return Err(TwigsError::QueryFailed {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn mutate(&self, args: &[&str]) -> Result<()> {
        let output = self.run_in(&self.repo_root, args)?;
        if !output.status.success() {
            return Err(TwigsError::MutationFailed {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl RepoBackend for GitCli {
    fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn list_branches(&self) -> Result<Vec<BranchRef>> {
        let stdout = self.query(&["for-each-ref", BRANCH_FORMAT, "refs/heads"])?;
        Ok(parse_branches(&stdout))
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        let refname = format!("refs/heads/{}", name);
        let output = self.run_in(
            &self.repo_root,
            &["rev-parse", "--verify", "--quiet", &refname],
        )?;
        Ok(output.status.success())
    }

    fn remote_head(&self, remote: &str) -> Result<Option<String>> {
        let refname = format!("refs/remotes/{}/HEAD", remote);
        let output = self.run_in(&self.repo_root, &["symbolic-ref", "--quiet", &refname])?;
        if !output.status.success() {
            return Ok(None);
        }
        let target = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let prefix = format!("refs/remotes/{}/", remote);
        Ok(target.strip_prefix(&prefix).map(str::to_string))
    }

    fn log(
        &self,
        base: Option<&str>,
        tip: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CommitSummary>> {
        let range = match base {
            Some(base) => format!("{}..{}", base, tip),
            None => tip.to_string(),
        };
        let mut args = vec!["log", "--no-color", LOG_FORMAT];
        let max_count;
        if let Some(limit) = limit {
            max_count = format!("--max-count={}", limit);
            args.push(&max_count);
        }
        args.push(&range);
        args.push("--");
        let stdout = self.query(&args)?;
        Ok(parse_log(&stdout))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let args = ["merge-base", "--is-ancestor", ancestor, descendant];
        let output = self.run_in(&self.repo_root, &args)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(TwigsError::QueryFailed {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn list_worktrees(&self) -> Result<Vec<WorktreeEntry>> {
        let stdout = self.query(&["worktree", "list", "--porcelain"])?;
        let mut entries = parse_worktrees(&stdout);
        for entry in &mut entries {
            if !entry.path.exists() {
                entry.is_prunable = true;
            }
        }
        Ok(entries)
    }

    fn is_dirty(&self, worktree: &Path) -> Result<bool> {
        let output = self.run_in(worktree, &["status", "--porcelain"])?;
        if !output.status.success() {
            return Err(TwigsError::QueryFailed {
                command: format!("git -C {} status --porcelain", worktree.display()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(!output.stdout.iter().all(u8::is_ascii_whitespace))
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.mutate(&["branch", flag, name])
    }

    fn remove_worktree(&self, path: &Path, force: bool) -> Result<()> {
        let path_str = path.to_str().ok_or_else(|| TwigsError::MutationFailed {
            command: "git worktree remove".to_string(),
            stderr: format!("worktree path is not valid UTF-8: {}", path.display()),
        })?;
        if force {
            self.mutate(&["worktree", "remove", "--force", path_str])
        } else {
            self.mutate(&["worktree", "remove", path_str])
        }
    }
}

fn git_command(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(dir)
        .env("LC_ALL", "C")
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_OPTIONAL_LOCKS", "0");
    cmd
}

/// Execute a command, killing it once `timeout` elapses
///
/// Pipes are drained on helper threads so a large output cannot block the
/// child while we poll for its exit.
fn execute_with_timeout(cmd: &mut Command, command_line: &str, timeout: Duration) -> Result<Output> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| TwigsError::QueryFailed {
        command: command_line.to_string(),
        stderr: format!("failed to spawn git: {}", e),
    })?;

    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let start = Instant::now();
    let mut poll_interval = Duration::from_millis(1);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = stdout_reader.join().unwrap_or_default();
                let stderr = stderr_reader.join().unwrap_or_default();
                return Ok(Output {
                    status,
                    stdout,
                    stderr,
                });
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!(command = %command_line, "git query timed out");
                    return Err(TwigsError::QueryTimeout {
                        command: command_line.to_string(),
                        secs: timeout.as_secs(),
                    });
                }
                thread::sleep(poll_interval);
                poll_interval = (poll_interval * 2).min(Duration::from_millis(50));
            }
            Err(e) => {
                return Err(TwigsError::QueryFailed {
                    command: command_line.to_string(),
                    stderr: format!("failed to wait for git: {}", e),
                });
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Parse `git log` output produced with [`LOG_FORMAT`]
pub(crate) fn parse_log(stdout: &str) -> Vec<CommitSummary> {
    stdout
        .split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches(['\n', '\r']);
            if record.trim().is_empty() {
                return None;
            }
            let mut fields = record.splitn(4, FIELD_SEP);
            let id = fields.next()?.trim().to_string();
            let author_time = fields.next()?.trim().parse().unwrap_or(0);
            let subject = fields.next()?.trim().to_string();
            let body = fields.next().unwrap_or("").trim().to_string();
            Some(CommitSummary {
                id,
                subject,
                body,
                author_time,
            })
        })
        .collect()
}

/// Parse `git for-each-ref` output produced with [`BRANCH_FORMAT`]
pub(crate) fn parse_branches(stdout: &str) -> Vec<BranchRef> {
    stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(FIELD_SEP).collect();
            if fields.len() < 5 || fields[0].is_empty() {
                return None;
            }
            let upstream = Some(fields[3].trim())
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            Some(BranchRef {
                name: fields[0].to_string(),
                tip: fields[1].to_string(),
                tip_time: fields[2].trim().parse().unwrap_or(0),
                upstream_gone: upstream.is_some() && fields[4].contains("gone"),
                upstream,
            })
        })
        .collect()
}

/// Parse `git worktree list --porcelain`; the first entry is the primary
pub(crate) fn parse_worktrees(stdout: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;

    for line in stdout.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            entries.extend(current.take());
            current = Some(WorktreeEntry {
                path: PathBuf::from(path),
                branch: None,
                is_primary: entries.is_empty(),
                is_prunable: false,
            });
        } else if let Some(entry) = current.as_mut() {
            if let Some(branch) = line.strip_prefix("branch ") {
                entry.branch = Some(
                    branch
                        .strip_prefix("refs/heads/")
                        .unwrap_or(branch)
                        .to_string(),
                );
            } else if line == "prunable" || line.starts_with("prunable ") {
                entry.is_prunable = true;
            }
        }
    }
    entries.extend(current);
    entries
}
