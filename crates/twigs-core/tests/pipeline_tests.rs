//! End-to-end tests against real git repositories

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use twigs_core::{
    AnalyzeOptions, Approval, ApprovalGate, CancelToken, Category, CleanupPlan, GitCli,
    ItemOutcome, LineageGroup, RemoteTrackingState, TwigsConfig, TwigsError, analyze, run_cleanup,
};

const BASE_TIME: i64 = 1_700_000_000;

fn git(dir: &Path, args: &[&str]) -> String {
    git_at(dir, args, BASE_TIME)
}

/// Run git with fixed author and committer dates
fn git_at(dir: &Path, args: &[&str], time: i64) -> String {
    let date = format!("{} +0000", time);
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_DATE", &date)
        .env("GIT_COMMITTER_DATE", &date)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Create a git repo on `main` with one commit
fn setup_test_git_repo() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let dir = temp.path();

    git(dir, &["init", "-b", "main"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);

    commit_file(dir, "README.md", "initial commit", 0);
    temp
}

/// Write a file and commit it `offset` seconds after the base time
fn commit_file(dir: &Path, file: &str, subject: &str, offset: i64) {
    fs::write(dir.join(file), format!("{}\n", subject)).expect("failed to write file");
    git(dir, &["add", file]);
    git_at(dir, &["commit", "-m", subject], BASE_TIME + offset);
}

fn open(dir: &Path) -> GitCli {
    GitCli::open(dir, Duration::from_secs(30)).expect("repository should open")
}

fn run_analysis(dir: &Path, allow_dirty: bool) -> twigs_core::Analysis {
    analyze(
        &open(dir),
        &TwigsConfig::default(),
        AnalyzeOptions { allow_dirty },
        &CancelToken::new(),
    )
    .expect("analysis should succeed")
}

fn category_of(analysis: &twigs_core::Analysis, branch: &str) -> Category {
    analysis
        .classification(branch)
        .unwrap_or_else(|| panic!("{} not classified", branch))
        .category
}

struct Approve(Approval);

impl ApprovalGate for Approve {
    fn review(&self, _plan: &CleanupPlan, _groups: &[LineageGroup]) -> Approval {
        self.0.clone()
    }
}

#[test]
fn test_merged_branch_is_safe_and_deleted() {
    let temp = setup_test_git_repo();
    let dir = temp.path();

    git(dir, &["checkout", "-b", "fix/typo"]);
    commit_file(dir, "typo.txt", "fix typo in readme", 10);
    git(dir, &["checkout", "main"]);
    git_at(dir, &["merge", "--no-ff", "-m", "Merge branch 'fix/typo'", "fix/typo"], BASE_TIME + 20);

    let analysis = run_analysis(dir, false);
    assert_eq!(analysis.snapshot.default_branch, "main");
    assert_eq!(category_of(&analysis, "fix/typo"), Category::SafeToDelete);
    assert_eq!(analysis.plan.items.len(), 1);
    assert_eq!(analysis.plan.items[0].command, "git branch -d fix/typo");
    assert!(!analysis.plan.items[0].requires_force);

    let report = run_cleanup(
        &open(dir),
        &analysis,
        &Approve(Approval::ApproveAll),
        &CancelToken::new(),
    )
    .expect("cleanup should run");
    assert_eq!(report.outcomes[0].outcome, ItemOutcome::Deleted);
    assert_eq!(report.remaining_branches, Some(vec!["main".to_string()]));
}

#[test]
fn test_squash_merged_branch_cites_evidence() {
    let temp = setup_test_git_repo();
    let dir = temp.path();

    git(dir, &["checkout", "-b", "feature/login"]);
    commit_file(dir, "login.txt", "add login", 10);
    git(dir, &["checkout", "main"]);
    git(dir, &["merge", "--squash", "feature/login"]);
    git_at(dir, &["commit", "-m", "Merge PR #42: add login"], BASE_TIME + 20);
    let squash_id = git(dir, &["rev-parse", "HEAD"]).trim().to_string();

    let analysis = run_analysis(dir, false);
    let classification = analysis.classification("feature/login").expect("classified");
    assert_eq!(classification.category, Category::SquashMerged);
    assert_eq!(classification.evidence_refs, vec![squash_id]);

    let item = &analysis.plan.items[0];
    assert_eq!(item.command, "git branch -D feature/login");
    assert!(item.requires_force);
}

#[test]
fn test_older_lineage_member_is_superseded() {
    let temp = setup_test_git_repo();
    let dir = temp.path();

    git(dir, &["checkout", "-b", "feature/api"]);
    commit_file(dir, "api.txt", "add api endpoint", 10);
    git(dir, &["checkout", "-b", "feature/api-v2"]);
    commit_file(dir, "pagination.txt", "add api pagination", 20);
    git(dir, &["checkout", "main"]);

    let analysis = run_analysis(dir, false);
    assert_eq!(category_of(&analysis, "feature/api"), Category::Superseded);
    assert_eq!(category_of(&analysis, "feature/api-v2"), Category::LocalWork);

    assert_eq!(analysis.groups.len(), 1);
    assert_eq!(analysis.groups[0].members, vec!["feature/api", "feature/api-v2"]);

    let commands: Vec<&str> = analysis.plan.items.iter().map(|i| i.command.as_str()).collect();
    assert_eq!(commands, vec!["git branch -D feature/api"]);
}

#[test]
fn test_remote_states_are_kept_or_reviewed() {
    let temp = setup_test_git_repo();
    let dir = temp.path();
    let remote = tempfile::tempdir().expect("failed to create remote dir");
    git(remote.path(), &["init", "--bare", "-b", "main"]);
    let remote_path = remote.path().to_str().expect("utf-8 path");
    git(dir, &["remote", "add", "origin", remote_path]);
    git(dir, &["push", "-u", "origin", "main"]);

    git(dir, &["checkout", "-b", "wip/new-feature"]);
    commit_file(dir, "wip0.txt", "start new feature", 10);
    git(dir, &["push", "-u", "origin", "wip/new-feature"]);
    for i in 1..=5 {
        commit_file(dir, &format!("wip{}.txt", i), &format!("new feature step {}", i), 10 + i);
    }

    git(dir, &["checkout", "-b", "old/topic", "main"]);
    commit_file(dir, "topic.txt", "abandoned experiment", 30);
    git(dir, &["push", "-u", "origin", "old/topic"]);
    git(dir, &["push", "origin", "--delete", "old/topic"]);

    git(dir, &["checkout", "-b", "synced", "main"]);
    commit_file(dir, "synced.txt", "shared work in progress", 40);
    git(dir, &["push", "-u", "origin", "synced"]);
    git(dir, &["checkout", "main"]);

    let analysis = run_analysis(dir, false);

    let wip = analysis.snapshot.branch("wip/new-feature").expect("wip fact");
    assert_eq!(wip.remote_tracking_state, RemoteTrackingState::RemotePresent);
    assert_eq!(wip.unpushed_commits.len(), 5);
    assert_eq!(category_of(&analysis, "wip/new-feature"), Category::UnpushedWork);
    assert_eq!(category_of(&analysis, "old/topic"), Category::RemoteGone);
    assert_eq!(category_of(&analysis, "synced"), Category::SyncedWithRemote);

    assert!(analysis.plan.items.is_empty());
    assert_eq!(analysis.plan.review.len(), 1);
    assert_eq!(analysis.plan.keep.len(), 2);
}

#[test]
fn test_dirty_worktree_blocks_deletion() {
    let temp = setup_test_git_repo();
    let dir = temp.path();
    let trees = tempfile::tempdir().expect("failed to create worktree dir");
    let wt = trees.path().join("wt-login");
    let wt_str = wt.to_str().expect("utf-8 path");

    git(dir, &["checkout", "-b", "feature/login"]);
    commit_file(dir, "login.txt", "add login", 10);
    git(dir, &["checkout", "main"]);
    git(dir, &["merge", "--squash", "feature/login"]);
    git_at(dir, &["commit", "-m", "Merge PR #42: add login"], BASE_TIME + 20);
    git(dir, &["worktree", "add", wt_str, "feature/login"]);
    fs::write(wt.join("scratch.txt"), "uncommitted\n").expect("failed to write");

    let analysis = run_analysis(dir, false);
    assert_eq!(category_of(&analysis, "feature/login"), Category::SquashMerged);
    assert!(analysis.plan.items.is_empty());
    assert_eq!(analysis.plan.blocked.len(), 1);
    assert!(analysis.plan.blocked[0].reason.contains("uncommitted changes"));

    let forced = run_analysis(dir, true);
    let commands: Vec<&str> = forced.plan.items.iter().map(|i| i.command.as_str()).collect();
    assert_eq!(commands.len(), 2);
    assert!(commands[0].starts_with("git worktree remove --force "));
    assert_eq!(commands[1], "git branch -D feature/login");
}

#[test]
fn test_clean_worktree_removed_before_branch() {
    let temp = setup_test_git_repo();
    let dir = temp.path();
    let trees = tempfile::tempdir().expect("failed to create worktree dir");
    let wt = trees.path().join("wt-typo");

    git(dir, &["checkout", "-b", "fix/typo"]);
    commit_file(dir, "typo.txt", "fix typo in readme", 10);
    git(dir, &["checkout", "main"]);
    git(dir, &["merge", "--ff-only", "fix/typo"]);
    git(dir, &["worktree", "add", wt.to_str().expect("utf-8 path"), "fix/typo"]);

    let analysis = run_analysis(dir, false);
    assert_eq!(analysis.plan.items.len(), 2);

    let report = run_cleanup(
        &open(dir),
        &analysis,
        &Approve(Approval::ApproveAll),
        &CancelToken::new(),
    )
    .expect("cleanup should run");
    assert_eq!(report.deleted_count(), 2);
    assert!(!wt.exists());
    assert_eq!(report.remaining_branches, Some(vec!["main".to_string()]));
}

#[test]
fn test_rejected_plan_changes_nothing() {
    let temp = setup_test_git_repo();
    let dir = temp.path();
    git(dir, &["branch", "fix/typo"]);

    let analysis = run_analysis(dir, false);
    let result = run_cleanup(
        &open(dir),
        &analysis,
        &Approve(Approval::Reject),
        &CancelToken::new(),
    );
    assert!(matches!(result, Err(TwigsError::PlanRejected)));
    assert!(git(dir, &["branch", "--list", "fix/typo"]).contains("fix/typo"));
}

#[test]
fn test_protected_branches_never_classified() {
    let temp = setup_test_git_repo();
    let dir = temp.path();
    git(dir, &["branch", "develop"]);
    git(dir, &["branch", "release/1.0"]);

    let analysis = run_analysis(dir, false);
    assert!(analysis.classifications.is_empty());
    assert!(analysis.plan.items.is_empty());
}

#[test]
fn test_repeated_analysis_is_identical() {
    let temp = setup_test_git_repo();
    let dir = temp.path();
    let trees = tempfile::tempdir().expect("failed to create worktree dir");
    let wt = trees.path().join("wt-login");

    git(dir, &["checkout", "-b", "feature/api"]);
    commit_file(dir, "api.txt", "add api endpoint", 10);
    git(dir, &["checkout", "-b", "feature/api-v2"]);
    commit_file(dir, "pagination.txt", "add api pagination", 20);
    git(dir, &["checkout", "main"]);

    git(dir, &["checkout", "-b", "feature/login"]);
    commit_file(dir, "login.txt", "add login", 30);
    git(dir, &["checkout", "main"]);
    git(dir, &["merge", "--squash", "feature/login"]);
    git_at(dir, &["commit", "-m", "Merge PR #42: add login"], BASE_TIME + 40);
    git(dir, &["worktree", "add", wt.to_str().expect("utf-8 path"), "feature/login"]);

    for name in ["fix/a", "fix/b", "fix/c", "spike"] {
        git(dir, &["branch", name]);
    }

    let config = TwigsConfig {
        workers: 4,
        ..TwigsConfig::default()
    };
    let run = || {
        analyze(
            &open(dir),
            &config,
            AnalyzeOptions::default(),
            &CancelToken::new(),
        )
        .expect("analysis should succeed")
    };

    let first = run();
    let second = run();
    assert_eq!(first.evidence, second.evidence);
    assert_eq!(first.groups, second.groups);
    assert_eq!(first.classifications, second.classifications);
    assert_eq!(first.plan, second.plan);

    assert_eq!(category_of(&first, "feature/api"), Category::Superseded);
    assert_eq!(category_of(&first, "feature/login"), Category::SquashMerged);
    let commands: Vec<&str> = first.plan.items.iter().map(|i| i.command.as_str()).collect();
    assert!(commands.iter().any(|c| c.starts_with("git worktree remove ")));
}
