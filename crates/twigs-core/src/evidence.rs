//! Merge-evidence analyzer
//!
//! Squash and rebase merges rewrite history, so an incorporated branch is
//! no longer an ancestor of the default branch. This module searches the
//! default branch's log for commits that cite the branch: its name as a
//! merge source, a pull-request number it carries, or its own commit
//! subjects. Every hit is recorded; absence of hits is never read as
//! incorporation.

use crate::pool::map_bounded;
use crate::types::{BranchFact, CommitSummary, DefaultLog, RepoSnapshot};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static MERGE_PR_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Merge pull request #\d+ from (\S+)").expect("valid merge-pr regex")
});

static MERGE_BRANCH_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Merge (?:remote-tracking )?branch '([^']+)'").expect("valid merge-branch regex")
});

static TRAILING_PR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(#(\d+)\)\s*$").expect("valid trailing-pr regex"));

static MERGE_PR_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Merge pull request #(\d+)\b").expect("valid merge-pr regex"));

static BRANCH_PR_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|/)(?:pr|mr)[-_/]?(\d+)(?:$|[-_/])").expect("valid branch-pr regex")
});

/// Which matcher produced an evidence reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    /// Default-branch subject names the branch as a merge source
    BranchName,
    /// Default-branch commit is pull request `#N`, and the branch is too
    PullRequestNumber,
    /// Default-branch subject contains a branch commit subject
    Subject,
    /// A default-branch body line repeats a branch commit subject
    Body,
}

/// One default-branch commit cited as evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    /// Default-branch commit id
    pub commit: String,
    pub subject: String,
    pub matcher: Matcher,
    /// Branch commit this reference accounts for, when per-commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts_for: Option<String>,
}

/// Non-empty list of evidence references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EvidenceRef>", into = "Vec<EvidenceRef>")]
pub struct Proof(Vec<EvidenceRef>);

impl Proof {
    /// `None` for an empty list: an assertion without references is not proof
    pub fn new(refs: Vec<EvidenceRef>) -> Option<Self> {
        if refs.is_empty() { None } else { Some(Self(refs)) }
    }

    pub fn refs(&self) -> &[EvidenceRef] {
        &self.0
    }

    /// Distinct cited default-branch commit ids, in citation order
    pub fn commit_ids(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.0
            .iter()
            .filter(|r| seen.insert(r.commit.clone()))
            .map(|r| r.commit.clone())
            .collect()
    }
}

impl TryFrom<Vec<EvidenceRef>> for Proof {
    type Error = String;

    fn try_from(refs: Vec<EvidenceRef>) -> Result<Self, Self::Error> {
        Proof::new(refs).ok_or_else(|| "evidence must cite at least one commit".to_string())
    }
}

impl From<Proof> for Vec<EvidenceRef> {
    fn from(proof: Proof) -> Self {
        proof.0
    }
}

/// Outcome of the evidence search for one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeEvidence {
    /// The branch's content reached the default branch; cites the commits
    Incorporated { proof: Proof },
    /// Nothing conclusive found; the branch is left for manual review
    NotFound,
    /// The default-branch log could not be read
    Unavailable { reason: String },
}

impl MergeEvidence {
    pub fn squash_incorporated(&self) -> bool {
        matches!(self, MergeEvidence::Incorporated { .. })
    }

    pub fn evidence_refs(&self) -> &[EvidenceRef] {
        match self {
            MergeEvidence::Incorporated { proof } => proof.refs(),
            _ => &[],
        }
    }
}

/// Searches one default-branch log on behalf of many branches
pub struct EvidenceAnalyzer<'a> {
    default_branch: &'a str,
    log: &'a [CommitSummary],
    min_subject_len: usize,
}

impl<'a> EvidenceAnalyzer<'a> {
    pub fn new(default_branch: &'a str, log: &'a [CommitSummary], min_subject_len: usize) -> Self {
        Self {
            default_branch,
            log,
            min_subject_len,
        }
    }

    /// Evidence for a branch with unique commits that is not an ancestor
    ///
    /// Incorporation is asserted when the default branch names this branch
    /// (or one of its pull-request numbers) in a commit at least as new as
    /// the branch's newest work, or when every substantive branch commit is
    /// matched by subject. Anything less is `NotFound`.
    pub fn analyze(&self, branch: &BranchFact) -> MergeEvidence {
        if branch.merged_into_default || branch.unique_commits.is_empty() {
            return MergeEvidence::NotFound;
        }

        let newest_work = branch
            .unique_commits
            .iter()
            .map(|c| c.author_time)
            .max()
            .unwrap_or(branch.tip_time);

        let branch_level = self.branch_level_refs(branch, newest_work);
        if let Some(proof) = Proof::new(branch_level) {
            return MergeEvidence::Incorporated { proof };
        }

        let substantive: Vec<&CommitSummary> = branch
            .unique_commits
            .iter()
            .filter(|c| !self.is_default_sync_merge(&c.subject))
            .collect();
        if substantive.is_empty() {
            return MergeEvidence::NotFound;
        }

        let mut refs = Vec::new();
        let mut unmatched = 0usize;
        for commit in &substantive {
            let hits = self.subject_refs(commit);
            if hits.is_empty() {
                unmatched += 1;
            }
            refs.extend(hits);
        }

        if unmatched > 0 {
            if !refs.is_empty() {
                tracing::debug!(
                    branch = %branch.name,
                    matched = substantive.len() - unmatched,
                    unmatched,
                    "partial subject evidence; not asserting incorporation"
                );
            }
            return MergeEvidence::NotFound;
        }

        match Proof::new(refs) {
            Some(proof) => MergeEvidence::Incorporated { proof },
            None => MergeEvidence::NotFound,
        }
    }

    /// Hits that account for the whole branch at once
    fn branch_level_refs(&self, branch: &BranchFact, newest_work: i64) -> Vec<EvidenceRef> {
        let pr_numbers = branch_pr_numbers(branch);

        let mut refs = Vec::new();
        for candidate in self.log.iter().filter(|c| c.author_time >= newest_work) {
            if names_merge_source(&candidate.subject, &branch.name) {
                refs.push(EvidenceRef {
                    commit: candidate.id.clone(),
                    subject: candidate.subject.clone(),
                    matcher: Matcher::BranchName,
                    accounts_for: None,
                });
            } else if pr_number(&candidate.subject).is_some_and(|n| pr_numbers.contains(n)) {
                refs.push(EvidenceRef {
                    commit: candidate.id.clone(),
                    subject: candidate.subject.clone(),
                    matcher: Matcher::PullRequestNumber,
                    accounts_for: None,
                });
            }
        }
        refs
    }

    /// Default-branch commits whose subject or body repeats `commit`'s subject
    ///
    /// Only candidates authored no earlier than `commit` count: a squash or
    /// rebase carries the author time of the work or later.
    fn subject_refs(&self, commit: &CommitSummary) -> Vec<EvidenceRef> {
        let needle = normalize_subject(&commit.subject);
        if needle.chars().count() < self.min_subject_len {
            return Vec::new();
        }

        let mut refs = Vec::new();
        for candidate in self.log.iter().filter(|c| c.author_time >= commit.author_time) {
            let matcher = if contains_phrase(&normalize_subject(&candidate.subject), &needle) {
                Some(Matcher::Subject)
            } else if candidate
                .body
                .lines()
                .any(|line| normalize_subject(line) == needle)
            {
                Some(Matcher::Body)
            } else {
                None
            };
            if let Some(matcher) = matcher {
                refs.push(EvidenceRef {
                    commit: candidate.id.clone(),
                    subject: candidate.subject.clone(),
                    matcher,
                    accounts_for: Some(commit.id.clone()),
                });
            }
        }
        refs
    }

    /// A merge of the default branch into the topic carries no work of its own
    fn is_default_sync_merge(&self, subject: &str) -> bool {
        MERGE_BRANCH_SOURCE
            .captures(subject)
            .and_then(|cap| cap.get(1))
            .is_some_and(|source| {
                let source = source.as_str();
                source == self.default_branch
                    || source.ends_with(&format!("/{}", self.default_branch))
            })
    }
}

/// Evidence for every eligible branch of a snapshot, keyed by branch name
///
/// Eligible: complete facts, unique commits, not an ancestor of the default
/// branch. Branches are analysed concurrently over the shared log.
pub fn analyze_snapshot(
    snapshot: &RepoSnapshot,
    min_subject_len: usize,
    workers: usize,
) -> BTreeMap<String, MergeEvidence> {
    let eligible: Vec<&BranchFact> = snapshot
        .branches
        .iter()
        .filter(|b| !b.is_degraded() && !b.merged_into_default && !b.unique_commits.is_empty())
        .collect();

    let commits = match &snapshot.default_log {
        DefaultLog::Available { commits } => commits.as_slice(),
        DefaultLog::Unavailable { reason } => {
            return eligible
                .into_iter()
                .map(|b| {
                    (
                        b.name.clone(),
                        MergeEvidence::Unavailable {
                            reason: reason.clone(),
                        },
                    )
                })
                .collect();
        }
    };

    let analyzer = EvidenceAnalyzer::new(&snapshot.default_branch, commits, min_subject_len);
    let results = map_bounded(&eligible, workers, |branch| {
        (branch.name.clone(), analyzer.analyze(branch))
    });

    for (name, evidence) in &results {
        if evidence.squash_incorporated() {
            tracing::debug!(branch = %name, refs = evidence.evidence_refs().len(), "merge evidence found");
        }
    }
    results.into_iter().collect()
}

/// Lowercase, collapse whitespace, drop list bullets and a trailing `(#N)`
pub fn normalize_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    let trimmed = trimmed
        .strip_prefix("* ")
        .or_else(|| trimmed.strip_prefix("- "))
        .unwrap_or(trimmed);
    let trimmed = TRAILING_PR.replace(trimmed, "");
    trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Pull-request number a subject identifies itself as (`... (#N)` or
/// `Merge pull request #N ...`)
fn pr_number(subject: &str) -> Option<&str> {
    TRAILING_PR
        .captures(subject)
        .or_else(|| MERGE_PR_NUMBER.captures(subject))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Pull-request numbers the branch identifies with: its name (`pr/77`,
/// `mr-12-fix`) or its own commits already carrying a `(#N)` suffix
fn branch_pr_numbers(branch: &BranchFact) -> BTreeSet<&str> {
    BRANCH_PR_NUMBER
        .captures_iter(&branch.name)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .chain(
            branch
                .unique_commits
                .iter()
                .filter_map(|c| TRAILING_PR.captures(&c.subject))
                .filter_map(|cap| cap.get(1))
                .map(|m| m.as_str()),
        )
        .collect()
}

/// `needle` occurs in `haystack` on word boundaries
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Subject is a merge commit whose source is `branch`
fn names_merge_source(subject: &str, branch: &str) -> bool {
    let source = MERGE_PR_SOURCE
        .captures(subject)
        .or_else(|| MERGE_BRANCH_SOURCE.captures(subject))
        .and_then(|cap| cap.get(1));
    source.is_some_and(|m| {
        let source = m.as_str();
        source == branch || source.ends_with(&format!("/{}", branch))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{branch, commit};

    fn with_body(mut c: CommitSummary, body: &str) -> CommitSummary {
        c.body = body.to_string();
        c
    }

    #[test]
    fn test_pr_merge_subject_matches_branch_commit() {
        let log = vec![
            commit("m2", "Merge PR #42: add login", 200),
            commit("m1", "initial commit", 10),
        ];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let login = branch("feature/login", vec![commit("c1", "add login", 100)]);

        let evidence = analyzer.analyze(&login);
        assert!(evidence.squash_incorporated());
        let refs = evidence.evidence_refs();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].commit, "m2");
        assert_eq!(refs[0].matcher, Matcher::Subject);
        assert_eq!(refs[0].accounts_for.as_deref(), Some("c1"));
    }

    #[test]
    fn test_no_match_is_not_found() {
        let log = vec![commit("m1", "refactor parser", 200)];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch("feature/login", vec![commit("c1", "add login", 100)]);
        assert_eq!(analyzer.analyze(&fact), MergeEvidence::NotFound);
    }

    #[test]
    fn test_partial_subject_match_is_not_found() {
        let log = vec![commit("m1", "add login page (#7)", 300)];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch(
            "feature/login",
            vec![
                commit("c2", "add logout button", 200),
                commit("c1", "add login page", 100),
            ],
        );
        assert_eq!(analyzer.analyze(&fact), MergeEvidence::NotFound);
    }

    #[test]
    fn test_older_default_commit_is_not_evidence_for_newer_work() {
        let log = vec![commit("m1", "update readme links", 1_000)];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch(
            "docs/readme",
            vec![commit("c1", "update readme links", 90_000_000)],
        );
        assert_eq!(analyzer.analyze(&fact), MergeEvidence::NotFound);
    }

    #[test]
    fn test_older_body_line_is_not_evidence_for_newer_work() {
        let log = vec![with_body(
            commit("m1", "Docs sweep (#4)", 1_000),
            "* update readme links\n",
        )];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch(
            "docs/readme",
            vec![commit("c1", "update readme links", 90_000_000)],
        );
        assert_eq!(analyzer.analyze(&fact), MergeEvidence::NotFound);
    }

    #[test]
    fn test_squash_body_lists_every_commit() {
        let log = vec![with_body(
            commit("m1", "Login feature (#9)", 300),
            "* add login page\n* add logout button\n",
        )];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch(
            "feature/login",
            vec![
                commit("c2", "add logout button", 200),
                commit("c1", "add login page", 100),
            ],
        );
        let evidence = analyzer.analyze(&fact);
        assert!(evidence.squash_incorporated());
        assert!(evidence.evidence_refs().iter().all(|r| r.matcher == Matcher::Body));
        assert_eq!(evidence.evidence_refs().len(), 2);
    }

    #[test]
    fn test_merge_source_names_branch() {
        let log = vec![commit(
            "m1",
            "Merge pull request #12 from alice/feature/search",
            500,
        )];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch("feature/search", vec![commit("c1", "wip", 400)]);
        let evidence = analyzer.analyze(&fact);
        assert!(evidence.squash_incorporated());
        assert_eq!(evidence.evidence_refs()[0].matcher, Matcher::BranchName);
    }

    #[test]
    fn test_work_after_merge_is_not_covered_by_branch_name() {
        let log = vec![commit(
            "m1",
            "Merge pull request #12 from alice/feature/search",
            500,
        )];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch("feature/search", vec![commit("c9", "more wip", 900)]);
        assert_eq!(analyzer.analyze(&fact), MergeEvidence::NotFound);
    }

    #[test]
    fn test_pull_request_number_from_branch_name() {
        let log = vec![commit("m1", "Payments rework (#77)", 500)];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch("pr/77", vec![commit("c1", "wip", 400)]);
        let evidence = analyzer.analyze(&fact);
        assert!(evidence.squash_incorporated());
        assert_eq!(
            evidence.evidence_refs()[0].matcher,
            Matcher::PullRequestNumber
        );
    }

    #[test]
    fn test_issue_mentions_are_not_pull_request_identity() {
        let log = vec![commit("m1", "Crash fix (#12)", 500)];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch(
            "feature/payments",
            vec![commit("c1", "follow-up to #12", 400)],
        );
        assert_eq!(analyzer.analyze(&fact), MergeEvidence::NotFound);
    }

    #[test]
    fn test_branch_pr_numbers() {
        let fact = branch("mr-12-fix", vec![commit("c1", "tidy (#31)", 1)]);
        let numbers = branch_pr_numbers(&fact);
        assert!(numbers.contains("12"));
        assert!(numbers.contains("31"));
        assert!(branch_pr_numbers(&branch("feature/api-v2", vec![])).is_empty());
        assert!(branch_pr_numbers(&branch("sprint42", vec![])).is_empty());
    }

    #[test]
    fn test_short_subjects_are_never_evidence() {
        let log = vec![commit("m1", "fix", 500)];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch("fix/x", vec![commit("c1", "fix", 100)]);
        assert_eq!(analyzer.analyze(&fact), MergeEvidence::NotFound);
    }

    #[test]
    fn test_default_sync_merges_are_ignored() {
        let log = vec![commit("m1", "add login (#3)", 500)];
        let analyzer = EvidenceAnalyzer::new("main", &log, 8);
        let fact = branch(
            "feature/login",
            vec![
                commit("c2", "Merge branch 'main' into feature/login", 300),
                commit("c1", "add login", 100),
            ],
        );
        assert!(analyzer.analyze(&fact).squash_incorporated());
    }

    #[test]
    fn test_word_boundaries() {
        assert!(contains_phrase("merge pr #42: add login", "add login"));
        assert!(!contains_phrase("add logins everywhere", "add login"));
        assert!(!contains_phrase("readd login", "add login"));
    }

    #[test]
    fn test_normalize_subject() {
        assert_eq!(normalize_subject("  Add   Login (#42) "), "add login");
        assert_eq!(normalize_subject("* add login"), "add login");
        assert_eq!(normalize_subject("- Fix   typo"), "fix typo");
    }

    #[test]
    fn test_proof_rejects_empty_refs() {
        assert!(Proof::new(vec![]).is_none());
        let parsed: Result<Proof, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unavailable_log_marks_eligible_branches() {
        let snapshot = RepoSnapshot {
            repo_root: "/repo".into(),
            default_branch: "main".to_string(),
            branches: vec![
                branch("feature/login", vec![commit("c1", "add login", 100)]),
                branch("fix/typo", vec![]),
            ],
            worktrees: vec![],
            default_log: DefaultLog::Unavailable {
                reason: "timed out".to_string(),
            },
        };
        let evidence = analyze_snapshot(&snapshot, 8, 2);
        assert_eq!(evidence.len(), 1);
        assert!(matches!(
            evidence.get("feature/login"),
            Some(MergeEvidence::Unavailable { .. })
        ));
    }
}
