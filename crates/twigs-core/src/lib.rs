//! twigs-core: branch classification and safe cleanup
//!
//! This crate reads a repository's local branches and worktrees, decides
//! which branches are provably safe to delete (merged, squash-merged, or
//! superseded by a newer iteration), and executes an approved cleanup plan.

/// Error types and exit codes
pub mod error;

/// Configuration handling
pub mod config;

/// Facts and categories
pub mod types;

/// Version-control query interface
pub mod backend;

/// `git` command-line backend
pub mod git;

pub mod cancel;

/// Dirty-state guard
pub mod guard;

/// Repository state reader
pub mod reader;

/// Squash and rebase merge evidence
pub mod evidence;

/// Lineage grouping and supersession
pub mod lineage;

/// Branch classifier
pub mod classify;

/// Cleanup plan builder
pub mod plan;

/// Approval gate
pub mod approval;

/// Execution engine
pub mod execute;

/// Pipeline orchestration
pub mod engine;

mod pool;

// Re-exports for convenience
pub use approval::{Approval, ApprovalGate, ApprovedPlan};
pub use backend::RepoBackend;
pub use cancel::CancelToken;
pub use classify::{Classification, classify};
pub use config::{Config, TwigsConfig};
pub use engine::{AnalyzeOptions, Analysis, analyze, run_cleanup};
pub use error::TwigsError;
pub use evidence::MergeEvidence;
pub use execute::{ExecutionReport, ItemOutcome};
pub use git::GitCli;
pub use lineage::LineageGroup;
pub use plan::{CleanupPlan, PlanItem, Target};
pub use types::{BranchFact, Category, RemoteTrackingState, RepoSnapshot, WorktreeFact};
