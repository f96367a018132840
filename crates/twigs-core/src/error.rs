//! Error types for twigs operations

use thiserror::Error;

/// Core error type for twigs operations
///
/// Per-item execution failures are not represented here; they are recorded
/// as [`crate::execute::ItemOutcome::Failed`] so one failure never aborts
/// the remaining items.
#[derive(Error, Debug)]
pub enum TwigsError {
    // === Repository errors (E101-E102) ===
    /// E101: The backend could not be queried at all
    #[error("E101: repository unavailable: {reason}")]
    RepositoryUnavailable { reason: String },

    /// E102: No default branch could be determined
    #[error("E102: could not determine the default branch (set `default_branch` in .twigs.toml)")]
    DefaultBranchNotFound,

    // === Query errors (E103-E104) ===
    /// E103: A single backend query exceeded its time limit
    #[error("E103: query timed out after {secs} seconds: {command}")]
    QueryTimeout { command: String, secs: u64 },

    /// E104: A single backend query exited unsuccessfully
    #[error("E104: query failed: {command}: {stderr}")]
    QueryFailed { command: String, stderr: String },

    /// E111: A mutation verb exited unsuccessfully
    #[error("E111: command failed: {command}: {stderr}")]
    MutationFailed { command: String, stderr: String },

    // === Configuration errors (E105-E107) ===
    /// E105: Protected-branch pattern is not a valid regex
    #[error("E105: invalid protected-branch pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// E106: Configuration error
    #[error("E106: configuration error: {0}")]
    Config(String),

    /// E107: Configuration file could not be parsed
    #[error("E107: invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    // === Approval errors (E108-E109) ===
    /// E108: The run was cancelled before execution started
    #[error("E108: aborted by user before any change was made")]
    UserAborted,

    /// E109: The approval gate rejected the plan
    #[error("E109: cleanup plan rejected")]
    PlanRejected,

    // === IO errors ===
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TwigsError {
    /// Get the error code (e.g., "E101")
    pub fn code(&self) -> &'static str {
        match self {
            TwigsError::RepositoryUnavailable { .. } => "E101",
            TwigsError::DefaultBranchNotFound => "E102",
            TwigsError::QueryTimeout { .. } => "E103",
            TwigsError::QueryFailed { .. } => "E104",
            TwigsError::InvalidPattern { .. } => "E105",
            TwigsError::Config(_) => "E106",
            TwigsError::Toml(_) => "E107",
            TwigsError::UserAborted => "E108",
            TwigsError::PlanRejected => "E109",
            TwigsError::Io(_) => "E110",
            TwigsError::MutationFailed { .. } => "E111",
        }
    }

    /// Get the exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            TwigsError::RepositoryUnavailable { .. } | TwigsError::DefaultBranchNotFound => 2,

            TwigsError::QueryTimeout { .. }
            | TwigsError::QueryFailed { .. }
            | TwigsError::MutationFailed { .. } => 3,

            TwigsError::InvalidPattern { .. } | TwigsError::Config(_) | TwigsError::Toml(_) => 4,

            TwigsError::UserAborted | TwigsError::PlanRejected => 5,

            TwigsError::Io(_) => 2,
        }
    }

    /// Whether this error only affects the facts of a single branch
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TwigsError::QueryTimeout { .. } | TwigsError::QueryFailed { .. }
        )
    }
}

/// Result alias used throughout the core crate
pub type Result<T> = std::result::Result<T, TwigsError>;
