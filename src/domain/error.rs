//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent caller-input violations of the hierarchy rules.
/// None of them are transient; they propagate to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("sponsor not found: {0}")]
    SponsorNotFound(String),

    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("hierarchy already has a root: {0}")]
    RootAlreadyExists(String),

    #[error("sponsor {sponsor} already has {capacity} children")]
    CapacityExceeded { sponsor: String, capacity: usize },

    #[error("moving {member} under {sponsor} would create a cycle")]
    CycleDetected { member: String, sponsor: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
