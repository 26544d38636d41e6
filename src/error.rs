use thiserror::Error;

/// Typed failures surfaced by every fleet operation.
///
/// All variants except `StorageUnavailable` are recoverable business-rule
/// violations: the caller renders them and carries on. A missing store file
/// is a valid empty state and never produces an error at all.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid request data: {0}")]
    ValidationError(String),

    /// Reserved for guarded concurrent record writes.
    #[error("concurrent modification: {0}")]
    ConcurrencyConflict(String),

    #[error("record store unavailable: {0}")]
    StorageUnavailable(String),
}

impl FleetError {
    pub fn not_found(what: impl Into<String>) -> Self {
        FleetError::NotFound(what.into())
    }

    pub fn invalid_state(why: impl Into<String>) -> Self {
        FleetError::InvalidState(why.into())
    }
}
