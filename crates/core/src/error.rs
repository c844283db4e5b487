//! Error taxonomy for the coordination core.
//!
//! Precondition failures (`RecordNotFound`, `MissingRecipient`) are raised
//! before any mutation. Per-document gateway failures during dispatch are
//! deliberately absent from this enum: the dispatch loop absorbs them and
//! reports them through the per-item outcome list instead.

/// Errors surfaced by coordination operations.
#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    /// The referenced record id has no backing record.
    #[error("no record found for id {0}")]
    RecordNotFound(String),

    /// The patient has no phone number on file at dispatch time.
    #[error("patient has no phone number on file")]
    MissingRecipient,

    /// A read or write against the backing store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Caller-supplied data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type CoordinationResult<T> = std::result::Result<T, CoordinationError>;
