//! Error types for the cartela ledger.
//!
//! One taxonomy covers every failure the core can produce; the API layer
//! maps these onto HTTP responses in `api::errors`.

use thiserror::Error;

/// Root error type for ledger operations.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// One message per rejected field. The request is otherwise unaffected;
    /// nothing was committed.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Username collides with an existing account of any role.
    #[error("username already exists")]
    DuplicateUsername,

    /// Display name collides with an existing account of any role.
    #[error("name already exists")]
    DuplicateName,

    /// A transfer or game debit precondition failed. No mutation occurred.
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("{0} not found")]
    NotFound(String),

    /// Identity invalid, expired, forged, or missing. The caller's session
    /// credential must be discarded.
    #[error("unauthorized")]
    Unauthorized,

    /// The account exists but is suspended; treated like `Unauthorized` at
    /// the boundary, kept distinct for internal decisions.
    #[error("account suspended")]
    Suspended,

    /// The store could not commit the transaction; everything rolled back.
    /// Safe to retry after confirming state.
    #[error("storage conflict")]
    Conflict,
}

impl LedgerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        LedgerError::NotFound(what.into())
    }

    /// Single-message validation failure.
    pub fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::Validation(vec![msg.into()])
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
