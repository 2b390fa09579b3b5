// Error types for the STACKING ledger engine

use serde::Serialize;

use crate::store::StoreError;

/// Everything a ledger operation can fail with
#[derive(Debug, Clone, Serialize)]
pub enum LedgerError {
    Validation(String),
    MarketNotFound(String),
    AccountNotFound(String),
    CommentNotFound(String),
    MarketNotOpen(String),
    MarketStillOpen(String),
    AlreadyResolved(String),
    NotResolved(String),
    NotCreator(String),
    AlreadyClaimed(String),
    NothingToClaim(String),
    SelfLike(String),
    SelfUnlock(String),
    AlreadyUnlocked(String),
    InsufficientBalance(String),
    Conflict(String),
    Storage(String),
}

/// Coarse classification used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any read
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// State does not permit the action, no partial effect
    Precondition,
    /// Concurrent writers exhausted the retry budget, safe to retry
    Transient,
    /// Underlying store failed, not retried by the engine
    Storage,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::MarketNotFound(_)
            | LedgerError::AccountNotFound(_)
            | LedgerError::CommentNotFound(_) => ErrorKind::NotFound,
            LedgerError::MarketNotOpen(_)
            | LedgerError::MarketStillOpen(_)
            | LedgerError::AlreadyResolved(_)
            | LedgerError::NotResolved(_)
            | LedgerError::NotCreator(_)
            | LedgerError::AlreadyClaimed(_)
            | LedgerError::NothingToClaim(_)
            | LedgerError::SelfLike(_)
            | LedgerError::SelfUnlock(_)
            | LedgerError::AlreadyUnlocked(_)
            | LedgerError::InsufficientBalance(_) => ErrorKind::Precondition,
            LedgerError::Conflict(_) => ErrorKind::Transient,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Validation(msg) => write!(f, "Invalid request: {}", msg),
            LedgerError::MarketNotFound(msg) => write!(f, "Market not found: {}", msg),
            LedgerError::AccountNotFound(msg) => write!(f, "Account not found: {}", msg),
            LedgerError::CommentNotFound(msg) => write!(f, "Comment not found: {}", msg),
            LedgerError::MarketNotOpen(msg) => write!(f, "Market not open: {}", msg),
            LedgerError::MarketStillOpen(msg) => write!(f, "Market still open: {}", msg),
            LedgerError::AlreadyResolved(msg) => write!(f, "Already resolved: {}", msg),
            LedgerError::NotResolved(msg) => write!(f, "Not resolved: {}", msg),
            LedgerError::NotCreator(msg) => write!(f, "Not the creator: {}", msg),
            LedgerError::AlreadyClaimed(msg) => write!(f, "Already claimed: {}", msg),
            LedgerError::NothingToClaim(msg) => write!(f, "Nothing to claim: {}", msg),
            LedgerError::SelfLike(msg) => write!(f, "Self-like rejected: {}", msg),
            LedgerError::SelfUnlock(msg) => write!(f, "Self-unlock rejected: {}", msg),
            LedgerError::AlreadyUnlocked(msg) => write!(f, "Already unlocked: {}", msg),
            LedgerError::InsufficientBalance(msg) => {
                write!(f, "Insufficient balance: {}", msg)
            }
            LedgerError::Conflict(msg) => write!(f, "Transient conflict: {}", msg),
            LedgerError::Storage(msg) => write!(f, "Storage failure: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => {
                LedgerError::Conflict("concurrent write on the same entities".to_string())
            }
            StoreError::Backend(msg) => LedgerError::Storage(msg),
            StoreError::Codec(msg) => LedgerError::Storage(msg),
        }
    }
}
