//! Ledger Error Types
//!
//! Every failure leaves the ledger exactly as it was before the call.

use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;

use super::models::Currency;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// PostgreSQL: serialization_failure, deadlock_detected, lock_not_available.
/// SQLite: BUSY, LOCKED and their extended variants.
const CONFLICT_CODES: &[&str] = &["40001", "40P01", "55P03", "5", "6", "261", "262", "517"];

#[derive(Error, Debug)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Source and destination account cannot be the same")]
    SameAccount,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Page limit and offset must not be negative")]
    InvalidPage,

    // === Not Found ===
    #[error("Account not found")]
    AccountNotFound,

    #[error("Entry not found")]
    EntryNotFound,

    #[error("Transfer not found")]
    TransferNotFound,

    #[error("Account {0} is still referenced by entries or transfers")]
    AccountInUse(i64),

    // === Policy Errors ===
    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Currency mismatch: {from} -> {to}")]
    CurrencyMismatch { from: Currency, to: Currency },

    // === Engine Errors ===
    #[error("Transfer failed: {0}")]
    Conflict(String),

    #[error("Transfer deadline exceeded")]
    DeadlineExceeded,

    #[error("Transfer cancelled")]
    Cancelled,

    /// Produced by the transaction boundary after rolling back; wraps the cause.
    #[error("Transaction aborted: {0}")]
    Aborted(#[source] Box<LedgerError>),

    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Stable error code for callers that render errors
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::SameAccount => "SAME_ACCOUNT",
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::InvalidPage => "INVALID_PAGE",
            LedgerError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            LedgerError::EntryNotFound => "ENTRY_NOT_FOUND",
            LedgerError::TransferNotFound => "TRANSFER_NOT_FOUND",
            LedgerError::AccountInUse(_) => "ACCOUNT_IN_USE",
            LedgerError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            LedgerError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            LedgerError::Conflict(_) => "TRANSFER_FAILED",
            LedgerError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            LedgerError::Cancelled => "CANCELLED",
            LedgerError::Aborted(cause) => cause.code(),
            LedgerError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self.cause(),
            LedgerError::SameAccount | LedgerError::InvalidAmount | LedgerError::InvalidPage
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.cause(),
            LedgerError::AccountNotFound
                | LedgerError::EntryNotFound
                | LedgerError::TransferNotFound
        )
    }

    /// Only engine conflicts are worth retrying; the ledger does not retry itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self.cause(), LedgerError::Conflict(_))
    }

    /// Innermost error, looking through transaction-boundary wrappers
    pub fn cause(&self) -> &LedgerError {
        match self {
            LedgerError::Aborted(inner) => inner.cause(),
            other => other,
        }
    }

    pub fn into_cause(self) -> LedgerError {
        match self {
            LedgerError::Aborted(inner) => inner.into_cause(),
            other => other,
        }
    }
}

fn is_conflict(err: &dyn DatabaseError) -> bool {
    let code_matches = err
        .code()
        .is_some_and(|code| CONFLICT_CODES.iter().any(|c| *c == code));
    code_matches || err.message().contains("database is locked")
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if is_conflict(&**db) => {
                LedgerError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if matches!(db.kind(), ErrorKind::ForeignKeyViolation) => {
                LedgerError::AccountNotFound
            }
            _ => LedgerError::Database(e.to_string()),
        }
    }
}
