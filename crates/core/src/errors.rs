//! Core error types for the aggregation engine.
//!
//! This module defines storage-agnostic error types. Storage-specific errors
//! are converted to these types by the host's repository implementations.

use rust_decimal::Decimal;
use std::num::ParseIntError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Invalid movement: {0}")]
    InvalidMovement(#[from] InvalidMovementError),

    #[error("Unbalanced operation: {0}")]
    UnbalancedOperation(#[from] UnbalancedOperationError),

    #[error("Processing cancelled for account {account_id}")]
    CancellationRequested { account_id: String },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// True when the error is a cooperative stop rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::CancellationRequested { .. })
    }
}

/// Storage-agnostic error type for repository operations.
///
/// Uses `String` for all details so host storage layers can map their own
/// driver errors into it.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Why a movement was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidMovementReason {
    #[error("sequence {sequence} does not follow previously applied sequence {previous}")]
    OutOfOrder { previous: u64, sequence: u64 },

    #[error("closing {requested} exceeds tracked open quantity {available} for {leg}")]
    Oversell {
        leg: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("movement belongs to account {found}")]
    AccountMismatch { found: String },

    #[error("{0}")]
    Malformed(String),
}

/// A movement that cannot be applied. Fatal for the owning account's run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("account {account_id}, sequence {sequence} ({kind}): {reason}")]
pub struct InvalidMovementError {
    pub account_id: String,
    pub sequence: u64,
    pub kind: String,
    pub reason: InvalidMovementReason,
}

/// The consolidator saw a closing leg it has no record of.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("account {account_id}, ticker {ticker}, sequence {sequence}: {reason}")]
pub struct UnbalancedOperationError {
    pub account_id: String,
    pub ticker: String,
    pub sequence: u64,
    pub reason: String,
}

/// Validation errors for configuration and persisted state.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Failed to parse number: {0}")]
    NumberParse(#[from] ParseIntError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Unexpected(format!("Account task failed to join: {}", err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
