//! Error types for Cashpoint operations.

use crate::AccountNumber;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error category surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Caller input or business rule violation. Never retried automatically.
    Rejected,
    /// The account does not exist.
    NotFound,
    /// The account service could not be reached or failed unexpectedly.
    Unavailable,
}

/// Main error type for Cashpoint operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtmError {
    /// Amount is zero, negative, fractional or out of range.
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Decimal, reason: String },

    /// Amount is not a multiple of the smallest note the ATM holds.
    #[error("It is not possible to dispense {amount}: not a multiple of {smallest}")]
    AmountNotDispensable { amount: u32, smallest: u32 },

    /// The ATM cannot cover the amount with the notes it currently holds.
    #[error("ATM does not have the funds to dispense {requested} (cash on hand {available})")]
    InsufficientInventory { requested: u32, available: u32 },

    /// Supplied pin does not match the account pin.
    #[error("Pin for account {0} is invalid")]
    InvalidCredential(AccountNumber),

    /// Account balance plus overdraft does not cover the amount.
    #[error("Account {account} has insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        account: AccountNumber,
        required: Decimal,
        available: Decimal,
    },

    /// Account with this number already exists.
    #[error("Account {0} already exists")]
    DuplicateAccount(AccountNumber),

    /// Account does not exist.
    #[error("Account number '{0}' was not found")]
    AccountNotFound(AccountNumber),

    /// Account service unreachable or returned an unexpected failure.
    #[error("Account service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Remote call did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AtmError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AtmError::InvalidAmount { .. }
            | AtmError::AmountNotDispensable { .. }
            | AtmError::InsufficientInventory { .. }
            | AtmError::InvalidCredential(_)
            | AtmError::InsufficientFunds { .. }
            | AtmError::DuplicateAccount(_) => ErrorKind::Rejected,
            AtmError::AccountNotFound(_) => ErrorKind::NotFound,
            AtmError::ServiceUnavailable(_)
            | AtmError::Timeout(_)
            | AtmError::ConfigurationError(_)
            | AtmError::InternalError(_) => ErrorKind::Unavailable,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AtmError::ServiceUnavailable(_) | AtmError::Timeout(_))
    }

    /// Get suggested retry delay in milliseconds.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            AtmError::ServiceUnavailable(_) => Some(500),
            AtmError::Timeout(_) => Some(1000),
            _ => None,
        }
    }

    /// HTTP-style status code callers should see.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Rejected => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Get error code for responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AtmError::InvalidAmount { .. } => "INVALID_AMOUNT",
            AtmError::AmountNotDispensable { .. } => "AMOUNT_NOT_DISPENSABLE",
            AtmError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            AtmError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            AtmError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AtmError::DuplicateAccount(_) => "DUPLICATE_ACCOUNT",
            AtmError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            AtmError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AtmError::Timeout(_) => "TIMEOUT",
            AtmError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AtmError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias for Cashpoint operations.
pub type Result<T> = std::result::Result<T, AtmError>;

/// Error body returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Status code.
    pub status: u16,
    /// Category.
    pub kind: ErrorKind,
    /// Error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&AtmError> for ErrorResponse {
    fn from(error: &AtmError) -> Self {
        Self {
            status: error.status_code(),
            kind: error.kind(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}
