//! Identifier types for Cashpoint entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a completed withdrawal.
/// Uses UUID v7 for time-ordered identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithdrawalId(Uuid);

impl WithdrawalId {
    /// Create a new withdrawal ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WithdrawalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account number as issued by the account service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Create a new account number.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Get the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Basic format check: non-empty, at most 34 characters, alphanumeric.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.len() <= 34 && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Account pin. Compared as an opaque, case-sensitive string.
///
/// `Debug` and `Display` never print the secret so a pin can travel through
/// `tracing` fields and error messages safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pin(String);

impl Pin {
    /// Create a new pin.
    pub fn new(pin: impl Into<String>) -> Self {
        Self(pin.into())
    }

    /// Exact comparison against a supplied pin.
    pub fn matches(&self, other: &Pin) -> bool {
        self.0 == other.0
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl From<&str> for Pin {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdrawal_id_creation() {
        let id1 = WithdrawalId::new();
        let id2 = WithdrawalId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_withdrawal_id_parse() {
        let uuid_str = "019456ab-1234-7def-8901-234567890abc";
        let id = WithdrawalId::parse(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
    }

    #[test]
    fn test_account_number_validation() {
        assert!(AccountNumber::new("328762").is_valid());
        assert!(AccountNumber::new("PT50000201231234567890154").is_valid());
        assert!(!AccountNumber::new("").is_valid());
        assert!(!AccountNumber::new("32-87-62").is_valid());
    }

    #[test]
    fn test_pin_is_case_sensitive() {
        let stored = Pin::new("abCD");
        assert!(stored.matches(&Pin::new("abCD")));
        assert!(!stored.matches(&Pin::new("abcd")));
    }

    #[test]
    fn test_pin_is_redacted() {
        let pin = Pin::new("1234");
        assert_eq!(format!("{pin}"), "****");
        assert!(!format!("{pin:?}").contains("1234"));
    }
}
