//! Journal of applied balance changes.

use cashpoint_common::AccountNumber;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Withdrawal (balance decreases).
    Debit,
    /// Deposit (balance increases).
    Credit,
}

/// A single applied balance change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Account affected.
    pub account_number: AccountNumber,
    /// Entry type (debit or credit).
    pub entry_type: EntryType,
    /// Amount.
    pub amount: Decimal,
    /// Balance after this entry.
    pub balance_after: Decimal,
    /// When this entry was created.
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Create a debit entry.
    pub fn debit(account_number: AccountNumber, amount: Decimal, balance_after: Decimal) -> Self {
        Self::new(account_number, EntryType::Debit, amount, balance_after)
    }

    /// Create a credit entry.
    pub fn credit(account_number: AccountNumber, amount: Decimal, balance_after: Decimal) -> Self {
        Self::new(account_number, EntryType::Credit, amount, balance_after)
    }

    fn new(
        account_number: AccountNumber,
        entry_type: EntryType,
        amount: Decimal,
        balance_after: Decimal,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_number,
            entry_type,
            amount,
            balance_after,
            created_at: Utc::now(),
        }
    }

    /// Signed effect on the balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Debit => -self.amount,
            EntryType::Credit => self.amount,
        }
    }
}

/// Sum of debits in a slice of entries.
pub fn total_debits(entries: &[JournalEntry]) -> Decimal {
    entries
        .iter()
        .filter(|e| e.entry_type == EntryType::Debit)
        .map(|e| e.amount)
        .sum()
}

/// Sum of credits in a slice of entries.
pub fn total_credits(entries: &[JournalEntry]) -> Decimal {
    entries
        .iter()
        .filter(|e| e.entry_type == EntryType::Credit)
        .map(|e| e.amount)
        .sum()
}
