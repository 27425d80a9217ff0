//! Account definitions for ledger.

use cashpoint_common::{AccountBalance, AccountNumber, AtmError, Pin, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A ledger account.
///
/// Invariant: `balance >= -overdraft` after every applied operation.
#[derive(Debug, Clone)]
pub struct Account {
    /// Account number.
    pub number: AccountNumber,
    /// Shared secret.
    pin: Pin,
    /// Current balance.
    balance: Decimal,
    /// Overdraft limit.
    overdraft: Decimal,
    /// When the account was opened.
    pub created_at: DateTime<Utc>,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open an account, checking the overdraft invariant.
    pub fn new(
        number: AccountNumber,
        pin: Pin,
        balance: Decimal,
        overdraft: Decimal,
    ) -> Result<Self> {
        if overdraft < Decimal::ZERO {
            return Err(AtmError::InvalidAmount {
                amount: overdraft,
                reason: "overdraft must not be negative".to_string(),
            });
        }

        if balance < -overdraft {
            return Err(AtmError::InvalidAmount {
                amount: balance,
                reason: "balance is below the overdraft limit".to_string(),
            });
        }

        let now = Utc::now();
        Ok(Self {
            number,
            pin,
            balance,
            overdraft,
            created_at: now,
            updated_at: now,
        })
    }

    /// Current balance.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Overdraft limit.
    pub fn overdraft(&self) -> Decimal {
        self.overdraft
    }

    /// Balance plus overdraft.
    pub fn available(&self) -> Decimal {
        self.balance + self.overdraft
    }

    /// Balance snapshot.
    pub fn snapshot(&self) -> AccountBalance {
        AccountBalance {
            balance: self.balance,
            overdraft: self.overdraft,
        }
    }

    /// Check the supplied pin.
    pub fn verify_pin(&self, pin: &Pin) -> Result<()> {
        if self.pin.matches(pin) {
            Ok(())
        } else {
            Err(AtmError::InvalidCredential(self.number.clone()))
        }
    }

    /// Reduce the balance. Fails without mutation if the overdraft would be
    /// exceeded.
    pub fn debit(&mut self, amount: Decimal) -> Result<Decimal> {
        ensure_positive(amount)?;

        if self.available() - amount < Decimal::ZERO {
            return Err(AtmError::InsufficientFunds {
                account: self.number.clone(),
                required: amount,
                available: self.available(),
            });
        }

        self.balance -= amount;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }

    /// Increase the balance. No upper bound.
    pub fn credit(&mut self, amount: Decimal) -> Result<Decimal> {
        ensure_positive(amount)?;

        self.balance += amount;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AtmError::InvalidAmount {
            amount,
            reason: "amount must be positive".to_string(),
        });
    }
    Ok(())
}
