//! Core ledger engine implementation.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use cashpoint_common::{AccountBalance, AccountNumber, AtmError, Pin, Result};

use crate::account::Account;
use crate::journal::JournalEntry;

/// An account together with its journal, guarded by one lock.
#[derive(Debug)]
struct AccountRecord {
    account: Account,
    journal: Vec<JournalEntry>,
}

/// The ledger engine owns account rows and applies debits and credits.
///
/// Every account sits behind its own mutex, so a read-modify-write on one
/// account is atomic while operations on different accounts never wait on
/// each other.
pub struct LedgerEngine {
    accounts: DashMap<AccountNumber, Arc<Mutex<AccountRecord>>>,
}

impl LedgerEngine {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Open an account with an opening balance and overdraft limit.
    #[instrument(skip(self, pin))]
    pub fn open_account(
        &self,
        number: AccountNumber,
        pin: Pin,
        balance: Decimal,
        overdraft: Decimal,
    ) -> Result<()> {
        match self.accounts.entry(number.clone()) {
            Entry::Occupied(_) => Err(AtmError::DuplicateAccount(number)),
            Entry::Vacant(slot) => {
                let account = Account::new(number.clone(), pin, balance, overdraft)?;
                slot.insert(Arc::new(Mutex::new(AccountRecord {
                    account,
                    journal: Vec::new(),
                })));
                info!(account = %number, balance = %balance, overdraft = %overdraft, "Account opened");
                Ok(())
            }
        }
    }

    /// Look up an account and check its pin.
    #[instrument(skip(self, pin))]
    pub fn authenticate(&self, number: &AccountNumber, pin: &Pin) -> Result<Account> {
        let record = self.record(number)?;
        let guard = record.lock();
        guard.account.verify_pin(pin)?;
        Ok(guard.account.clone())
    }

    /// Withdraw funds, allowing the balance to go down to `-overdraft`.
    #[instrument(skip(self, pin))]
    pub fn withdraw(
        &self,
        number: &AccountNumber,
        pin: &Pin,
        amount: Decimal,
    ) -> Result<JournalEntry> {
        info!(account = %number, amount = %amount, "Withdraw funds");

        let record = self.record(number)?;
        let mut guard = record.lock();
        guard.account.verify_pin(pin)?;

        let balance_after = match guard.account.debit(amount) {
            Ok(balance) => balance,
            Err(e) => {
                warn!(account = %number, amount = %amount, error = %e, "Withdrawal refused");
                return Err(e);
            }
        };

        let entry = JournalEntry::debit(number.clone(), amount, balance_after);
        guard.journal.push(entry.clone());

        info!(account = %number, balance = %balance_after, "Account debited");
        Ok(entry)
    }

    /// Deposit funds.
    #[instrument(skip(self, pin))]
    pub fn deposit(
        &self,
        number: &AccountNumber,
        pin: &Pin,
        amount: Decimal,
    ) -> Result<JournalEntry> {
        info!(account = %number, amount = %amount, "Deposit funds");

        let record = self.record(number)?;
        let mut guard = record.lock();
        guard.account.verify_pin(pin)?;

        let balance_after = guard.account.credit(amount)?;
        let entry = JournalEntry::credit(number.clone(), amount, balance_after);
        guard.journal.push(entry.clone());

        info!(account = %number, balance = %balance_after, "Account credited");
        Ok(entry)
    }

    /// Current balance and overdraft.
    #[instrument(skip(self, pin))]
    pub fn balance(&self, number: &AccountNumber, pin: &Pin) -> Result<AccountBalance> {
        let record = self.record(number)?;
        let guard = record.lock();
        guard.account.verify_pin(pin)?;
        Ok(guard.account.snapshot())
    }

    /// Journal entries for an account, oldest first.
    pub fn entries(&self, number: &AccountNumber) -> Result<Vec<JournalEntry>> {
        let record = self.record(number)?;
        let entries = record.lock().journal.clone();
        Ok(entries)
    }

    /// Number of open accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn record(&self, number: &AccountNumber) -> Result<Arc<Mutex<AccountRecord>>> {
        self.accounts
            .get(number)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| AtmError::AccountNotFound(number.clone()))
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::EntryType;
    use cashpoint_common::ErrorKind;
    use rust_decimal_macros::dec;

    fn create_test_ledger() -> LedgerEngine {
        let ledger = LedgerEngine::new();
        ledger
            .open_account(AccountNumber::new("328762"), Pin::new("1234"), dec!(800), dec!(200))
            .unwrap();
        ledger
            .open_account(AccountNumber::new("991100"), Pin::new("0000"), dec!(200), dec!(200))
            .unwrap();
        ledger
    }

    #[test]
    fn test_withdraw_within_overdraft() {
        let ledger = create_test_ledger();
        let number = AccountNumber::new("328762");

        let entry = ledger.withdraw(&number, &Pin::new("1234"), dec!(500)).unwrap();
        assert_eq!(entry.entry_type, EntryType::Debit);
        assert_eq!(entry.balance_after, dec!(300));

        let balance = ledger.balance(&number, &Pin::new("1234")).unwrap();
        assert_eq!(balance.balance, dec!(300));
        assert_eq!(balance.overdraft, dec!(200));
    }

    #[test]
    fn test_withdraw_over_limit_leaves_balance() {
        let ledger = create_test_ledger();
        let number = AccountNumber::new("991100");

        let err = ledger.withdraw(&number, &Pin::new("0000"), dec!(500)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(matches!(err, AtmError::InsufficientFunds { .. }));

        let balance = ledger.balance(&number, &Pin::new("0000")).unwrap();
        assert_eq!(balance.balance, dec!(200));
        assert!(ledger.entries(&number).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_pin_mutates_nothing() {
        let ledger = create_test_ledger();
        let number = AccountNumber::new("328762");
        let wrong = Pin::new("4321");

        for err in [
            ledger.withdraw(&number, &wrong, dec!(10)).unwrap_err(),
            ledger.deposit(&number, &wrong, dec!(10)).unwrap_err(),
            ledger.balance(&number, &wrong).unwrap_err(),
            ledger.authenticate(&number, &wrong).unwrap_err(),
        ] {
            assert!(matches!(err, AtmError::InvalidCredential(_)));
            assert_eq!(err.kind(), ErrorKind::Rejected);
        }

        let balance = ledger.balance(&number, &Pin::new("1234")).unwrap();
        assert_eq!(balance.balance, dec!(800));
        assert!(ledger.entries(&number).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_account() {
        let ledger = create_test_ledger();
        let err = ledger
            .balance(&AccountNumber::new("000000"), &Pin::new("1234"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_deposit_and_journal() {
        let ledger = create_test_ledger();
        let number = AccountNumber::new("328762");
        let pin = Pin::new("1234");

        ledger.deposit(&number, &pin, dec!(1000)).unwrap();
        ledger.withdraw(&number, &pin, dec!(250)).unwrap();

        let entries = ledger.entries(&number).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, EntryType::Credit);
        assert_eq!(entries[0].balance_after, dec!(1800));
        assert_eq!(entries[1].entry_type, EntryType::Debit);
        assert_eq!(entries[1].balance_after, dec!(1550));
    }

    #[test]
    fn test_duplicate_account_is_refused() {
        let ledger = create_test_ledger();
        let err = ledger
            .open_account(AccountNumber::new("328762"), Pin::new("9"), dec!(0), dec!(0))
            .unwrap_err();
        assert!(matches!(err, AtmError::DuplicateAccount(_)));
        assert_eq!(ledger.account_count(), 2);
    }

    #[test]
    fn test_concurrent_withdrawals_respect_overdraft() {
        let ledger = create_test_ledger();
        let number = AccountNumber::new("991100");
        let (ledger_ref, number_ref) = (&ledger, &number);

        // 200 balance + 200 overdraft: only one of two 300 withdrawals fits.
        let results: Vec<Result<JournalEntry>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(move || ledger_ref.withdraw(number_ref, &Pin::new("0000"), dec!(300)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let balance = ledger.balance(&number, &Pin::new("0000")).unwrap();
        assert_eq!(balance.balance, dec!(-100));
    }
}
