//! Account service client used by the ATM.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use cashpoint_common::{AccountBalance, AccountNumber, Pin, Result};
use cashpoint_ledger::LedgerEngine;

/// Remote account service as seen from the ATM.
///
/// Each call resolves to exactly one outcome. Transport failures are
/// reported as [`cashpoint_common::ErrorKind::Unavailable`] errors.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Debit the account.
    async fn withdraw(&self, account: &AccountNumber, pin: &Pin, amount: Decimal) -> Result<()>;

    /// Credit the account.
    async fn deposit(&self, account: &AccountNumber, pin: &Pin, amount: Decimal) -> Result<()>;

    /// Balance and overdraft of the account.
    async fn balance(&self, account: &AccountNumber, pin: &Pin) -> Result<AccountBalance>;
}

/// Client backed by an in-process ledger.
#[derive(Clone)]
pub struct LedgerClient {
    ledger: Arc<LedgerEngine>,
}

impl LedgerClient {
    /// Create a client for the given ledger.
    pub fn new(ledger: Arc<LedgerEngine>) -> Self {
        Self { ledger }
    }

    /// The ledger behind this client.
    pub fn ledger(&self) -> &Arc<LedgerEngine> {
        &self.ledger
    }
}

#[async_trait]
impl AccountService for LedgerClient {
    async fn withdraw(&self, account: &AccountNumber, pin: &Pin, amount: Decimal) -> Result<()> {
        let entry = self.ledger.withdraw(account, pin, amount)?;
        debug!(entry_id = %entry.id, balance = %entry.balance_after, "Ledger withdraw applied");
        Ok(())
    }

    async fn deposit(&self, account: &AccountNumber, pin: &Pin, amount: Decimal) -> Result<()> {
        let entry = self.ledger.deposit(account, pin, amount)?;
        debug!(entry_id = %entry.id, balance = %entry.balance_after, "Ledger deposit applied");
        Ok(())
    }

    async fn balance(&self, account: &AccountNumber, pin: &Pin) -> Result<AccountBalance> {
        self.ledger.balance(account, pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashpoint_common::ErrorKind;
    use rust_decimal_macros::dec;

    fn create_test_client() -> LedgerClient {
        let ledger = Arc::new(LedgerEngine::new());
        ledger
            .open_account(AccountNumber::new("328762"), Pin::new("1234"), dec!(800), dec!(200))
            .unwrap();
        LedgerClient::new(ledger)
    }

    #[tokio::test]
    async fn test_round_trip_through_client() {
        let client = create_test_client();
        let account = AccountNumber::new("328762");
        let pin = Pin::new("1234");

        client.withdraw(&account, &pin, dec!(500)).await.unwrap();
        client.deposit(&account, &pin, dec!(50)).await.unwrap();

        let balance = client.balance(&account, &pin).await.unwrap();
        assert_eq!(balance.balance, dec!(350));
        assert_eq!(client.ledger().entries(&account).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_errors_keep_their_kind() {
        let client = create_test_client();

        let err = client
            .withdraw(&AccountNumber::new("328762"), &Pin::new("1234"), dec!(1001))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);

        let err = client
            .balance(&AccountNumber::new("000001"), &Pin::new("1234"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
