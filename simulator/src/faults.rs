//! Fault injection in front of the account service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cashpoint_common::{AccountBalance, AccountNumber, AtmError, Pin, Result};
use cashpoint_coordinator::AccountService;

/// Types of faults that can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultType {
    /// Every call fails as if the service were unreachable.
    LedgerOffline,
    /// Every call fails with an unexpected server-side error.
    LedgerError,
    /// Every call is delayed before reaching the ledger.
    Latency { delay_ms: u64 },
}

/// Account service wrapper that can be told to misbehave.
pub struct FaultyAccountService {
    inner: Arc<dyn AccountService>,
    fault: RwLock<Option<FaultType>>,
}

impl FaultyAccountService {
    /// Wrap an account service.
    pub fn new(inner: Arc<dyn AccountService>) -> Self {
        Self {
            inner,
            fault: RwLock::new(None),
        }
    }

    /// Start failing calls.
    pub fn inject(&self, fault: FaultType) {
        *self.fault.write() = Some(fault);
    }

    /// Back to normal.
    pub fn clear(&self) {
        *self.fault.write() = None;
    }

    /// Current fault, if any.
    pub fn fault(&self) -> Option<FaultType> {
        *self.fault.read()
    }

    async fn before_call(&self, operation: &str) -> Result<()> {
        let fault = self.fault();
        match fault {
            None => Ok(()),
            Some(FaultType::LedgerOffline) => {
                debug!(operation, "Injected outage");
                Err(AtmError::ServiceUnavailable(format!(
                    "{} failed: connection refused",
                    operation
                )))
            }
            Some(FaultType::LedgerError) => {
                debug!(operation, "Injected ledger error");
                Err(AtmError::InternalError(format!(
                    "{} failed: ledger returned an unexpected error",
                    operation
                )))
            }
            Some(FaultType::Latency { delay_ms }) => {
                debug!(operation, delay_ms, "Injected latency");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl AccountService for FaultyAccountService {
    async fn withdraw(&self, account: &AccountNumber, pin: &Pin, amount: Decimal) -> Result<()> {
        self.before_call("withdraw").await?;
        self.inner.withdraw(account, pin, amount).await
    }

    async fn deposit(&self, account: &AccountNumber, pin: &Pin, amount: Decimal) -> Result<()> {
        self.before_call("deposit").await?;
        self.inner.deposit(account, pin, amount).await
    }

    async fn balance(&self, account: &AccountNumber, pin: &Pin) -> Result<AccountBalance> {
        self.before_call("balance").await?;
        self.inner.balance(account, pin).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashpoint_common::ErrorKind;
    use cashpoint_coordinator::LedgerClient;
    use cashpoint_ledger::LedgerEngine;
    use rust_decimal_macros::dec;

    fn create_test_service() -> FaultyAccountService {
        let ledger = Arc::new(LedgerEngine::new());
        ledger
            .open_account(AccountNumber::new("1001"), Pin::new("1111"), dec!(100), dec!(0))
            .unwrap();
        FaultyAccountService::new(Arc::new(LedgerClient::new(ledger)))
    }

    #[tokio::test]
    async fn test_offline_fault() {
        let service = create_test_service();
        let account = AccountNumber::new("1001");
        let pin = Pin::new("1111");

        service.inject(FaultType::LedgerOffline);
        let err = service.withdraw(&account, &pin, dec!(10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        service.clear();
        service.withdraw(&account, &pin, dec!(10)).await.unwrap();
        assert_eq!(service.balance(&account, &pin).await.unwrap().balance, dec!(90));
    }

    #[tokio::test]
    async fn test_ledger_error_fault() {
        let service = create_test_service();
        service.inject(FaultType::LedgerError);

        let err = service
            .deposit(&AccountNumber::new("1001"), &Pin::new("1111"), dec!(5))
            .await
            .unwrap_err();

        assert!(matches!(err, AtmError::InternalError(_)));
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        service.clear();
        let balance = service
            .balance(&AccountNumber::new("1001"), &Pin::new("1111"))
            .await
            .unwrap();
        assert_eq!(balance.balance, dec!(100));
    }

    #[tokio::test]
    async fn test_latency_fault_still_reaches_ledger() {
        let service = create_test_service();
        service.inject(FaultType::Latency { delay_ms: 5 });

        service
            .deposit(&AccountNumber::new("1001"), &Pin::new("1111"), dec!(5))
            .await
            .unwrap();
        assert_eq!(service.fault(), Some(FaultType::Latency { delay_ms: 5 }));
    }
}
