//! Withdrawal coordination: dispense cash, debit the account, refund on failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use cashpoint_common::{
    whole_units, AccountBalance, AccountNumber, AtmError, CashBundle, DispenseResponse, ErrorKind,
    Pin, Result, WithdrawalId,
};

use crate::client::AccountService;
use crate::config::AtmConfig;
use crate::inventory::DenominationInventory;
use crate::metrics::{Metrics, SharedMetrics};

/// A completed withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Unique withdrawal ID.
    pub id: WithdrawalId,
    /// Debited account.
    pub account_number: AccountNumber,
    /// Amount handed out.
    pub amount: u32,
    /// Notes handed out, largest first.
    pub notes: CashBundle,
    /// When the debit was confirmed.
    pub completed_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Response body for this withdrawal.
    pub fn to_response(&self) -> DispenseResponse {
        DispenseResponse::new(self.amount, &self.notes)
    }
}

/// Notes taken out of the inventory but not yet confirmed by a debit.
///
/// Dropping an unresolved allocation puts the notes back, which covers a
/// dispense future cancelled while the debit is in flight.
struct PendingAllocation<'a> {
    inventory: &'a DenominationInventory,
    metrics: &'a Metrics,
    notes: Option<CashBundle>,
}

impl<'a> PendingAllocation<'a> {
    fn new(inventory: &'a DenominationInventory, metrics: &'a Metrics, notes: CashBundle) -> Self {
        Self {
            inventory,
            metrics,
            notes: Some(notes),
        }
    }

    /// Debit confirmed: the notes leave the machine for good.
    fn commit(mut self) -> CashBundle {
        self.notes.take().unwrap_or_default()
    }

    /// Debit failed: return the notes to the inventory.
    fn refund(mut self) {
        if let Some(notes) = self.notes.take() {
            self.inventory.refund(&notes);
            self.metrics.refund_performed();
        }
    }
}

impl Drop for PendingAllocation<'_> {
    fn drop(&mut self) {
        if let Some(notes) = self.notes.take() {
            warn!(notes = %notes, "Dispense abandoned before debit resolved, refunding cash");
            self.inventory.refund(&notes);
            self.metrics.refund_performed();
        }
    }
}

/// A dispense counted as active until its outcome is recorded.
///
/// Dropped without an outcome means the dispense future was cancelled.
struct InFlight<'a> {
    metrics: &'a Metrics,
    resolved: bool,
}

impl<'a> InFlight<'a> {
    fn start(metrics: &'a Metrics) -> Self {
        metrics.dispense_started();
        Self {
            metrics,
            resolved: false,
        }
    }

    fn succeeded(mut self, amount: u64) {
        self.resolved = true;
        self.metrics.dispense_succeeded(amount);
    }

    fn failed(mut self, kind: ErrorKind) {
        self.resolved = true;
        match kind {
            ErrorKind::Unavailable => self.metrics.dispense_unavailable(),
            ErrorKind::Rejected | ErrorKind::NotFound => self.metrics.dispense_rejected(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.metrics.dispense_abandoned();
        }
    }
}

/// Sequences a physical dispense with a remote account debit.
pub struct WithdrawalCoordinator {
    /// ATM identifier used in logs.
    atm_id: String,
    /// Notes on hand.
    inventory: Arc<DenominationInventory>,
    /// Account service.
    accounts: Arc<dyn AccountService>,
    /// Upper bound on one account service call.
    remote_timeout: Duration,
    /// Metrics.
    metrics: SharedMetrics,
}

impl WithdrawalCoordinator {
    /// Create a coordinator from configuration.
    pub fn new(config: &AtmConfig, accounts: Arc<dyn AccountService>) -> Result<Self> {
        config.validate().map_err(AtmError::ConfigurationError)?;

        let inventory = Arc::new(DenominationInventory::new(&config.inventory)?);
        let atm_id = config
            .atm_id
            .clone()
            .unwrap_or_else(|| format!("atm-{}", uuid::Uuid::new_v4()));

        Ok(Self::with_inventory(
            atm_id,
            inventory,
            accounts,
            config.remote_timeout,
        ))
    }

    /// Create a coordinator around an existing inventory.
    pub fn with_inventory(
        atm_id: impl Into<String>,
        inventory: Arc<DenominationInventory>,
        accounts: Arc<dyn AccountService>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            atm_id: atm_id.into(),
            inventory,
            accounts,
            remote_timeout,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Dispense `amount` and debit it from the account.
    ///
    /// 1. Allocate notes. A failure here is returned as is and the account
    ///    service is never called.
    /// 2. Debit the account.
    /// 3. If the debit fails for any reason, refund the notes and return the
    ///    debit error unchanged.
    /// 4. Otherwise the notes are the result and the inventory decrement is
    ///    final.
    #[instrument(skip(self, pin), fields(atm_id = %self.atm_id))]
    pub async fn dispense(
        &self,
        account: &AccountNumber,
        pin: &Pin,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        info!(account = %account, amount = %amount, "Dispense cash");
        let in_flight = InFlight::start(&self.metrics);

        let result = self.run_dispense(account, pin, amount).await;

        match &result {
            Ok(withdrawal) => {
                in_flight.succeeded(u64::from(withdrawal.amount));
                info!(
                    withdrawal_id = %withdrawal.id,
                    account = %account,
                    notes = %withdrawal.notes,
                    "Cash dispensed"
                );
            }
            Err(e) => {
                in_flight.failed(e.kind());
                warn!(account = %account, error = %e, code = e.error_code(), "Dispense failed");
            }
        }

        result
    }

    /// Balance of the account, straight from the account service.
    #[instrument(skip(self, pin), fields(atm_id = %self.atm_id))]
    pub async fn balance(&self, account: &AccountNumber, pin: &Pin) -> Result<AccountBalance> {
        info!(account = %account, "Get balance");
        self.metrics.balance_queried();
        self.call_remote("balance", self.accounts.balance(account, pin))
            .await
    }

    /// The note inventory.
    pub fn inventory(&self) -> &Arc<DenominationInventory> {
        &self.inventory
    }

    /// Value of notes on hand.
    pub fn total_cash(&self) -> u64 {
        self.inventory.total_cash()
    }

    /// Metrics.
    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// ATM identifier.
    pub fn atm_id(&self) -> &str {
        &self.atm_id
    }

    // --- Private methods ---

    async fn run_dispense(
        &self,
        account: &AccountNumber,
        pin: &Pin,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        let units = whole_units(amount)?;
        let notes = self.inventory.allocate(units)?;
        let pending = PendingAllocation::new(&self.inventory, &self.metrics, notes);

        let debit = self
            .call_remote(
                "withdraw",
                self.accounts.withdraw(account, pin, Decimal::from(units)),
            )
            .await;

        if let Err(e) = debit {
            error!(
                account = %account,
                amount = units,
                error = %e,
                "Error during withdraw, refunding cash to inventory"
            );
            pending.refund();
            return Err(e);
        }

        Ok(Withdrawal {
            id: WithdrawalId::new(),
            account_number: account.clone(),
            amount: units,
            notes: pending.commit(),
            completed_at: Utc::now(),
        })
    }

    async fn call_remote<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AtmError::Timeout(format!(
                "{} did not complete within {}ms",
                operation,
                self.remote_timeout.as_millis()
            ))),
        }
    }
}
