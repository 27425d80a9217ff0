//! Simulation controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, ensure};
use futures::future::join_all;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use cashpoint_common::{AccountNumber, ErrorKind, ErrorResponse, Pin, Result as AtmResult};
use cashpoint_coordinator::{AccountService, AtmConfig, LedgerClient, Withdrawal, WithdrawalCoordinator};
use cashpoint_ledger::journal::total_debits;
use cashpoint_ledger::LedgerEngine;

use crate::accounts::{AccountFactory, DemoAccount};
use crate::faults::FaultyAccountService;
use crate::metrics::SimulationMetrics;
use crate::scenario::{AssertCondition, Scenario, ScenarioStep};

/// Controls the simulation.
pub struct SimulationController {
    /// Simulation speed multiplier.
    speed: f64,
    /// Random number generator.
    rng: Mutex<StdRng>,
    /// Accounts opened on the ledger.
    accounts: Vec<DemoAccount>,
    /// Ledger behind the account service.
    ledger: Arc<LedgerEngine>,
    /// Account service with fault injection.
    faults: Arc<FaultyAccountService>,
    /// The ATM under test.
    atm: Arc<WithdrawalCoordinator>,
    /// Cash loaded at start.
    initial_cash: u64,
    /// Simulation metrics.
    metrics: Arc<Mutex<SimulationMetrics>>,
    /// Running flag.
    running: Arc<AtomicBool>,
}

impl SimulationController {
    /// Create a new simulation controller with a freshly loaded ATM.
    pub fn new(config: &AtmConfig, extra_accounts: usize, speed: f64, seed: Option<u64>) -> anyhow::Result<Self> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let ledger = Arc::new(LedgerEngine::new());
        let accounts = AccountFactory::create_accounts(extra_accounts, &mut rng);
        AccountFactory::open_all(&ledger, &accounts)?;
        info!(accounts = accounts.len(), "Ledger seeded");

        let faults = Arc::new(FaultyAccountService::new(Arc::new(LedgerClient::new(ledger.clone()))));
        let service: Arc<dyn AccountService> = faults.clone();
        let atm = Arc::new(WithdrawalCoordinator::new(config, service)?);
        let initial_cash = atm.total_cash();
        info!(atm_id = atm.atm_id(), cash = initial_cash, levels = %atm.inventory().levels(), "ATM loaded");

        Ok(Self {
            speed,
            rng: Mutex::new(rng),
            accounts,
            ledger,
            faults,
            atm,
            initial_cash,
            metrics: Arc::new(Mutex::new(SimulationMetrics::new())),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Run a scenario, then check that cash was conserved.
    pub async fn run_scenario(&self, scenario: &Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        self.running.store(true, Ordering::SeqCst);

        for (index, step) in scenario.steps.iter().enumerate() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.execute_step(step)
                .await
                .map_err(|e| anyhow::anyhow!("step {} of '{}' failed: {}", index + 1, scenario.name, e))?;
        }

        self.running.store(false, Ordering::SeqCst);
        self.faults.clear();

        self.check_conservation()
    }

    /// Run random withdrawals until the duration elapses or Ctrl+C.
    pub async fn run(&self, duration: Option<Duration>) -> anyhow::Result<()> {
        info!("Running simulation in continuous mode");

        self.running.store(true, Ordering::SeqCst);

        let generator = async {
            while self.running.load(Ordering::SeqCst) {
                let (account, amount) = {
                    let mut rng = self.rng.lock();
                    let account = self.accounts[rng.gen_range(0..self.accounts.len())].clone();
                    let amount = Decimal::from(rng.gen_range(1..=40) * 5);
                    (account, amount)
                };

                let _ = self.withdraw(&account.number, &account.pin, amount).await;

                if self.atm.total_cash() == 0 {
                    info!("ATM is empty");
                    break;
                }

                let delay = Duration::from_millis((1000.0 / self.speed) as u64);
                tokio::time::sleep(delay).await;
            }
        };

        match duration {
            Some(d) => {
                let _ = tokio::time::timeout(d, generator).await;
            }
            None => {
                tokio::select! {
                    _ = generator => {}
                    signal = tokio::signal::ctrl_c() => signal?,
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);

        self.check_conservation()
    }

    /// Get simulation metrics.
    pub fn get_metrics(&self) -> SimulationMetrics {
        self.metrics.lock().clone()
    }

    /// The ATM under test.
    pub fn atm(&self) -> &Arc<WithdrawalCoordinator> {
        &self.atm
    }

    // --- Private methods ---

    /// Execute a single scenario step.
    async fn execute_step(&self, step: &ScenarioStep) -> anyhow::Result<()> {
        match step {
            ScenarioStep::Withdraw {
                account,
                pin,
                request,
                expect_error,
            } => {
                let result = self
                    .withdraw(&AccountNumber::new(account.as_str()), &Pin::new(pin.as_str()), request.amount)
                    .await
                    .map(|w| w.notes.to_string());
                expect_outcome(result, expect_error)?;
            }
            ScenarioStep::Deposit {
                account,
                pin,
                request,
                expect_error,
            } => {
                let result = self
                    .faults
                    .deposit(&AccountNumber::new(account.as_str()), &Pin::new(pin.as_str()), request.amount)
                    .await;
                if result.is_ok() {
                    info!(account = %account, amount = %request.amount, "Deposit");
                }
                expect_outcome(result.map(|()| format!("deposit of {}", request.amount)), expect_error)?;
            }
            ScenarioStep::Balance { account, pin } => {
                let balance = self
                    .atm
                    .balance(&AccountNumber::new(account.as_str()), &Pin::new(pin.as_str()))
                    .await?;
                info!(
                    account = %account,
                    balance = %balance.balance,
                    overdraft = %balance.overdraft,
                    "Balance"
                );
            }
            ScenarioStep::InjectFault { fault_type } => {
                info!("Injecting fault {:?}", fault_type);
                self.faults.inject(*fault_type);
            }
            ScenarioStep::ClearFault => {
                info!("Clearing fault");
                self.faults.clear();
            }
            ScenarioStep::Rush {
                account,
                pin,
                withdrawals,
                request,
            } => {
                let number = AccountNumber::new(account.as_str());
                let pin = Pin::new(pin.as_str());
                let amount = request.amount;
                info!(account = %account, withdrawals, amount = %amount, "Rush");

                let (number, pin) = (&number, &pin);
                let results = join_all((0..*withdrawals).map(move |_| self.withdraw(number, pin, amount))).await;
                let succeeded = results.iter().filter(|r| r.is_ok()).count();
                info!(succeeded, failed = withdrawals - succeeded, "Rush finished");
            }
            ScenarioStep::Assert { condition } => {
                info!("Asserting condition: {:?}", condition);
                self.check(condition)?;
            }
        }

        Ok(())
    }

    async fn withdraw(&self, account: &AccountNumber, pin: &Pin, amount: Decimal) -> AtmResult<Withdrawal> {
        let start = Instant::now();
        let result = self.atm.dispense(account, pin, amount).await;
        let latency = start.elapsed().as_millis() as u64;

        let mut metrics = self.metrics.lock();
        match &result {
            Ok(withdrawal) => metrics.record_success(u64::from(withdrawal.amount), latency),
            Err(e) => {
                let response = serde_json::to_string(&ErrorResponse::from(e)).unwrap_or_default();
                if e.kind() == ErrorKind::Unavailable {
                    warn!(account = %account, response = %response, "Account service unavailable");
                } else {
                    debug!(account = %account, response = %response, "Withdrawal refused");
                }
                metrics.record_failure(latency);
            }
        }

        result
    }

    fn check(&self, condition: &AssertCondition) -> anyhow::Result<()> {
        match condition {
            AssertCondition::TotalCash { amount } => {
                let actual = self.atm.total_cash();
                ensure!(actual == *amount, "ATM holds {} but expected {}", actual, amount);
            }
            AssertCondition::AccountBalance { account, balance } => {
                let demo = self
                    .accounts
                    .iter()
                    .find(|a| a.number.as_str() == account)
                    .ok_or_else(|| anyhow::anyhow!("Unknown account: {}", account))?;
                let actual = self.ledger.balance(&demo.number, &demo.pin)?.balance;
                ensure!(
                    actual == *balance,
                    "Account {} holds {} but expected {}",
                    account,
                    actual,
                    balance
                );
            }
        }
        Ok(())
    }

    /// Cash removed from the ATM, cash reported dispensed, and withdrawals
    /// debited on the ledger must all agree.
    fn check_conservation(&self) -> anyhow::Result<()> {
        let removed = self.initial_cash - self.atm.total_cash();
        let dispensed = self.metrics.lock().cash_dispensed;

        let mut debited = Decimal::ZERO;
        for account in &self.accounts {
            debited += total_debits(&self.ledger.entries(&account.number)?);
        }

        ensure!(
            removed == dispensed,
            "ATM lost {} but withdrawals dispensed {}",
            removed,
            dispensed
        );
        ensure!(
            debited == Decimal::from(dispensed),
            "Ledger debited {} but withdrawals dispensed {}",
            debited,
            dispensed
        );

        info!(removed, debited = %debited, "Cash conserved");
        Ok(())
    }
}

/// Match a step result against the error kind it was expected to fail with.
fn expect_outcome(result: AtmResult<String>, expected: &Option<ErrorKind>) -> anyhow::Result<()> {
    match (result, expected) {
        (Ok(_), None) => Ok(()),
        (Err(e), Some(kind)) if e.kind() == *kind => Ok(()),
        (Ok(done), Some(kind)) => bail!("expected {:?} but completed {}", kind, done),
        (Err(e), expected) => bail!("expected {:?} but got {}", expected, e),
    }
}
