//! Demo accounts opened on the simulated ledger.

use rand::Rng;
use rust_decimal::Decimal;

use cashpoint_common::{AccountNumber, Pin, Result};
use cashpoint_ledger::LedgerEngine;

/// An account the simulator can act on.
#[derive(Debug, Clone)]
pub struct DemoAccount {
    /// Account number.
    pub number: AccountNumber,
    /// Pin.
    pub pin: Pin,
    /// Opening balance.
    pub balance: Decimal,
    /// Overdraft limit.
    pub overdraft: Decimal,
}

/// Account factory for seeding the ledger.
pub struct AccountFactory;

impl AccountFactory {
    /// Fixed accounts used by the built-in scenarios.
    pub fn fixed() -> Vec<DemoAccount> {
        let accounts = [
            ("328762", "1234", 800, 200),
            ("100200", "4321", 200, 200),
            ("555001", "0000", 5000, 0),
        ];

        accounts
            .iter()
            .map(|&(number, pin, balance, overdraft)| DemoAccount {
                number: AccountNumber::new(number),
                pin: Pin::new(pin),
                balance: Decimal::from(balance),
                overdraft: Decimal::from(overdraft),
            })
            .collect()
    }

    /// Fixed accounts plus `extra` random ones.
    pub fn create_accounts<R: Rng>(extra: usize, rng: &mut R) -> Vec<DemoAccount> {
        let mut accounts = Self::fixed();

        for i in 0..extra {
            accounts.push(DemoAccount {
                number: AccountNumber::new(format!("9{:05}", i + 1)),
                pin: Pin::new(format!("{:04}", rng.gen_range(0..10_000))),
                balance: Decimal::from(rng.gen_range(0..2_000) * 5),
                overdraft: Decimal::from(rng.gen_range(0..5) * 100),
            });
        }

        accounts
    }

    /// Open every account on the ledger.
    pub fn open_all(ledger: &LedgerEngine, accounts: &[DemoAccount]) -> Result<()> {
        for account in accounts {
            ledger.open_account(
                account.number.clone(),
                account.pin.clone(),
                account.balance,
                account.overdraft,
            )?;
        }
        Ok(())
    }
}
