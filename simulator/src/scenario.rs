//! Simulation scenarios.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cashpoint_common::{ErrorKind, TransactionRequest};

use crate::faults::FaultType;

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Withdraw cash at the ATM.
    Withdraw {
        account: String,
        pin: String,
        #[serde(flatten)]
        request: TransactionRequest,
        /// Error kind the withdrawal must fail with; `None` means it must succeed.
        #[serde(default)]
        expect_error: Option<ErrorKind>,
    },
    /// Deposit through the account service.
    Deposit {
        account: String,
        pin: String,
        #[serde(flatten)]
        request: TransactionRequest,
        #[serde(default)]
        expect_error: Option<ErrorKind>,
    },
    /// Query a balance through the ATM.
    Balance { account: String, pin: String },
    /// Inject a fault on the account service.
    InjectFault { fault_type: FaultType },
    /// Clear the current fault.
    ClearFault,
    /// Concurrent withdrawals against one account.
    Rush {
        account: String,
        pin: String,
        withdrawals: usize,
        #[serde(flatten)]
        request: TransactionRequest,
    },
    /// Assert a condition.
    Assert { condition: AssertCondition },
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssertCondition {
    /// Cash left in the ATM.
    TotalCash { amount: u64 },
    /// Ledger balance of an account.
    AccountBalance { account: String, balance: Decimal },
}

impl Scenario {
    /// Load a built-in scenario by name, or a JSON scenario file.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "happy-path" => Ok(Self::happy_path()),
            "insufficient-funds" => Ok(Self::insufficient_funds()),
            "ledger-outage" => Ok(Self::ledger_outage()),
            "rush" => Ok(Self::rush()),
            path if path.ends_with(".json") => Self::from_file(path),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Read a scenario from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Names of the built-in scenarios.
    pub fn builtin_names() -> &'static [&'static str] {
        &["happy-path", "insufficient-funds", "ledger-outage", "rush"]
    }

    /// Withdraw, check the balance, withdraw again.
    fn happy_path() -> Self {
        Self {
            name: "happy-path".to_string(),
            description: "Two successful withdrawals from a funded account".to_string(),
            steps: vec![
                withdraw("328762", "1234", 500, None),
                assert_balance("328762", 300),
                ScenarioStep::Balance {
                    account: "328762".to_string(),
                    pin: "1234".to_string(),
                },
                withdraw("328762", "1234", 245, None),
                assert_balance("328762", 55),
                ScenarioStep::Assert {
                    condition: AssertCondition::TotalCash { amount: 755 },
                },
            ],
        }
    }

    /// Rejections that must leave the ATM untouched.
    fn insufficient_funds() -> Self {
        Self {
            name: "insufficient-funds".to_string(),
            description: "Rejected withdrawals leave the ATM and the ledger untouched".to_string(),
            steps: vec![
                withdraw("100200", "4321", 450, Some(ErrorKind::Rejected)),
                withdraw("100200", "9999", 50, Some(ErrorKind::Rejected)),
                withdraw("000000", "1234", 50, Some(ErrorKind::NotFound)),
                withdraw("100200", "4321", 143, Some(ErrorKind::Rejected)),
                withdraw("555001", "0000", 2000, Some(ErrorKind::Rejected)),
                assert_balance("100200", 200),
                ScenarioStep::Assert {
                    condition: AssertCondition::TotalCash { amount: 1500 },
                },
                withdraw("100200", "4321", 400, None),
                assert_balance("100200", -200),
            ],
        }
    }

    /// Account service outage and recovery.
    fn ledger_outage() -> Self {
        Self {
            name: "ledger-outage".to_string(),
            description: "Withdrawals during an outage are refunded".to_string(),
            steps: vec![
                ScenarioStep::InjectFault {
                    fault_type: FaultType::LedgerOffline,
                },
                withdraw("328762", "1234", 100, Some(ErrorKind::Unavailable)),
                withdraw("555001", "0000", 300, Some(ErrorKind::Unavailable)),
                ScenarioStep::Deposit {
                    account: "328762".to_string(),
                    pin: "1234".to_string(),
                    request: TransactionRequest::new(Decimal::from(100)),
                    expect_error: Some(ErrorKind::Unavailable),
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::TotalCash { amount: 1500 },
                },
                ScenarioStep::InjectFault {
                    fault_type: FaultType::LedgerError,
                },
                withdraw("328762", "1234", 60, Some(ErrorKind::Unavailable)),
                ScenarioStep::ClearFault,
                ScenarioStep::InjectFault {
                    fault_type: FaultType::Latency { delay_ms: 20 },
                },
                withdraw("328762", "1234", 100, None),
                ScenarioStep::ClearFault,
                assert_balance("328762", 700),
                ScenarioStep::Assert {
                    condition: AssertCondition::TotalCash { amount: 1400 },
                },
            ],
        }
    }

    /// Many concurrent withdrawals draining the fifties and twenties.
    fn rush() -> Self {
        Self {
            name: "rush".to_string(),
            description: "Concurrent withdrawals compete for the same notes".to_string(),
            steps: vec![
                ScenarioStep::Deposit {
                    account: "555001".to_string(),
                    pin: "0000".to_string(),
                    request: TransactionRequest::new(Decimal::from(1000)),
                    expect_error: None,
                },
                ScenarioStep::Rush {
                    account: "555001".to_string(),
                    pin: "0000".to_string(),
                    withdrawals: 40,
                    request: TransactionRequest::new(Decimal::from(50)),
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::TotalCash { amount: 0 },
                },
                assert_balance("555001", 4500),
            ],
        }
    }
}

fn withdraw(account: &str, pin: &str, amount: i64, expect_error: Option<ErrorKind>) -> ScenarioStep {
    ScenarioStep::Withdraw {
        account: account.to_string(),
        pin: pin.to_string(),
        request: TransactionRequest::new(Decimal::from(amount)),
        expect_error,
    }
}

fn assert_balance(account: &str, balance: i64) -> ScenarioStep {
    ScenarioStep::Assert {
        condition: AssertCondition::AccountBalance {
            account: account.to_string(),
            balance: Decimal::from(balance),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_load() {
        for name in Scenario::builtin_names() {
            let scenario = Scenario::load(name).unwrap();
            assert_eq!(scenario.name, *name);
            assert!(!scenario.steps.is_empty());
        }
        assert!(Scenario::load("nope").is_err());
    }

    #[test]
    fn test_scenario_from_json() {
        let raw = r#"{
            "name": "custom",
            "description": "from a file",
            "steps": [
                { "Withdraw": { "account": "328762", "pin": "1234", "amount": "60" } },
                { "InjectFault": { "fault_type": { "Latency": { "delay_ms": 5 } } } },
                "ClearFault",
                { "Assert": { "condition": { "TotalCash": { "amount": 1440 } } } }
            ]
        }"#;

        let scenario: Scenario = serde_json::from_str(raw).unwrap();
        assert_eq!(scenario.steps.len(), 4);
        match &scenario.steps[0] {
            ScenarioStep::Withdraw {
                request,
                expect_error: None,
                ..
            } => assert_eq!(request.whole_units().unwrap(), 60),
            other => panic!("unexpected step {:?}", other),
        }
        assert!(matches!(scenario.steps[2], ScenarioStep::ClearFault));
    }
}
