//! Request and response bodies exchanged with callers and the account service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{whole_units, CashBundle, Result};

/// Amount for a withdraw, deposit or dispense call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Amount in currency units.
    pub amount: Decimal,
}

impl TransactionRequest {
    /// Create a new request.
    pub fn new(amount: Decimal) -> Self {
        Self { amount }
    }

    /// Amount as whole units, rejecting fractional or non-positive values.
    pub fn whole_units(&self) -> Result<u32> {
        whole_units(self.amount)
    }
}

/// Balance and overdraft of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    /// Current balance. Negative when the account is overdrawn.
    pub balance: Decimal,
    /// Credit limit below zero.
    pub overdraft: Decimal,
}

impl AccountBalance {
    /// Funds that can still be withdrawn.
    pub fn available(&self) -> Decimal {
        self.balance + self.overdraft
    }
}

/// Notes of one type in a dispense response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashDispensed {
    /// Note name, e.g. `FIFTY`.
    #[serde(rename = "type")]
    pub note_type: String,
    /// Number of notes.
    pub total: u32,
}

/// Body returned for a successful dispense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseResponse {
    /// Amount handed out.
    pub dispensed_cash: u32,
    /// Notes handed out, largest first.
    pub notes: Vec<CashDispensed>,
}

impl DispenseResponse {
    /// Build the response body for a dispensed bundle.
    pub fn new(dispensed_cash: u32, notes: &CashBundle) -> Self {
        Self {
            dispensed_cash,
            notes: notes
                .iter()
                .map(|n| CashDispensed {
                    note_type: n.denomination.name(),
                    total: n.count,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Denomination;
    use rust_decimal_macros::dec;

    #[test]
    fn test_available_includes_overdraft() {
        let balance = AccountBalance {
            balance: dec!(-150),
            overdraft: dec!(200),
        };
        assert_eq!(balance.available(), dec!(50));
    }

    #[test]
    fn test_transaction_request_from_json() {
        let request: TransactionRequest = serde_json::from_str(r#"{"amount":"245"}"#).unwrap();
        assert_eq!(request.whole_units().unwrap(), 245);
    }

    #[test]
    fn test_dispense_response_shape() {
        let mut notes = CashBundle::new();
        notes.push(Denomination::FIFTY, 10);
        notes.push(Denomination::TWENTY, 5);

        let response = DispenseResponse::new(600, &notes);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["dispensedCash"], 600);
        assert_eq!(json["notes"][0]["type"], "FIFTY");
        assert_eq!(json["notes"][0]["total"], 10);
        assert_eq!(json["notes"][1]["type"], "TWENTY");
        assert_eq!(json["notes"][1]["total"], 5);
    }
}
