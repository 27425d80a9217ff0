//! Cashpoint ATM Coordinator
//!
//! The coordinator hands out physical notes and debits the customer's account
//! through the account service. Cash is allocated first and refunded if the
//! debit fails, so the machine never gives out notes for an undebited
//! account and never loses track of allocated notes.

pub mod coordinator;
pub mod config;
pub mod client;
pub mod inventory;
pub mod metrics;

pub use coordinator::{Withdrawal, WithdrawalCoordinator};
pub use config::{AtmConfig, CassetteConfig, InventoryConfig};
pub use client::{AccountService, LedgerClient};
pub use inventory::DenominationInventory;
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
