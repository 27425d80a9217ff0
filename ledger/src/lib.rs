//! Cashpoint Ledger Engine
//!
//! Account ledger that authorizes and applies withdrawals and deposits,
//! enforcing each account's overdraft limit.

pub mod engine;
pub mod account;
pub mod journal;

pub use engine::LedgerEngine;
pub use account::Account;
pub use journal::{JournalEntry, EntryType};
