//! Cash and amount types.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AtmError, Result};

/// Face value of a physical note, in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Denomination(u32);

impl Denomination {
    pub const FIFTY: Denomination = Denomination(50);
    pub const TWENTY: Denomination = Denomination(20);
    pub const TEN: Denomination = Denomination(10);
    pub const FIVE: Denomination = Denomination(5);

    /// Create a denomination. Returns `None` for a zero face value.
    pub fn new(face_value: u32) -> Option<Self> {
        (face_value > 0).then_some(Self(face_value))
    }

    /// Face value in whole units.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Display name used in dispense responses.
    pub fn name(&self) -> String {
        match self.0 {
            5 => "FIVE".to_string(),
            10 => "TEN".to_string(),
            20 => "TWENTY".to_string(),
            50 => "FIFTY".to_string(),
            100 => "HUNDRED".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A number of notes of one denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCount {
    /// Note face value.
    pub denomination: Denomination,
    /// Number of notes.
    pub count: u32,
}

impl NoteCount {
    /// Create a new note count.
    pub fn new(denomination: Denomination, count: u32) -> Self {
        Self { denomination, count }
    }

    /// Total value of these notes.
    pub fn value(&self) -> u64 {
        u64::from(self.denomination.value()) * u64::from(self.count)
    }
}

/// Ordered notes handed out by an allocation or given back by a refund.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CashBundle {
    notes: Vec<NoteCount>,
}

impl CashBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self { notes: Vec::new() }
    }

    /// Append an entry, keeping insertion order.
    pub fn push(&mut self, denomination: Denomination, count: u32) {
        self.notes.push(NoteCount::new(denomination, count));
    }

    /// Total value of all notes in the bundle.
    pub fn total(&self) -> u64 {
        self.notes.iter().map(NoteCount::value).sum()
    }

    /// Total number of physical notes.
    pub fn note_count(&self) -> u64 {
        self.notes.iter().map(|n| u64::from(n.count)).sum()
    }

    /// Entries in order.
    pub fn notes(&self) -> &[NoteCount] {
        &self.notes
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = &NoteCount> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl From<Vec<NoteCount>> for CashBundle {
    fn from(notes: Vec<NoteCount>) -> Self {
        Self { notes }
    }
}

impl fmt::Display for CashBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .notes
            .iter()
            .map(|n| format!("{}x{}", n.count, n.denomination))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Convert a requested decimal amount into whole currency units.
///
/// The amount must be positive, carry no fractional part and fit in a `u32`.
pub fn whole_units(amount: Decimal) -> Result<u32> {
    if amount <= Decimal::ZERO {
        return Err(AtmError::InvalidAmount {
            amount,
            reason: "amount must be positive".to_string(),
        });
    }

    if !amount.fract().is_zero() {
        return Err(AtmError::InvalidAmount {
            amount,
            reason: "amount must be a whole number of units".to_string(),
        });
    }

    amount.trunc().to_u32().ok_or_else(|| AtmError::InvalidAmount {
        amount,
        reason: "amount is too large".to_string(),
    })
}
