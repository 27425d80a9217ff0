//! Cashpoint Common Types
//!
//! This crate contains shared types used across the Cashpoint ATM services,
//! including identifiers, cash and amount types, wire DTOs and the error
//! taxonomy.

pub mod identifiers;
pub mod monetary;
pub mod dto;
pub mod error;

pub use identifiers::*;
pub use monetary::*;
pub use dto::*;
pub use error::*;
