//! RatePivot Common Types
//!
//! Shared types used across RatePivot: currency codes, the catalog of
//! known currencies, and the storage/configuration error type.

pub mod currency;
pub mod error;

pub use currency::*;
pub use error::*;
