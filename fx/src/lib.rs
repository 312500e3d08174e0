//! RatePivot FX
//!
//! USD-based exchange rates and multi-field currency conversion.
//!
//! # Features
//!
//! - Ordered endpoint fallback with an embedded last-resort rate table
//! - Pivot-through-USD recomputation of any number of currency fields
//! - Two-decimal display formatting with Lakh notation for Rupees
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ratepivot_fx::{recompute, HttpRateSource, RateLoader, RateLoaderConfig};
//!
//! let source = Arc::new(HttpRateSource::new(Duration::from_secs(10))?);
//! let loader = RateLoader::new(source, RateLoaderConfig::default());
//! let rates = loader.load().await.table;
//!
//! let values = recompute(&slots, &rates, &values, edited_index);
//! ```

pub mod conversion;
pub mod error;
pub mod format;
pub mod loader;
pub mod provider;
pub mod rate_table;

pub use conversion::{convert_pair, parse_amount, recompute, FieldValue};
pub use error::{FxError, FxResult};
pub use format::{format, FormattedAmount};
pub use loader::{LoadStatus, LoadedRates, RateLoader, RateLoaderConfig, RateOrigin};
pub use provider::{HttpRateSource, RateSource};
pub use rate_table::RateTable;
