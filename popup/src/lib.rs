//! RatePivot Popup
//!
//! The session layer around the FX core: resolves which currency fields are
//! shown, keeps their values in sync as the user types, and reacts to the
//! field layout being changed from elsewhere.

pub mod config;
pub mod controller;
pub mod field_config;
pub mod store;

pub use config::AppConfig;
pub use controller::{FieldView, PopupController};
pub use field_config::{FieldConfig, Variant, CONFIG_KEY};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
