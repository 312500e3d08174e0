//! Resolution of the persisted currency-field layout.

use std::fmt;
use std::str::FromStr;

use ratepivot_common::{CurrencyCode, RatePivotError, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::store::KeyValueStore;

/// Storage key of the field layout blob.
pub const CONFIG_KEY: &str = "currencyConfig";

/// Most fields the popup shows.
pub const MAX_FIELDS: usize = 5;

/// Field count used when the stored one is missing or out of range.
pub const DEFAULT_FIELD_COUNT: usize = 3;

/// Deployment flavour; only changes the default currency of slot 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variant {
    /// usd, dkk, inr, eur, eur
    #[default]
    Standard,
    /// usd, eur, inr, eur, eur
    Simple,
}

impl Variant {
    /// Default currency for a zero-based slot index.
    pub fn default_slot(&self, index: usize) -> CurrencyCode {
        match (index, self) {
            (0, _) => CurrencyCode::usd(),
            (1, Variant::Standard) => CurrencyCode::dkk(),
            (1, Variant::Simple) => CurrencyCode::eur(),
            (2, _) => CurrencyCode::inr(),
            _ => CurrencyCode::eur(),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Standard => write!(f, "standard"),
            Variant::Simple => write!(f, "simple"),
        }
    }
}

impl FromStr for Variant {
    type Err = RatePivotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Variant::Standard),
            "simple" => Ok(Variant::Simple),
            other => Err(RatePivotError::Configuration(format!(
                "unknown variant '{other}', expected 'standard' or 'simple'"
            ))),
        }
    }
}

/// Ordered currency slots, one per visible field (1 to 5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConfig {
    slots: Vec<CurrencyCode>,
}

impl FieldConfig {
    /// Build a layout from explicit slots.
    pub fn new(slots: Vec<CurrencyCode>) -> Result<Self> {
        if slots.is_empty() || slots.len() > MAX_FIELDS {
            return Err(RatePivotError::Configuration(format!(
                "field count must be between 1 and {MAX_FIELDS}, got {}",
                slots.len()
            )));
        }
        if let Some(empty) = slots.iter().position(|c| c.as_str().is_empty()) {
            return Err(RatePivotError::Configuration(format!(
                "field {} has an empty currency code",
                empty + 1
            )));
        }
        Ok(Self { slots })
    }

    /// The layout used on first run.
    pub fn defaults(variant: Variant) -> Self {
        Self {
            slots: (0..DEFAULT_FIELD_COUNT)
                .map(|i| variant.default_slot(i))
                .collect(),
        }
    }

    /// Read the layout from the store, falling back to defaults when it is
    /// absent, unreadable or malformed.
    pub fn resolve(store: &dyn KeyValueStore, variant: Variant) -> Self {
        match store.get(CONFIG_KEY) {
            Ok(Some(blob)) => Self::from_blob(&blob, variant),
            Ok(None) => {
                debug!("No stored field layout, using defaults");
                Self::defaults(variant)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Could not read field layout, using defaults");
                Self::defaults(variant)
            }
        }
    }

    /// Parse a stored blob. Never fails; bad parts fall back per field.
    pub fn from_blob(blob: &str, variant: Variant) -> Self {
        match serde_json::from_str::<Value>(blob) {
            Ok(Value::Object(map)) => Self::from_map(&map, variant),
            Ok(_) | Err(_) => {
                warn!("Stored field layout is not a JSON object, using defaults");
                Self::defaults(variant)
            }
        }
    }

    fn from_map(map: &Map<String, Value>, variant: Variant) -> Self {
        let count = map
            .get("numFields")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .filter(|n| (1..=MAX_FIELDS).contains(n))
            .unwrap_or_else(|| {
                if let Some(raw) = map.get("numFields") {
                    warn!(num_fields = %raw, "Field count out of range, using default");
                }
                DEFAULT_FIELD_COUNT
            });

        let slots = (0..count)
            .map(|i| {
                map.get(&format!("field{}", i + 1))
                    .and_then(Value::as_str)
                    .map(CurrencyCode::new)
                    .filter(|code| !code.as_str().is_empty())
                    .unwrap_or_else(|| variant.default_slot(i))
            })
            .collect();

        Self { slots }
    }

    /// Serialize as `{numFields, field1..fieldN}`, the shape the settings
    /// page writes.
    pub fn to_blob(&self) -> String {
        let mut map = Map::new();
        map.insert("numFields".to_string(), Value::from(self.slots.len()));
        for (i, code) in self.slots.iter().enumerate() {
            map.insert(format!("field{}", i + 1), Value::from(code.as_str()));
        }
        Value::Object(map).to_string()
    }

    /// Persist this layout, notifying every open session.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.set(CONFIG_KEY, &self.to_blob())
    }

    pub fn slots(&self) -> &[CurrencyCode] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; a layout has at least one field.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn codes(list: &[&str]) -> Vec<CurrencyCode> {
        list.iter().map(CurrencyCode::new).collect()
    }

    #[test]
    fn test_absent_blob_uses_defaults() {
        let store = MemoryStore::new();

        let standard = FieldConfig::resolve(&store, Variant::Standard);
        assert_eq!(standard.slots(), codes(&["usd", "dkk", "inr"]).as_slice());

        let simple = FieldConfig::resolve(&store, Variant::Simple);
        assert_eq!(simple.slots(), codes(&["usd", "eur", "inr"]).as_slice());
    }

    #[test]
    fn test_full_blob() {
        let blob = r#"{"numFields":5,"field1":"gbp","field2":"JPY","field3":"inr","field4":"sek","field5":"gbp"}"#;
        let config = FieldConfig::from_blob(blob, Variant::Standard);
        assert_eq!(
            config.slots(),
            codes(&["gbp", "jpy", "inr", "sek", "gbp"]).as_slice()
        );
    }

    #[test]
    fn test_missing_fields_use_slot_defaults() {
        let config = FieldConfig::from_blob(r#"{"numFields":5,"field1":"gbp"}"#, Variant::Standard);
        assert_eq!(
            config.slots(),
            codes(&["gbp", "dkk", "inr", "eur", "eur"]).as_slice()
        );

        let config = FieldConfig::from_blob(r#"{"field2":"","field3":7}"#, Variant::Simple);
        assert_eq!(config.slots(), codes(&["usd", "eur", "inr"]).as_slice());
    }

    #[test]
    fn test_out_of_range_count_uses_default() {
        for raw in ["7", "0", "-1", "2.5", "\"4\"", "null"] {
            let blob = format!(r#"{{"numFields":{raw},"field1":"gbp"}}"#);
            let config = FieldConfig::from_blob(&blob, Variant::Standard);
            assert_eq!(config.len(), DEFAULT_FIELD_COUNT, "numFields = {raw}");
            assert_eq!(config.slots()[0], CurrencyCode::new("gbp"));
        }
    }

    #[test]
    fn test_malformed_blob_uses_defaults() {
        for blob in ["not json", "[1,2]", "\"x\"", ""] {
            assert_eq!(
                FieldConfig::from_blob(blob, Variant::Standard),
                FieldConfig::defaults(Variant::Standard)
            );
        }
    }

    #[test]
    fn test_unknown_code_is_kept() {
        let config = FieldConfig::from_blob(r#"{"numFields":1,"field1":"xau"}"#, Variant::Standard);
        assert_eq!(config.slots(), codes(&["xau"]).as_slice());
    }

    #[test]
    fn test_save_then_resolve() {
        let store = MemoryStore::new();
        let config = FieldConfig::new(codes(&["eur", "usd"])).unwrap();

        config.save(&store).unwrap();

        let blob = store.get(CONFIG_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["numFields"], 2);
        assert_eq!(value["field1"], "eur");
        assert!(value.get("field3").is_none());
        assert_eq!(FieldConfig::resolve(&store, Variant::Standard), config);
    }

    #[test]
    fn test_new_validates_count() {
        assert!(FieldConfig::new(vec![]).is_err());
        assert!(FieldConfig::new(codes(&["usd"; 6])).is_err());
        assert!(FieldConfig::new(codes(&["usd", " "])).is_err());
        assert!(FieldConfig::new(codes(&["usd"; 5])).is_ok());
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("Simple".parse::<Variant>().unwrap(), Variant::Simple);
        assert!("fancy".parse::<Variant>().is_err());
        assert_eq!(Variant::default().to_string(), "standard");
    }
}
