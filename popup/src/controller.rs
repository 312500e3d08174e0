//! Converter session: owns the rate table, field layout and field values.

use std::sync::Arc;

use ratepivot_common::CurrencyCode;
use ratepivot_fx::conversion::is_convertible;
use ratepivot_fx::{
    format, parse_amount, recompute, FieldValue, LoadStatus, RateLoader, RateOrigin, RateTable,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::field_config::{FieldConfig, Variant, CONFIG_KEY};
use crate::store::KeyValueStore;

/// What the rendering surface shows for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldView {
    /// Zero-based slot index.
    pub index: usize,
    pub currency: CurrencyCode,
    /// Select label, e.g. `USD - US Dollar`.
    pub label: String,
    /// Two-decimal amount; empty when the field has no value.
    pub primary: String,
    /// Lakh notation, shown only when present.
    pub secondary: Option<String>,
}

/// Session controller the UI layer drives.
///
/// The rate table and the field layout are only ever replaced wholesale, so
/// a recompute never sees a half-updated snapshot.
pub struct PopupController {
    store: Arc<dyn KeyValueStore>,
    loader: RateLoader,
    variant: Variant,
    fields: FieldConfig,
    rates: Arc<RateTable>,
    origin: Option<RateOrigin>,
    values: Vec<FieldValue>,
    last_edit: Option<usize>,
}

impl PopupController {
    /// Create a session. Rates start empty until [`Self::load_rates`]
    /// completes, so early edits convert 1:1.
    pub fn new(store: Arc<dyn KeyValueStore>, loader: RateLoader, variant: Variant) -> Self {
        let fields = FieldConfig::resolve(store.as_ref(), variant);
        let values = vec![None; fields.len()];
        Self {
            store,
            loader,
            variant,
            fields,
            rates: Arc::new(RateTable::new()),
            origin: None,
            values,
            last_edit: None,
        }
    }

    /// Load rates, swap in the new table and redo the last conversion.
    pub async fn load_rates(&mut self) -> RateOrigin {
        let loaded = self.loader.load().await;
        self.rates = Arc::new(loaded.table);
        self.origin = Some(loaded.origin.clone());
        self.rerun_last_edit();
        loaded.origin
    }

    /// Handle text typed into field `index`.
    ///
    /// The field keeps whatever was typed; other fields only change when the
    /// text is a positive number.
    pub fn on_field_edited(&mut self, index: usize, raw: &str) -> Vec<FieldView> {
        if index >= self.values.len() {
            debug!(index, fields = self.values.len(), "Edit for unknown field ignored");
            return self.render();
        }

        let value = parse_amount(raw);
        self.values[index] = value;
        self.last_edit = Some(index);

        if is_convertible(value) {
            self.values = recompute(self.fields.slots(), &self.rates, &self.values, index);
        } else {
            debug!(index, raw, "Ignoring edit without a positive amount");
        }
        self.render()
    }

    /// React to a storage change notification.
    ///
    /// Returns whether the field layout was re-resolved.
    pub fn on_storage_changed(&mut self, key: &str) -> bool {
        if key != CONFIG_KEY {
            return false;
        }

        self.fields = FieldConfig::resolve(self.store.as_ref(), self.variant);
        self.values.resize(self.fields.len(), None);
        if self.last_edit.is_some_and(|i| i >= self.fields.len()) {
            // The edited field is gone; the remaining values all share its
            // USD pivot, so any of them can drive the refresh.
            self.last_edit = self.values.iter().position(|v| is_convertible(*v));
        }
        info!(fields = self.fields.len(), "Field layout changed");

        self.rerun_last_edit();
        true
    }

    /// Subscribe to storage changes for the UI loop.
    pub fn storage_changes(&self) -> broadcast::Receiver<String> {
        self.store.subscribe()
    }

    /// Current view of every field.
    pub fn render(&self) -> Vec<FieldView> {
        self.fields
            .slots()
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(index, (currency, value))| {
                let (primary, secondary) = match value {
                    Some(v) => {
                        let formatted = format(*v, currency);
                        (formatted.primary, formatted.secondary)
                    }
                    None => (String::new(), None),
                };
                FieldView {
                    index,
                    currency: currency.clone(),
                    label: currency.label(),
                    primary,
                    secondary,
                }
            })
            .collect()
    }

    /// Loading and error indicators.
    pub fn status(&self) -> LoadStatus {
        self.loader.status()
    }

    pub fn fields(&self) -> &FieldConfig {
        &self.fields
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Current rate snapshot.
    pub fn rates(&self) -> Arc<RateTable> {
        Arc::clone(&self.rates)
    }

    /// Origin of the current rates, if any load has finished.
    pub fn origin(&self) -> Option<&RateOrigin> {
        self.origin.as_ref()
    }

    fn rerun_last_edit(&mut self) {
        if let Some(index) = self.last_edit {
            self.values = recompute(self.fields.slots(), &self.rates, &self.values, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use ratepivot_fx::provider::{MockRateSource, MockResponse};
    use ratepivot_fx::RateLoaderConfig;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn controller(store: Arc<MemoryStore>, source: Arc<MockRateSource>) -> PopupController {
        let loader = RateLoader::new(
            source,
            RateLoaderConfig {
                endpoints: vec!["primary".to_string(), "mirror".to_string()],
                ..Default::default()
            },
        );
        PopupController::new(store, loader, Variant::Standard)
    }

    fn live_source() -> Arc<MockRateSource> {
        let source = Arc::new(MockRateSource::new());
        source.respond(
            "primary",
            MockResponse::Json(json!({ "usd": { "dkk": 6.5, "inr": 80, "eur": 0.9 } })),
        );
        source
    }

    #[tokio::test]
    async fn test_edit_updates_other_fields() {
        let mut popup = controller(Arc::new(MemoryStore::new()), live_source());
        popup.load_rates().await;

        let views = popup.on_field_edited(0, "2000");

        assert_eq!(views.len(), 3);
        assert_eq!(views[0].label, "USD - US Dollar");
        assert_eq!(views[1].primary, "13000.00");
        assert_eq!(views[2].primary, "160000.00");
        assert_eq!(views[2].secondary.as_deref(), Some("1.60 Lakh"));
        assert_eq!(views[1].secondary, None);
    }

    #[tokio::test]
    async fn test_cleared_field_keeps_others() {
        let mut popup = controller(Arc::new(MemoryStore::new()), live_source());
        popup.load_rates().await;
        popup.on_field_edited(0, "10");

        let views = popup.on_field_edited(0, "");

        assert_eq!(views[0].primary, "");
        assert_eq!(views[1].primary, "65.00");
        assert_eq!(views[2].primary, "800.00");
    }

    #[tokio::test]
    async fn test_rates_arriving_rerun_last_edit() {
        let mut popup = controller(Arc::new(MemoryStore::new()), live_source());

        // Before any load every rate degrades to 1.
        popup.on_field_edited(1, "65");
        assert_eq!(popup.values()[0], Some(dec!(65)));

        popup.load_rates().await;

        assert_eq!(popup.values()[0], Some(dec!(10)));
        assert_eq!(popup.values()[2], Some(dec!(800)));
        assert!(matches!(popup.origin(), Some(RateOrigin::Remote { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_rates_raise_error() {
        let mut popup = controller(Arc::new(MemoryStore::new()), Arc::new(MockRateSource::new()));

        let origin = popup.load_rates().await;

        assert_eq!(origin, RateOrigin::Fallback);
        assert!(popup.status().error);
        assert_eq!(popup.on_field_edited(0, "1")[2].primary, "74.50");
    }

    #[tokio::test]
    async fn test_storage_change_reresolves_layout() {
        let store = Arc::new(MemoryStore::new());
        let mut popup = controller(store.clone(), live_source());
        let mut changes = popup.storage_changes();
        popup.load_rates().await;
        popup.on_field_edited(0, "100");

        let layout = FieldConfig::new(
            ["usd", "eur", "inr", "eur"].iter().map(CurrencyCode::new).collect(),
        )
        .unwrap();
        layout.save(store.as_ref()).unwrap();

        let key = changes.recv().await.unwrap();
        assert!(popup.on_storage_changed(&key));

        let views = popup.render();
        assert_eq!(views.len(), 4);
        assert_eq!(views[1].primary, "90.00");
        assert_eq!(views[3].primary, "90.00");
    }

    #[tokio::test]
    async fn test_shrinking_layout_repivots_remaining_fields() {
        let store = Arc::new(MemoryStore::new());
        let mut popup = controller(store.clone(), live_source());
        popup.load_rates().await;
        popup.on_field_edited(2, "8000");

        store
            .set(CONFIG_KEY, r#"{"numFields":2,"field1":"usd","field2":"eur"}"#)
            .unwrap();
        assert!(popup.on_storage_changed(CONFIG_KEY));

        assert_eq!(popup.values(), &[Some(dec!(100)), Some(dec!(90))]);
        popup.load_rates().await;
        assert_eq!(popup.values(), &[Some(dec!(100)), Some(dec!(90))]);
    }

    #[tokio::test]
    async fn test_other_keys_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let mut popup = controller(store.clone(), live_source());

        store.set("theme", "dark").unwrap();

        assert!(!popup.on_storage_changed("theme"));
        assert_eq!(popup.fields().len(), 3);
    }

    #[test]
    fn test_edit_out_of_range_is_ignored() {
        let mut popup = controller(Arc::new(MemoryStore::new()), live_source());
        let views = popup.on_field_edited(9, "5");
        assert!(views.iter().all(|v| v.primary.is_empty()));
    }
}
