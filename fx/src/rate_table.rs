//! USD-based rate table.

use std::collections::BTreeMap;

use ratepivot_common::CurrencyCode;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// Wrapper key some endpoints nest the mapping under.
const USD_WRAPPER_KEY: &str = "usd";

/// Rates expressed as "1 USD = N units of this currency".
///
/// `usd` itself is never stored; lookups treat it as exactly 1. A table is
/// built once and replaced wholesale, never merged into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateTable {
    rates: BTreeMap<CurrencyCode, Decimal>,
}

impl RateTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(code, rate)` pairs.
    ///
    /// `usd` entries and non-positive rates are dropped.
    pub fn from_rates<I, C>(rates: I) -> Self
    where
        I: IntoIterator<Item = (C, Decimal)>,
        C: Into<CurrencyCode>,
    {
        let rates = rates
            .into_iter()
            .map(|(code, rate)| (code.into(), rate))
            .filter(|(code, rate)| !code.is_usd() && *rate > Decimal::ZERO)
            .collect();
        Self { rates }
    }

    /// The embedded table used when every endpoint fails.
    ///
    /// Covers the currencies of both default field layouts, not the whole
    /// catalog.
    pub fn fallback() -> Self {
        Self::from_rates([
            ("eur", Decimal::new(85, 2)),
            ("gbp", Decimal::new(73, 2)),
            ("jpy", Decimal::new(110, 0)),
            ("aud", Decimal::new(135, 2)),
            ("cad", Decimal::new(125, 2)),
            ("chf", Decimal::new(92, 2)),
            ("cny", Decimal::new(645, 2)),
            ("inr", Decimal::new(745, 1)),
            ("dkk", Decimal::new(633, 2)),
        ])
    }

    /// Parse an endpoint payload.
    ///
    /// The mapping may be wrapped one level under `"usd"` or be the top-level
    /// object. After unwrapping it must be an object of numbers; a `"date"`
    /// field next to the wrapper is ignored.
    pub fn from_payload(payload: &Value) -> FxResult<Self> {
        let root = payload
            .as_object()
            .ok_or_else(|| FxError::Parse("payload is not a JSON object".to_string()))?;

        // A numeric `usd` entry belongs to a flat mapping; only an object
        // under that key is a wrapper.
        let mapping = match root.get(USD_WRAPPER_KEY) {
            Some(Value::Object(inner)) => inner,
            _ => root,
        };

        let mut rates = BTreeMap::new();
        for (code, value) in mapping {
            let number = value
                .as_f64()
                .ok_or_else(|| FxError::Parse(format!("rate for {code} is not a number")))?;

            match Decimal::from_f64(number) {
                Some(rate) if rate > Decimal::ZERO => {
                    let code = CurrencyCode::new(code);
                    if !code.is_usd() {
                        rates.insert(code, rate);
                    }
                }
                _ => debug!(currency = %code, rate = number, "Skipping unusable rate"),
            }
        }

        if rates.is_empty() {
            return Err(FxError::EmptyRates);
        }

        Ok(Self { rates })
    }

    /// Rate for a currency; `usd` is always `Some(1)`.
    pub fn get(&self, code: &CurrencyCode) -> Option<Decimal> {
        if code.is_usd() {
            return Some(Decimal::ONE);
        }
        self.rates.get(code).copied()
    }

    /// Rate for a currency, degrading to 1 when it is missing.
    pub fn rate_or_identity(&self, code: &CurrencyCode) -> Decimal {
        self.get(code).unwrap_or(Decimal::ONE)
    }

    /// Whether a rate is known (always true for `usd`).
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        code.is_usd() || self.rates.contains_key(code)
    }

    /// Number of stored rates, excluding the implicit `usd`.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Iterate stored rates in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, &Decimal)> {
        self.rates.iter()
    }
}
