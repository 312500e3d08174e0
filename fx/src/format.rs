//! Display formatting for converted amounts.

use ratepivot_common::CurrencyCode;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::conversion::round_display;

/// One Lakh (100,000).
pub const LAKH: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Prompt shown by the two-select layout when no conversion is possible.
pub const PROMPT_TEXT: &str = "Enter amount and select currencies";

/// Formatted amount with an optional secondary notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedAmount {
    /// Two-decimal fixed notation, e.g. `250000.00`.
    pub primary: String,
    /// Lakh notation for large Rupee amounts, e.g. `2.50 Lakh`.
    pub secondary: Option<String>,
}

/// Format `value` for display in a `currency` field.
pub fn format(value: Decimal, currency: &CurrencyCode) -> FormattedAmount {
    FormattedAmount {
        primary: fixed(value),
        secondary: lakh(value, currency),
    }
}

/// Lakh notation, only for `inr` whose displayed amount is at least one Lakh.
pub fn lakh(value: Decimal, currency: &CurrencyCode) -> Option<String> {
    let shown = round_display(value);
    if !currency.is_inr() || shown < LAKH {
        return None;
    }
    Some(format!("{} Lakh", fixed(shown / LAKH)))
}

/// Result line of the two-select layout, e.g. `920.00 EUR`.
pub fn result_text(amount: Decimal, currency: &CurrencyCode) -> String {
    format!("{} {}", fixed(amount), currency.upper())
}

fn fixed(value: Decimal) -> String {
    format!("{:.2}", round_display(value))
}
