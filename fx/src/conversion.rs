//! USD-pivot conversion across currency fields.

use ratepivot_common::CurrencyCode;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::rate_table::RateTable;

/// Numeric content of one input field; `None` means "no value", not zero.
pub type FieldValue = Option<Decimal>;

/// Decimal places shown in every field.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Round to the two display decimals, half away from zero.
pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse raw field text. Anything that is not a plain decimal number is
/// "no value".
pub fn parse_amount(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<Decimal>().ok()
}

/// Whether a field value may drive a conversion.
pub fn is_convertible(value: FieldValue) -> bool {
    matches!(value, Some(v) if v > Decimal::ZERO)
}

/// Express `amount` of `currency` in USD. Missing rates count as 1.
///
/// Returns `None` when the result does not fit in a `Decimal`.
pub fn to_usd(amount: Decimal, currency: &CurrencyCode, rates: &RateTable) -> Option<Decimal> {
    if currency.is_usd() {
        Some(amount)
    } else {
        amount.checked_div(rates.rate_or_identity(currency))
    }
}

/// Express a USD amount in `currency`, `None` on overflow.
pub fn from_usd(usd: Decimal, currency: &CurrencyCode, rates: &RateTable) -> Option<Decimal> {
    usd.checked_mul(rates.rate_or_identity(currency))
}

/// Recompute every field from the one the user just edited.
///
/// The edited value is converted to USD once, unrounded, and every other
/// slot gets `usd * rate` rounded to two decimals. Slots sharing a currency
/// get identical values. If the edited value is absent or not positive, the
/// index is out of range, or the USD value overflows, `values` is returned
/// unchanged so the other fields keep their last values. A slot whose own
/// product overflows keeps its previous value.
pub fn recompute(
    slots: &[CurrencyCode],
    rates: &RateTable,
    values: &[FieldValue],
    edited_index: usize,
) -> Vec<FieldValue> {
    let mut out = values.to_vec();

    let (Some(edited_currency), Some(&edited_value)) =
        (slots.get(edited_index), values.get(edited_index))
    else {
        return out;
    };
    let Some(amount) = edited_value.filter(|v| *v > Decimal::ZERO) else {
        return out;
    };

    let Some(usd_value) = to_usd(amount, edited_currency, rates) else {
        debug!(currency = %edited_currency, %amount, "USD value out of range, fields unchanged");
        return out;
    };

    let width = slots.len().min(out.len());
    for (i, (slot, value)) in slots.iter().zip(out.iter_mut()).take(width).enumerate() {
        if i == edited_index {
            continue;
        }
        match from_usd(usd_value, slot, rates) {
            Some(converted) => *value = Some(round_display(converted)),
            None => debug!(currency = %slot, "Converted value out of range, field unchanged"),
        }
    }

    out
}

/// Single-pair conversion used by the two-select layout.
///
/// Returns `None` for a non-positive amount or a result that does not fit in
/// a `Decimal`. Converting a currency to itself returns the amount unchanged.
pub fn convert_pair(
    amount: Decimal,
    from: &CurrencyCode,
    to: &CurrencyCode,
    rates: &RateTable,
) -> Option<Decimal> {
    if amount <= Decimal::ZERO {
        return None;
    }
    if from == to {
        return Some(amount);
    }
    to_usd(amount, from, rates).and_then(|usd| from_usd(usd, to, rates))
}
