//! Currency codes and the catalog of known currencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Known currencies as `(code, display name)`, in catalog order.
pub const CURRENCIES: &[(&str, &str)] = &[
    ("usd", "US Dollar"),
    ("eur", "Euro"),
    ("gbp", "British Pound"),
    ("jpy", "Japanese Yen"),
    ("aud", "Australian Dollar"),
    ("cad", "Canadian Dollar"),
    ("chf", "Swiss Franc"),
    ("cny", "Chinese Yuan"),
    ("inr", "Indian Rupee"),
    ("dkk", "Danish Krone"),
    ("krw", "South Korean Won"),
    ("mxn", "Mexican Peso"),
    ("nzd", "New Zealand Dollar"),
    ("sek", "Swedish Krona"),
    ("nok", "Norwegian Krone"),
    ("sgd", "Singapore Dollar"),
    ("thb", "Thai Baht"),
    ("try", "Turkish Lira"),
    ("rub", "Russian Ruble"),
    ("zar", "South African Rand"),
    ("brl", "Brazilian Real"),
];

/// Lowercase currency code, e.g. `usd`.
///
/// Codes outside [`CURRENCIES`] are still valid: they take part in
/// conversion like any other code but have no display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a code, trimming and lowercasing the input.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_lowercase())
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the pivot currency.
    pub fn is_usd(&self) -> bool {
        self.0 == "usd"
    }

    /// Whether this is the Indian Rupee.
    pub fn is_inr(&self) -> bool {
        self.0 == "inr"
    }

    /// Whether the code is part of the known catalog.
    pub fn is_known(&self) -> bool {
        self.display_name().is_some()
    }

    /// Human-readable name, if the code is in the catalog.
    pub fn display_name(&self) -> Option<&'static str> {
        CURRENCIES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
    }

    /// Select-box label such as `USD - US Dollar`.
    ///
    /// Unknown codes are labelled with the upper-case code alone.
    pub fn label(&self) -> String {
        match self.display_name() {
            Some(name) => format!("{} - {}", self.upper(), name),
            None => self.upper(),
        }
    }

    /// Upper-case form used in result text.
    pub fn upper(&self) -> String {
        self.0.to_uppercase()
    }

    pub fn usd() -> Self {
        Self::new("usd")
    }

    pub fn eur() -> Self {
        Self::new("eur")
    }

    pub fn inr() -> Self {
        Self::new("inr")
    }

    pub fn dkk() -> Self {
        Self::new("dkk")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencyCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Iterate the known catalog as codes.
pub fn known_currencies() -> impl Iterator<Item = CurrencyCode> {
    CURRENCIES.iter().map(|(code, _)| CurrencyCode::new(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_normalized() {
        let code = CurrencyCode::new("  EUR ");
        assert_eq!(code.as_str(), "eur");
        assert_eq!(code, CurrencyCode::eur());
    }

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(CURRENCIES.len(), 21);
        assert_eq!(CurrencyCode::dkk().display_name(), Some("Danish Krone"));
        assert_eq!(CurrencyCode::usd().label(), "USD - US Dollar");
        assert!(known_currencies().any(|c| c.is_inr()));
    }

    #[test]
    fn test_unknown_code_is_opaque() {
        let code = CurrencyCode::new("xau");
        assert!(!code.is_known());
        assert_eq!(code.display_name(), None);
        assert_eq!(code.label(), "XAU");
    }

    #[test]
    fn test_serde_normalizes() {
        let code: CurrencyCode = serde_json::from_str("\"GBP\"").unwrap();
        assert_eq!(code.as_str(), "gbp");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"gbp\"");
    }
}
