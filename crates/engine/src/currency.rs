use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO-like currency code used by a trip and its money values.
///
/// Romana is mono-currency today (default `EUR`) and multi-currency
/// conversion is out of scope, but the data model keeps the currency explicit
/// so stored amounts stay self-describing.
///
/// ## Minor units
///
/// The engine stores monetary values as an `i64` number of **minor units**
/// (see `MoneyCents`). `minor_units()` returns how many decimal digits are
/// used when converting between major units (human input/output, e.g.
/// `10.50 EUR`) and minor units (stored integers, e.g. `1050`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Eur => 2,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            other => Err(EngineError::UnsupportedCurrency(other.to_string())),
        }
    }
}
