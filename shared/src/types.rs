//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Currencies accepted on quotes and payments. TRY is the local currency;
/// everything else is converted at lock time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Try,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Try => "TRY",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    /// Accepts the legacy "TL" spelling for the local currency.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "TRY" | "TL" | "" => Some(Currency::Try),
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            "GBP" => Some(Currency::Gbp),
            _ => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Currency::Try)
    }
}

/// Units of measure for materials and work items
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitOfMeasure {
    #[default]
    Piece,
    SquareMeter,
    CubicMeter,
    Kilogram,
    Ton,
    Meter,
    ManHour,
    LumpSum,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Piece => "piece",
            UnitOfMeasure::SquareMeter => "m2",
            UnitOfMeasure::CubicMeter => "m3",
            UnitOfMeasure::Kilogram => "kg",
            UnitOfMeasure::Ton => "ton",
            UnitOfMeasure::Meter => "m",
            UnitOfMeasure::ManHour => "man_hour",
            UnitOfMeasure::LumpSum => "lump_sum",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "piece" => Some(UnitOfMeasure::Piece),
            "m2" => Some(UnitOfMeasure::SquareMeter),
            "m3" => Some(UnitOfMeasure::CubicMeter),
            "kg" => Some(UnitOfMeasure::Kilogram),
            "ton" => Some(UnitOfMeasure::Ton),
            "m" => Some(UnitOfMeasure::Meter),
            "man_hour" => Some(UnitOfMeasure::ManHour),
            "lump_sum" => Some(UnitOfMeasure::LumpSum),
            _ => None,
        }
    }
}

/// VAT rate sentinel: -1 marks an exempt / special-base line. All other
/// values are plain percentages.
pub const VAT_EXEMPT: i32 = -1;

/// VAT rates the forms offer. Kept as plain integers in storage; -1 is the
/// exempt sentinel.
pub const VAT_RATES: [i32; 6] = [VAT_EXEMPT, 0, 5, 10, 16, 20];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_parse_accepts_legacy_tl() {
        assert_eq!(Currency::parse("TL"), Some(Currency::Try));
        assert_eq!(Currency::parse("try"), Some(Currency::Try));
        assert_eq!(Currency::parse(""), Some(Currency::Try));
        assert_eq!(Currency::parse("usd"), Some(Currency::Usd));
        assert_eq!(Currency::parse("CHF"), None);
    }

    #[test]
    fn unit_round_trips_through_str() {
        for unit in [
            UnitOfMeasure::Piece,
            UnitOfMeasure::Ton,
            UnitOfMeasure::ManHour,
            UnitOfMeasure::LumpSum,
        ] {
            assert_eq!(UnitOfMeasure::parse(unit.as_str()), Some(unit));
        }
    }
}
