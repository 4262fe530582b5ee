//! Validation helpers shared by the service layer

use rust_decimal::Decimal;

use crate::types::VAT_RATES;

/// Quantities on movements, transfers and invoice lines must be positive.
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Monetary amounts entered by users must be positive.
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    Ok(())
}

/// Deduction fields may be zero but never negative.
pub fn validate_non_negative(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Percentages (claim progress, withholding, retention) live in [0, 100].
pub fn validate_percentage(percentage: Decimal) -> Result<(), &'static str> {
    if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

/// A claim must make progress; zero-percent claims are rejected.
pub fn validate_claim_percentage(percentage: Decimal) -> Result<(), &'static str> {
    validate_percentage(percentage)?;
    if percentage == Decimal::ZERO {
        return Err("Claimed percentage must be greater than zero");
    }
    Ok(())
}

/// VAT rates are restricted to the configured set (-1 marks exempt).
pub fn validate_vat_rate(vat_rate: i32) -> Result<(), &'static str> {
    if !VAT_RATES.contains(&vat_rate) {
        return Err("Unsupported VAT rate");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rejects_non_positive_quantities() {
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(Decimal::from_str("-1").unwrap()).is_err());
        assert!(validate_positive_quantity(Decimal::from_str("0.01").unwrap()).is_ok());
    }

    #[test]
    fn percentage_bounds() {
        assert!(validate_percentage(Decimal::ZERO).is_ok());
        assert!(validate_percentage(Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_percentage(Decimal::from_str("100.01").unwrap()).is_err());
        assert!(validate_claim_percentage(Decimal::ZERO).is_err());
    }

    #[test]
    fn vat_rate_set_includes_exempt_sentinel() {
        assert!(validate_vat_rate(-1).is_ok());
        assert!(validate_vat_rate(20).is_ok());
        assert!(validate_vat_rate(18).is_err());
    }
}
