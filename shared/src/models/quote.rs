//! Supplier quotes and the currency lock snapshot

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Approved,
    Rejected,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QuoteStatus::Pending),
            "approved" => Some(QuoteStatus::Approved),
            "rejected" => Some(QuoteStatus::Rejected),
            _ => None,
        }
    }
}

/// Exchange-rate snapshot frozen onto a quote at approval time. Once written
/// it is the single source of truth for every downstream local-currency
/// amount; nothing may re-apply a live rate to this quote's figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub rate: Decimal,
    pub rate_date: Option<NaiveDate>,
    pub rate_source: String,
    pub net_try: Decimal,
    pub vat_try: Decimal,
    pub gross_try: Decimal,
    pub locked_at: DateTime<Utc>,
}

/// A supplier quote for either a material purchase or a work-item
/// (subcontract) scope; exactly one of the two references is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub material_id: Option<Uuid>,
    pub work_item_id: Option<Uuid>,
    pub quantity: Decimal,
    /// Unit price in `currency`, VAT treatment per `vat_inclusive`.
    pub unit_price: Decimal,
    pub currency: String,
    /// -1 marks exempt.
    pub vat_rate: i32,
    pub vat_inclusive: bool,
    /// Operator-entered rate; takes precedence over the provider at lock time.
    pub manual_rate: Option<Decimal>,
    pub status: QuoteStatus,
    pub lock: Option<LockSnapshot>,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    /// A quote is locked once a non-zero gross has been frozen on it.
    pub fn is_locked(&self) -> bool {
        self.lock
            .as_ref()
            .map(|l| l.gross_try > Decimal::ZERO)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn quote(lock: Option<LockSnapshot>) -> Quote {
        Quote {
            id: Uuid::nil(),
            supplier_id: Uuid::nil(),
            material_id: Some(Uuid::nil()),
            work_item_id: None,
            quantity: Decimal::TEN,
            unit_price: Decimal::ONE_HUNDRED,
            currency: "USD".to_string(),
            vat_rate: 20,
            vat_inclusive: false,
            manual_rate: None,
            status: QuoteStatus::Pending,
            lock,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn unlocked_without_snapshot() {
        assert!(!quote(None).is_locked());
    }

    #[test]
    fn zero_gross_snapshot_does_not_count_as_locked() {
        let snapshot = LockSnapshot {
            rate: Decimal::ONE,
            rate_date: None,
            rate_source: "local".to_string(),
            net_try: Decimal::ZERO,
            vat_try: Decimal::ZERO,
            gross_try: Decimal::ZERO,
            locked_at: DateTime::<Utc>::MIN_UTC,
        };
        assert!(!quote(Some(snapshot)).is_locked());
    }

    #[test]
    fn locked_with_positive_gross() {
        let snapshot = LockSnapshot {
            rate: Decimal::from_str("30.0000").unwrap(),
            rate_date: None,
            rate_source: "TCMB today.xml".to_string(),
            net_try: Decimal::from_str("300000.00").unwrap(),
            vat_try: Decimal::from_str("60000.00").unwrap(),
            gross_try: Decimal::from_str("360000.00").unwrap(),
            locked_at: DateTime::<Utc>::MIN_UTC,
        };
        assert!(quote(Some(snapshot)).is_locked());
    }
}
