//! Purchase orders

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery status, recomputed from delivered vs ordered on every save.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Partial,
    Complete,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Partial => "partial",
            DeliveryStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeliveryStatus::Pending),
            "partial" => Some(DeliveryStatus::Partial),
            "complete" => Some(DeliveryStatus::Complete),
            _ => None,
        }
    }

    /// Status for a delivered/ordered pair.
    pub fn derive(delivered: Decimal, ordered: Decimal) -> Self {
        if delivered <= Decimal::ZERO {
            DeliveryStatus::Pending
        } else if delivered < ordered {
            DeliveryStatus::Partial
        } else {
            DeliveryStatus::Complete
        }
    }
}

/// A purchase order, created one-to-one from an approved quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub order_date: NaiveDate,
    pub ordered_quantity: Decimal,
    /// Physically received into a real warehouse (or earned, for work items).
    pub delivered_quantity: Decimal,
    /// Covered by supplier invoices.
    pub invoiced_quantity: Decimal,
    pub delivery_status: DeliveryStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn remaining_to_deliver(&self) -> Decimal {
        let remaining = self.ordered_quantity - self.delivered_quantity;
        if remaining < Decimal::ZERO {
            Decimal::ZERO
        } else {
            remaining
        }
    }

    pub fn remaining_to_invoice(&self) -> Decimal {
        let remaining = self.ordered_quantity - self.invoiced_quantity;
        if remaining < Decimal::ZERO {
            Decimal::ZERO
        } else {
            remaining
        }
    }

    /// Delivery progress, capped at 100.
    pub fn completion_percent(&self) -> Decimal {
        if self.ordered_quantity == Decimal::ZERO {
            return Decimal::ZERO;
        }
        let percent = self.delivered_quantity / self.ordered_quantity * Decimal::ONE_HUNDRED;
        if percent > Decimal::ONE_HUNDRED {
            Decimal::ONE_HUNDRED
        } else {
            percent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn order(ordered: &str, delivered: &str, invoiced: &str) -> PurchaseOrder {
        PurchaseOrder {
            id: Uuid::nil(),
            quote_id: Uuid::nil(),
            order_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            ordered_quantity: dec(ordered),
            delivered_quantity: dec(delivered),
            invoiced_quantity: dec(invoiced),
            delivery_status: DeliveryStatus::derive(dec(delivered), dec(ordered)),
            note: None,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn status_follows_delivered_quantity() {
        assert_eq!(DeliveryStatus::derive(dec("0"), dec("10")), DeliveryStatus::Pending);
        assert_eq!(DeliveryStatus::derive(dec("4"), dec("10")), DeliveryStatus::Partial);
        assert_eq!(DeliveryStatus::derive(dec("10"), dec("10")), DeliveryStatus::Complete);
        assert_eq!(DeliveryStatus::derive(dec("12"), dec("10")), DeliveryStatus::Complete);
    }

    #[test]
    fn remaining_quantities_floor_at_zero() {
        let o = order("10", "12", "15");
        assert_eq!(o.remaining_to_deliver(), Decimal::ZERO);
        assert_eq!(o.remaining_to_invoice(), Decimal::ZERO);

        let o = order("10", "4", "6");
        assert_eq!(o.remaining_to_deliver(), dec("6"));
        assert_eq!(o.remaining_to_invoice(), dec("4"));
    }

    #[test]
    fn completion_percent_caps_at_hundred() {
        assert_eq!(order("10", "5", "0").completion_percent(), dec("50"));
        assert_eq!(order("10", "20", "0").completion_percent(), Decimal::ONE_HUNDRED);
        assert_eq!(order("0", "5", "0").completion_percent(), Decimal::ZERO);
    }
}
