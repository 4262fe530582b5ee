//! Supplier invoices

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchase invoice header. Totals are rolled up from the lines and held in
/// local currency; they are never re-multiplied by an exchange rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub order_id: Option<Uuid>,
    pub invoice_no: String,
    pub date: NaiveDate,
    pub net_total: Decimal,
    pub vat_total: Decimal,
    pub gross_total: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One invoice line. Material lines drive a vendor-virtual stock entry;
/// service lines carry only the description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub material_id: Option<Uuid>,
    pub description: Option<String>,
    pub quantity: Decimal,
    /// Net unit price, local currency.
    pub unit_price: Decimal,
    pub vat_rate: i32,
}
