//! Progress billing (hakediş) claims

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A periodic percentage-of-contract claim against a purchase order.
///
/// All monetary fields are local currency derived from the contract's lock
/// snapshot at creation time. The cumulative claimed percentage across one
/// order never exceeds 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressBilling {
    pub id: Uuid,
    pub order_id: Uuid,
    /// 1-based sequence within the order.
    pub claim_no: i32,
    pub date: NaiveDate,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub description: Option<String>,
    /// Progress claimed this period, percent of the contract.
    pub percentage: Decimal,
    pub gross_amount: Decimal,
    pub vat_rate: i32,
    pub vat_amount: Decimal,
    /// Stopaj: tax withheld at source.
    pub withholding_rate: Decimal,
    pub withholding_amount: Decimal,
    /// Teminat: retention held until acceptance.
    pub retention_rate: Decimal,
    pub retention_amount: Decimal,
    pub advance_deduction: Decimal,
    pub other_deductions: Decimal,
    /// May be negative when deductions exceed the period's receivable.
    pub net_payable: Decimal,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}
