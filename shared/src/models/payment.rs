//! Payments and their allocation to invoices and claims

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cheque => "cheque",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "cheque" => Some(PaymentMethod::Cheque),
            _ => None,
        }
    }
}

/// A payment made to a supplier, local currency. The unallocated part of the
/// amount is the payment's advance, derived on demand — never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub supplier_id: Uuid,
    /// Optional direct link when the payment was entered from a claim screen.
    pub claim_id: Option<Uuid>,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub bank_name: Option<String>,
    pub cheque_no: Option<String>,
    /// For cheques; defaults to the payment date when omitted.
    pub cheque_due_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a payment allocation settles against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllocationTargetKind {
    Invoice,
    Claim,
}

impl AllocationTargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationTargetKind::Invoice => "invoice",
            AllocationTargetKind::Claim => "claim",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(AllocationTargetKind::Invoice),
            "claim" => Some(AllocationTargetKind::Claim),
            _ => None,
        }
    }
}

/// Normalized settlement record: one payment covering part (or all) of one
/// invoice or claim. Created, never mutated; a target's paid-to-date is the
/// sum of its allocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub target_kind: AllocationTargetKind,
    pub target_id: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}
