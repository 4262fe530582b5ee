//! Stock ledger entries

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a ledger entry. Returns are rejected/defective goods going
/// back to the supplier; like outflows they reduce the balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    In,
    Out,
    Return,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "in",
            MovementDirection::Out => "out",
            MovementDirection::Return => "return",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementDirection::In),
            "out" => Some(MovementDirection::Out),
            "return" => Some(MovementDirection::Return),
            _ => None,
        }
    }
}

/// Closed set of document kinds a movement can reference. The reference
/// triple `(kind, id, leg)` is the idempotency key for document-driven
/// postings; business logic never matches on note text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Transfer,
    InvoiceLine,
    Manual,
    Return,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::Transfer => "transfer",
            RefKind::InvoiceLine => "invoice_line",
            RefKind::Manual => "manual",
            RefKind::Return => "return",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transfer" => Some(RefKind::Transfer),
            "invoice_line" => Some(RefKind::InvoiceLine),
            "manual" => Some(RefKind::Manual),
            "return" => Some(RefKind::Return),
            _ => None,
        }
    }
}

/// Which leg of a dual-entry document a movement represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefLeg {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl RefLeg {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefLeg::In => "IN",
            RefLeg::Out => "OUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN" => Some(RefLeg::In),
            "OUT" => Some(RefLeg::Out),
            _ => None,
        }
    }
}

/// Reference triple linking a movement back to its originating document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovementRef {
    pub kind: RefKind,
    pub id: Uuid,
    pub leg: RefLeg,
}

/// One append-only stock ledger entry. Never updated or deleted in normal
/// operation; corrections are compensating entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub material_id: Uuid,
    pub warehouse_id: Uuid,
    pub order_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub direction: MovementDirection,
    /// Positive magnitude; the direction carries the sign.
    pub quantity: Decimal,
    pub date: NaiveDate,
    pub delivery_note_no: Option<String>,
    pub note: Option<String>,
    pub reference: Option<MovementRef>,
    pub created_at: DateTime<Utc>,
}
