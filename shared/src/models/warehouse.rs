//! Warehouses and their ledger semantics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Warehouse kind drives how the stock ledger aggregates balances:
/// goods entering a `Consumption` warehouse count as used and drop out of
/// available stock; `VendorVirtual` holds supplier-owned goods that have been
/// invoiced but not yet physically received.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseKind {
    Physical,
    Site,
    VendorVirtual,
    Consumption,
}

impl WarehouseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseKind::Physical => "physical",
            WarehouseKind::Site => "site",
            WarehouseKind::VendorVirtual => "vendor_virtual",
            WarehouseKind::Consumption => "consumption",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "physical" => Some(WarehouseKind::Physical),
            "site" => Some(WarehouseKind::Site),
            "vendor_virtual" => Some(WarehouseKind::VendorVirtual),
            "consumption" => Some(WarehouseKind::Consumption),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub kind: WarehouseKind,
    pub created_at: DateTime<Utc>,
}
