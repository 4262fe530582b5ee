//! Materials and work items

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UnitOfMeasure;

/// Material category groups for purchasing reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCategory {
    #[default]
    General,
    Hardware,
    Electrical,
    Mechanical,
    Structural,
    PaintChemical,
    Equipment,
}

impl MaterialCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialCategory::General => "general",
            MaterialCategory::Hardware => "hardware",
            MaterialCategory::Electrical => "electrical",
            MaterialCategory::Mechanical => "mechanical",
            MaterialCategory::Structural => "structural",
            MaterialCategory::PaintChemical => "paint_chemical",
            MaterialCategory::Equipment => "equipment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "general" => Some(MaterialCategory::General),
            "hardware" => Some(MaterialCategory::Hardware),
            "electrical" => Some(MaterialCategory::Electrical),
            "mechanical" => Some(MaterialCategory::Mechanical),
            "structural" => Some(MaterialCategory::Structural),
            "paint_chemical" => Some(MaterialCategory::PaintChemical),
            "equipment" => Some(MaterialCategory::Equipment),
            _ => None,
        }
    }
}

/// A purchasable material. Immutable once referenced by a stock movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub category: MaterialCategory,
    pub brand: Option<String>,
    pub unit: UnitOfMeasure,
    /// Default VAT percentage; -1 marks exempt.
    pub vat_rate: i32,
    /// Stock level below which the material is flagged as critical.
    pub critical_stock: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A subcontracted work item (service scope), billed by progress claims
/// rather than deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub category_name: String,
    pub name: String,
    /// Approximate take-off quantity for the scope.
    pub target_quantity: Decimal,
    pub unit: UnitOfMeasure,
    pub vat_rate: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
