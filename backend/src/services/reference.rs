//! Read-only master-data lookups
//!
//! Materials, work items, warehouses and suppliers are maintained elsewhere;
//! the settlement core only resolves them by id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    Material, MaterialCategory, Supplier, UnitOfMeasure, Warehouse, WarehouseKind, WorkItem,
};

/// Reference data lookup service
#[derive(Clone)]
pub struct ReferenceDataService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: Uuid,
    name: String,
    category: String,
    brand: Option<String>,
    unit: String,
    vat_rate: i32,
    critical_stock: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MaterialRow> for Material {
    type Error = AppError;

    fn try_from(row: MaterialRow) -> Result<Self, Self::Error> {
        Ok(Material {
            id: row.id,
            name: row.name,
            category: MaterialCategory::parse(&row.category)
                .ok_or_else(|| AppError::Internal(format!("bad material category: {}", row.category)))?,
            brand: row.brand,
            unit: UnitOfMeasure::parse(&row.unit)
                .ok_or_else(|| AppError::Internal(format!("bad unit: {}", row.unit)))?,
            vat_rate: row.vat_rate,
            critical_stock: row.critical_stock,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct WorkItemRow {
    id: Uuid,
    category_name: String,
    name: String,
    target_quantity: Decimal,
    unit: String,
    vat_rate: i32,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<WorkItemRow> for WorkItem {
    type Error = AppError;

    fn try_from(row: WorkItemRow) -> Result<Self, Self::Error> {
        Ok(WorkItem {
            id: row.id,
            category_name: row.category_name,
            name: row.name,
            target_quantity: row.target_quantity,
            unit: UnitOfMeasure::parse(&row.unit)
                .ok_or_else(|| AppError::Internal(format!("bad unit: {}", row.unit)))?,
            vat_rate: row.vat_rate,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    kind: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<WarehouseRow> for Warehouse {
    type Error = AppError;

    fn try_from(row: WarehouseRow) -> Result<Self, Self::Error> {
        Ok(Warehouse {
            id: row.id,
            name: row.name,
            location: row.location,
            kind: WarehouseKind::parse(&row.kind)
                .ok_or_else(|| AppError::Internal(format!("bad warehouse kind: {}", row.kind)))?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    company_name: String,
    contact_person: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            company_name: row.company_name,
            contact_person: row.contact_person,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

impl ReferenceDataService {
    /// Create a new ReferenceDataService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_material(&self, id: Uuid) -> AppResult<Material> {
        sqlx::query_as::<_, MaterialRow>(
            r#"
            SELECT id, name, category, brand, unit, vat_rate, critical_stock, notes, created_at
            FROM materials
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?
        .try_into()
    }

    pub async fn get_work_item(&self, id: Uuid) -> AppResult<WorkItem> {
        sqlx::query_as::<_, WorkItemRow>(
            r#"
            SELECT id, category_name, name, target_quantity, unit, vat_rate, description, created_at
            FROM work_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Work item".to_string()))?
        .try_into()
    }

    pub async fn get_warehouse(&self, id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, name, location, kind, created_at FROM warehouses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?
        .try_into()
    }

    pub async fn get_supplier(&self, id: Uuid) -> AppResult<Supplier> {
        Ok(sqlx::query_as::<_, SupplierRow>(
            r#"
            SELECT id, company_name, contact_person, phone, address, created_at
            FROM suppliers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?
        .into())
    }
}
