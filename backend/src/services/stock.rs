//! Append-only stock ledger and balance projections
//!
//! Movements are never updated or deleted; every balance is an aggregation
//! over the full history. Validation of what may be posted is the caller's
//! job (see `TransferService`), this layer only appends and sums.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{MovementDirection, MovementRef, RefKind, RefLeg, StockMovement, UnitOfMeasure};

/// Stock ledger service
#[derive(Clone)]
pub struct StockLedgerService {
    db: PgPool,
}

/// A movement waiting to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub material_id: Uuid,
    pub warehouse_id: Uuid,
    pub order_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub date: NaiveDate,
    pub delivery_note_no: Option<String>,
    pub note: Option<String>,
    pub reference: Option<MovementRef>,
}

/// Database row for a ledger entry
#[derive(Debug, FromRow)]
pub(crate) struct MovementRow {
    id: Uuid,
    material_id: Uuid,
    warehouse_id: Uuid,
    order_id: Option<Uuid>,
    supplier_id: Option<Uuid>,
    direction: String,
    quantity: Decimal,
    date: NaiveDate,
    delivery_note_no: Option<String>,
    note: Option<String>,
    ref_type: Option<String>,
    ref_id: Option<Uuid>,
    ref_direction: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let direction = MovementDirection::parse(&row.direction)
            .ok_or_else(|| AppError::Internal(format!("bad movement direction: {}", row.direction)))?;

        let reference = match (row.ref_type, row.ref_id, row.ref_direction) {
            (Some(kind), Some(id), Some(leg)) => Some(MovementRef {
                kind: RefKind::parse(&kind)
                    .ok_or_else(|| AppError::Internal(format!("bad ref kind: {}", kind)))?,
                id,
                leg: RefLeg::parse(&leg)
                    .ok_or_else(|| AppError::Internal(format!("bad ref leg: {}", leg)))?,
            }),
            _ => None,
        };

        Ok(StockMovement {
            id: row.id,
            material_id: row.material_id,
            warehouse_id: row.warehouse_id,
            order_id: row.order_id,
            supplier_id: row.supplier_id,
            direction,
            quantity: row.quantity,
            date: row.date,
            delivery_note_no: row.delivery_note_no,
            note: row.note,
            reference,
            created_at: row.created_at,
        })
    }
}

/// Stock level flag relative to the material's critical threshold
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Out,
    Critical,
    Low,
    Ok,
}

impl StockStatus {
    /// Low cuts in at 1.5x the critical threshold.
    pub fn classify(available: Decimal, critical: Decimal) -> Self {
        let low_limit = critical * Decimal::new(15, 1);
        if available <= Decimal::ZERO {
            StockStatus::Out
        } else if available <= critical {
            StockStatus::Critical
        } else if available <= low_limit {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }
}

/// One material's available stock with its threshold flag
#[derive(Debug, Clone, Serialize)]
pub struct StockSummaryEntry {
    pub material_id: Uuid,
    pub material_name: String,
    pub unit: UnitOfMeasure,
    pub available: Decimal,
    pub critical_stock: Decimal,
    pub status: StockStatus,
}

/// Positive stock of one material in one warehouse
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseStockEntry {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub material_id: Uuid,
    pub material_name: String,
    pub quantity: Decimal,
}

// ---------------------------------------------------------------------------
// Shared query helpers, usable inside a caller's transaction
// ---------------------------------------------------------------------------

/// Balance of one material in one warehouse: in - out - return.
pub(crate) async fn warehouse_balance(
    conn: &mut PgConnection,
    material_id: Uuid,
    warehouse_id: Uuid,
) -> AppResult<Decimal> {
    let balance = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(
            CASE WHEN direction = 'in' THEN quantity ELSE -quantity END
        ), 0)
        FROM stock_movements
        WHERE material_id = $1 AND warehouse_id = $2
        "#,
    )
    .bind(material_id)
    .bind(warehouse_id)
    .fetch_one(conn)
    .await?;

    Ok(balance)
}

/// Available stock of a material across all warehouses. Inflows into
/// consumption warehouses do not count (those goods are spent on arrival);
/// outflows and returns always subtract.
pub(crate) async fn available_stock(
    conn: &mut PgConnection,
    material_id: Uuid,
) -> AppResult<Decimal> {
    let balance = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(
            CASE WHEN sm.direction = 'in' AND w.kind <> 'consumption' THEN sm.quantity
                 WHEN sm.direction = 'in' THEN 0
                 ELSE -sm.quantity
            END
        ), 0)
        FROM stock_movements sm
        JOIN warehouses w ON w.id = sm.warehouse_id
        WHERE sm.material_id = $1
        "#,
    )
    .bind(material_id)
    .fetch_one(conn)
    .await?;

    Ok(balance)
}

/// Append one ledger entry. Entries carrying a reference triple insert-if-
/// absent on `(ref_type, ref_id, ref_direction, material, warehouse)`;
/// returns whether a row was actually written.
pub(crate) async fn append_movement(
    conn: &mut PgConnection,
    movement: &NewMovement,
) -> AppResult<bool> {
    let (ref_type, ref_id, ref_direction) = match &movement.reference {
        Some(r) => (
            Some(r.kind.as_str()),
            Some(r.id),
            Some(r.leg.as_str()),
        ),
        None => (None, None, None),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO stock_movements (
            material_id, warehouse_id, order_id, supplier_id, direction,
            quantity, date, delivery_note_no, note, ref_type, ref_id, ref_direction
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (ref_type, ref_id, ref_direction, material_id, warehouse_id)
            WHERE ref_type IS NOT NULL
            DO NOTHING
        "#,
    )
    .bind(movement.material_id)
    .bind(movement.warehouse_id)
    .bind(movement.order_id)
    .bind(movement.supplier_id)
    .bind(movement.direction.as_str())
    .bind(movement.quantity)
    .bind(movement.date)
    .bind(&movement.delivery_note_no)
    .bind(&movement.note)
    .bind(ref_type)
    .bind(ref_id)
    .bind(ref_direction)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

impl StockLedgerService {
    /// Create a new StockLedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append a single movement to the ledger and return it. Used for one-off
    /// manual postings; document-driven entries go through `append_movement`
    /// with their reference triple.
    pub async fn post(&self, movement: NewMovement) -> AppResult<StockMovement> {
        let (ref_type, ref_id, ref_direction) = match &movement.reference {
            Some(r) => (Some(r.kind.as_str()), Some(r.id), Some(r.leg.as_str())),
            None => (None, None, None),
        };

        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            INSERT INTO stock_movements (
                material_id, warehouse_id, order_id, supplier_id, direction,
                quantity, date, delivery_note_no, note, ref_type, ref_id, ref_direction
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, material_id, warehouse_id, order_id, supplier_id, direction,
                      quantity, date, delivery_note_no, note, ref_type, ref_id, ref_direction,
                      created_at
            "#,
        )
        .bind(movement.material_id)
        .bind(movement.warehouse_id)
        .bind(movement.order_id)
        .bind(movement.supplier_id)
        .bind(movement.direction.as_str())
        .bind(movement.quantity)
        .bind(movement.date)
        .bind(&movement.delivery_note_no)
        .bind(&movement.note)
        .bind(ref_type)
        .bind(ref_id)
        .bind(ref_direction)
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    /// Balance projection. With a warehouse this is the plain per-warehouse
    /// balance; without one it is the material's available stock (inflows
    /// into consumption warehouses excluded).
    pub async fn balance(&self, material_id: Uuid, warehouse_id: Option<Uuid>) -> AppResult<Decimal> {
        let mut conn = self.db.acquire().await?;
        match warehouse_id {
            Some(w) => warehouse_balance(&mut conn, material_id, w).await,
            None => available_stock(&mut conn, material_id).await,
        }
    }

    /// Full movement history for a material, in ledger order.
    pub async fn movements(&self, material_id: Uuid) -> AppResult<Vec<StockMovement>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1)",
        )
        .bind(material_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Material".to_string()));
        }

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, material_id, warehouse_id, order_id, supplier_id, direction,
                   quantity, date, delivery_note_no, note, ref_type, ref_id, ref_direction,
                   created_at
            FROM stock_movements
            WHERE material_id = $1
            ORDER BY date ASC, created_at ASC
            "#,
        )
        .bind(material_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Available stock per material with critical-threshold flags.
    pub async fn stock_summary(&self) -> AppResult<Vec<StockSummaryEntry>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, Decimal, Decimal)>(
            r#"
            SELECT m.id, m.name, m.unit, m.critical_stock,
                   COALESCE(SUM(
                       CASE WHEN sm.direction IS NULL THEN 0
                            WHEN sm.direction = 'in' AND w.kind <> 'consumption' THEN sm.quantity
                            WHEN sm.direction = 'in' THEN 0
                            ELSE -sm.quantity
                       END
                   ), 0) AS available
            FROM materials m
            LEFT JOIN stock_movements sm ON sm.material_id = m.id
            LEFT JOIN warehouses w ON w.id = sm.warehouse_id
            GROUP BY m.id, m.name, m.unit, m.critical_stock
            ORDER BY m.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(material_id, material_name, unit, critical_stock, available)| {
                StockSummaryEntry {
                    material_id,
                    material_name,
                    unit: UnitOfMeasure::parse(&unit).unwrap_or_default(),
                    available,
                    critical_stock,
                    status: StockStatus::classify(available, critical_stock),
                }
            })
            .collect())
    }

    /// Positive per-warehouse balances, consumption warehouses excluded.
    pub async fn stock_report(&self) -> AppResult<Vec<WarehouseStockEntry>> {
        let rows = sqlx::query_as::<_, (Uuid, String, Uuid, String, Decimal)>(
            r#"
            SELECT w.id, w.name, m.id, m.name,
                   SUM(CASE WHEN sm.direction = 'in' THEN sm.quantity ELSE -sm.quantity END) AS quantity
            FROM stock_movements sm
            JOIN warehouses w ON w.id = sm.warehouse_id
            JOIN materials m ON m.id = sm.material_id
            WHERE w.kind <> 'consumption'
            GROUP BY w.id, w.name, m.id, m.name
            HAVING SUM(CASE WHEN sm.direction = 'in' THEN sm.quantity ELSE -sm.quantity END) > 0
            ORDER BY w.name, m.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(warehouse_id, warehouse_name, material_id, material_name, quantity)| {
                    WarehouseStockEntry {
                        warehouse_id,
                        warehouse_name,
                        material_id,
                        material_name,
                        quantity,
                    }
                },
            )
            .collect())
    }
}
