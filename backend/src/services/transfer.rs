//! Dual-leg stock transfers
//!
//! The single gate through which stock changes location. Writes a balanced
//! OUT/IN pair atomically, refuses to overdraw the source warehouse, and
//! deduplicates on the `(ref_type, ref_id, ref_direction, material,
//! warehouse)` key so a retried document posts exactly once.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::matching::OrderFifoMatcher;
use crate::services::stock::{append_movement, warehouse_balance, NewMovement};
use shared::{
    validate_positive_quantity, MovementDirection, MovementRef, RefKind, RefLeg, WarehouseKind,
};

/// Transfer service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
}

/// Input for a warehouse-to-warehouse transfer
#[derive(Debug, Clone, Deserialize)]
pub struct TransferInput {
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub source_warehouse_id: Uuid,
    pub dest_warehouse_id: Uuid,
    /// Explicit order binding; when absent and the source is vendor-virtual,
    /// the FIFO matcher resolves one.
    pub order_id: Option<Uuid>,
    pub note: Option<String>,
    pub date: Option<NaiveDate>,
    /// Idempotency key. With a key, replaying the same call is a no-op;
    /// without one the legs post unconditionally (one-off manual postings).
    pub transfer_id: Option<Uuid>,
}

/// Result of a transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub transfer_id: Option<Uuid>,
    /// Order the movement ended up bound to, explicit or FIFO-matched.
    pub order_id: Option<Uuid>,
    /// False when an idempotent replay found both legs already written.
    pub posted: bool,
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Move stock between two warehouses as one atomic dual-leg posting.
    pub async fn transfer(&self, input: TransferInput) -> AppResult<TransferOutcome> {
        if let Err(msg) = validate_positive_quantity(input.quantity) {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
                message_tr: "Miktar 0'dan büyük olmalıdır".to_string(),
            });
        }

        if input.source_warehouse_id == input.dest_warehouse_id {
            return Err(AppError::Validation {
                field: "dest_warehouse_id".to_string(),
                message: "Source and destination warehouses must differ".to_string(),
                message_tr: "Kaynak ve hedef depo aynı olamaz".to_string(),
            });
        }

        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());

        let material_name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM materials WHERE id = $1",
        )
        .bind(input.material_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        let source_kind = sqlx::query_scalar::<_, String>(
            "SELECT kind FROM warehouses WHERE id = $1",
        )
        .bind(input.source_warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Source warehouse".to_string()))?;

        let dest_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(input.dest_warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if !dest_exists {
            return Err(AppError::NotFound("Destination warehouse".to_string()));
        }

        if let Some(order_id) = input.order_id {
            let order_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM purchase_orders WHERE id = $1)",
            )
            .bind(order_id)
            .fetch_one(&self.db)
            .await?;
            if !order_exists {
                return Err(AppError::NotFound("Purchase order".to_string()));
            }
        }

        // FIFO matching only fires on unbound depletions of the vendor
        // location. It is best-effort and runs outside the posting
        // transaction; a resolution failure never blocks the transfer.
        let mut order_id = input.order_id;
        if order_id.is_none()
            && WarehouseKind::parse(&source_kind) == Some(WarehouseKind::VendorVirtual)
        {
            match OrderFifoMatcher::new(self.db.clone())
                .resolve(input.material_id)
                .await
            {
                Ok(resolved) => order_id = resolved,
                Err(e) => {
                    tracing::warn!("FIFO order matching failed: {}", e);
                }
            }
        }

        let mut tx = self.db.begin().await?;

        // Safe-stock guard: never draw the source below zero.
        let balance =
            warehouse_balance(&mut tx, input.material_id, input.source_warehouse_id).await?;
        if input.quantity > balance {
            return Err(AppError::InsufficientStock(format!(
                "'{}' source balance is {}, requested {}",
                material_name, balance, input.quantity
            )));
        }

        let reference = |leg: RefLeg| {
            input.transfer_id.map(|id| MovementRef {
                kind: RefKind::Transfer,
                id,
                leg,
            })
        };

        let out_leg = NewMovement {
            material_id: input.material_id,
            warehouse_id: input.source_warehouse_id,
            order_id,
            supplier_id: None,
            direction: MovementDirection::Out,
            quantity: input.quantity,
            date,
            delivery_note_no: None,
            note: Some(match &input.note {
                Some(n) => format!("ÇIKIŞ: {}", n),
                None => "ÇIKIŞ".to_string(),
            }),
            reference: reference(RefLeg::Out),
        };

        // The IN leg is written even into consumption warehouses so the
        // hand-off stays visible; available-stock aggregation neutralizes it.
        let in_leg = NewMovement {
            material_id: input.material_id,
            warehouse_id: input.dest_warehouse_id,
            order_id,
            supplier_id: None,
            direction: MovementDirection::In,
            quantity: input.quantity,
            date,
            delivery_note_no: None,
            note: Some(match &input.note {
                Some(n) => format!("GİRİŞ: {}", n),
                None => "GİRİŞ".to_string(),
            }),
            reference: reference(RefLeg::In),
        };

        let out_posted = append_movement(&mut tx, &out_leg).await?;
        let in_posted = append_movement(&mut tx, &in_leg).await?;

        tx.commit().await?;

        Ok(TransferOutcome {
            transfer_id: input.transfer_id,
            order_id,
            posted: out_posted || in_posted,
        })
    }
}
