//! HTTP handlers for stock ledger projections

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::stock::{
    NewMovement, StockLedgerService, StockSummaryEntry, WarehouseStockEntry,
};
use crate::AppState;
use shared::{
    validate_positive_quantity, MovementDirection, MovementRef, RefKind, RefLeg, StockMovement,
};

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub warehouse_id: Option<Uuid>,
}

/// Input for a one-off manual ledger posting
#[derive(Debug, Deserialize)]
pub struct PostMovementInput {
    pub material_id: Uuid,
    pub warehouse_id: Uuid,
    pub order_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub date: Option<NaiveDate>,
    pub delivery_note_no: Option<String>,
    pub note: Option<String>,
    /// Optional dedup key for document-driven corrections.
    pub reference_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub material_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub balance: Decimal,
}

/// Balance of a material, per warehouse or available across all
pub async fn get_balance(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> AppResult<Json<BalanceResponse>> {
    let service = StockLedgerService::new(state.db);
    let balance = service.balance(material_id, query.warehouse_id).await?;
    Ok(Json(BalanceResponse {
        material_id,
        warehouse_id: query.warehouse_id,
        balance,
    }))
}

/// Post a manual ledger entry (adjustments, returns)
pub async fn post_movement(
    State(state): State<AppState>,
    Json(input): Json<PostMovementInput>,
) -> AppResult<Json<StockMovement>> {
    if let Err(msg) = validate_positive_quantity(input.quantity) {
        return Err(AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_tr: "Miktar 0'dan büyük olmalıdır".to_string(),
        });
    }

    let reference = input.reference_id.map(|id| MovementRef {
        kind: if input.direction == MovementDirection::Return {
            RefKind::Return
        } else {
            RefKind::Manual
        },
        id,
        leg: match input.direction {
            MovementDirection::In => RefLeg::In,
            _ => RefLeg::Out,
        },
    });

    let service = StockLedgerService::new(state.db);
    let movement = service
        .post(NewMovement {
            material_id: input.material_id,
            warehouse_id: input.warehouse_id,
            order_id: input.order_id,
            supplier_id: input.supplier_id,
            direction: input.direction,
            quantity: input.quantity,
            date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
            delivery_note_no: input.delivery_note_no,
            note: input.note,
            reference,
        })
        .await?;
    Ok(Json(movement))
}

/// Movement history of a material
pub async fn get_movements(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = StockLedgerService::new(state.db);
    let movements = service.movements(material_id).await?;
    Ok(Json(movements))
}

/// Available stock per material with critical-threshold flags
pub async fn get_stock_summary(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StockSummaryEntry>>> {
    let service = StockLedgerService::new(state.db);
    let summary = service.stock_summary().await?;
    Ok(Json(summary))
}

/// Per-warehouse positive balances
pub async fn get_stock_report(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<WarehouseStockEntry>>> {
    let service = StockLedgerService::new(state.db);
    let report = service.stock_report().await?;
    Ok(Json(report))
}
