//! HTTP handlers for supplier settlement projections

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::allocation::{OpenItem, PaymentAllocationService};
use crate::services::statement::{StatementEntry, StatementService, SupplierBalance};
use crate::AppState;

/// Unpaid invoices and approved claims of a supplier, oldest first
pub async fn get_open_items(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Vec<OpenItem>>> {
    let service = PaymentAllocationService::new(state.db);
    let items = service.open_items(supplier_id).await?;
    Ok(Json(items))
}

/// Chronological account statement with a running balance
pub async fn get_statement(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Vec<StatementEntry>>> {
    let service = StatementService::new(state.db);
    let statement = service.statement(supplier_id).await?;
    Ok(Json(statement))
}

/// A supplier's net balance
pub async fn get_supplier_balance(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<SupplierBalance>> {
    let service = StatementService::new(state.db);
    let balance = service.supplier_balance(supplier_id).await?;
    Ok(Json(balance))
}
