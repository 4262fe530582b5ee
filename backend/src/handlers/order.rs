//! HTTP handlers for purchase orders, goods receipt and progress claims

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::billing::{CreateClaimInput, ProgressBillingService};
use crate::services::order::{OrderDetail, OrderList, OrderService, ReceiptInput, ReceiptOutcome};
use crate::AppState;
use shared::ProgressBilling;

/// List orders, split into open and settled
pub async fn list_orders(State(state): State<AppState>) -> AppResult<Json<OrderList>> {
    let service = OrderService::new(state.db);
    let orders = service.list_orders().await?;
    Ok(Json(orders))
}

/// One order with its projections
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service.get_order(order_id).await?;
    Ok(Json(order))
}

/// Receive goods from the vendor-virtual location into a real warehouse
pub async fn receive_goods(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ReceiptInput>,
) -> AppResult<Json<ReceiptOutcome>> {
    let service = OrderService::new(state.db);
    let outcome = service.receive_goods(order_id, input).await?;
    Ok(Json(outcome))
}

/// Create a progress claim against an order
pub async fn create_claim(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<CreateClaimInput>,
) -> AppResult<Json<ProgressBilling>> {
    let service = ProgressBillingService::new(state.db);
    let claim = service.create_claim(order_id, input).await?;
    Ok(Json(claim))
}

/// List an order's claims
pub async fn list_claims(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProgressBilling>>> {
    let service = ProgressBillingService::new(state.db);
    let claims = service.claims_for_order(order_id).await?;
    Ok(Json(claims))
}
