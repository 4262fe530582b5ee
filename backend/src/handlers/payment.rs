//! HTTP handlers for payments and allocation

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::allocation::{
    AdvancePosition, AllocationOutcome, AllocationTargetRef, CreatePaymentInput,
    PaymentAllocationService,
};
use crate::AppState;
use shared::{Payment, PaymentAllocation};

#[derive(Debug, Serialize)]
pub struct PaymentDetail {
    #[serde(flatten)]
    pub payment: Payment,
    pub allocations: Vec<PaymentAllocation>,
}

/// Record a payment and allocate it FIFO over its targets
pub async fn create_payment(
    State(state): State<AppState>,
    Json(input): Json<CreatePaymentInput>,
) -> AppResult<Json<AllocationOutcome>> {
    let service = PaymentAllocationService::new(state.db);
    let outcome = service.create_payment(input).await?;
    Ok(Json(outcome))
}

/// A payment with its allocations
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<PaymentDetail>> {
    let service = PaymentAllocationService::new(state.db);
    let (payment, allocations) = service.get_payment(payment_id).await?;
    Ok(Json(PaymentDetail {
        payment,
        allocations,
    }))
}

/// Re-match a payment's unallocated advance against new targets
pub async fn match_advance(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(targets): Json<Vec<AllocationTargetRef>>,
) -> AppResult<Json<AllocationOutcome>> {
    let service = PaymentAllocationService::new(state.db);
    let outcome = service.match_advance(payment_id, targets).await?;
    Ok(Json(outcome))
}

/// A payment's advance position
pub async fn get_advance(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<AdvancePosition>> {
    let service = PaymentAllocationService::new(state.db);
    let position = service.advance_remainder(payment_id).await?;
    Ok(Json(position))
}

/// Delete a payment and its allocations
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = PaymentAllocationService::new(state.db);
    service.delete_payment(payment_id).await?;
    Ok(Json(()))
}
