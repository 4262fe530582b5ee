//! HTTP handlers for supplier invoices

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::invoice::{
    InvoiceDetail, InvoiceHeaderInput, InvoiceService, ManualInvoiceInput,
};
use crate::AppState;

/// Invoice an order from its quote data
pub async fn create_order_invoice(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<InvoiceHeaderInput>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db);
    let invoice = service.create_from_order(order_id, input).await?;
    Ok(Json(invoice))
}

/// Record a free-form invoice with explicit lines
pub async fn create_manual_invoice(
    State(state): State<AppState>,
    Json(input): Json<ManualInvoiceInput>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db);
    let invoice = service.create_manual(input).await?;
    Ok(Json(invoice))
}

/// An invoice with lines and settlement position
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<InvoiceDetail>> {
    let service = InvoiceService::new(state.db);
    let invoice = service.get_invoice(invoice_id).await?;
    Ok(Json(invoice))
}

/// Delete an invoice, its ledger entries and its allocations
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = InvoiceService::new(state.db);
    service.delete_invoice(invoice_id).await?;
    Ok(Json(()))
}
