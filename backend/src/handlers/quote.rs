//! HTTP handlers for quote approval and currency locking

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::currency_lock::{ApproveOutcome, CurrencyLockService, LockedTotals};
use crate::AppState;
use shared::Quote;

#[derive(Debug, Default, Deserialize)]
pub struct ApproveQuoteInput {
    /// Rate date to lock with; defaults to today's bulletin.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LockQuoteInput {
    pub as_of: Option<NaiveDate>,
    /// Recompute an existing snapshot (e.g. after a rate correction).
    #[serde(default)]
    pub force: bool,
}

/// A quote with its lock snapshot
pub async fn get_quote(
    State(state): State<AppState>,
    Path(quote_id): Path<Uuid>,
) -> AppResult<Json<Quote>> {
    let service = CurrencyLockService::new(state.db, state.rates);
    let quote = service.get_quote(quote_id).await?;
    Ok(Json(quote))
}

/// Approve a quote: lock its TRY totals and create the purchase order
pub async fn approve_quote(
    State(state): State<AppState>,
    Path(quote_id): Path<Uuid>,
    Json(input): Json<ApproveQuoteInput>,
) -> AppResult<Json<ApproveOutcome>> {
    let service = CurrencyLockService::new(state.db, state.rates);
    let outcome = service.approve_quote(quote_id, input.as_of).await?;
    Ok(Json(outcome))
}

/// Lock (or forcibly re-lock) a quote's TRY totals
pub async fn lock_quote(
    State(state): State<AppState>,
    Path(quote_id): Path<Uuid>,
    Json(input): Json<LockQuoteInput>,
) -> AppResult<Json<LockedTotals>> {
    let service = CurrencyLockService::new(state.db, state.rates);
    let totals = service
        .lock_quote(quote_id, input.as_of, input.force)
        .await?;
    Ok(Json(totals))
}
