//! HTTP handler for warehouse transfers

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::transfer::{TransferInput, TransferOutcome, TransferService};
use crate::AppState;

/// Execute a dual-leg warehouse transfer
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(input): Json<TransferInput>,
) -> AppResult<Json<TransferOutcome>> {
    let service = TransferService::new(state.db);
    let outcome = service.transfer(input).await?;
    Ok(Json(outcome))
}
