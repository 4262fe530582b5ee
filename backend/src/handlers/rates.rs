//! Exchange-rate lookup endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::external::RateProvider;
use crate::AppState;
use shared::types::Currency;

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    pub currency: String,
    /// Optional historical bulletin date (YYYY-MM-DD).
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub currency: String,
    pub date: Option<NaiveDate>,
    pub rate: Decimal,
    pub source: String,
}

/// Resolve a TRY rate for a currency, today's or historical
pub async fn get_rate(
    State(state): State<AppState>,
    Query(query): Query<RateQuery>,
) -> AppResult<Json<RateResponse>> {
    let currency = Currency::parse(&query.currency).ok_or_else(|| AppError::Validation {
        field: "currency".to_string(),
        message: format!("Unsupported currency: {}", query.currency),
        message_tr: format!("Desteklenmeyen para birimi: {}", query.currency),
    })?;

    let quote = state.rates.rate(currency, query.date).await?;

    Ok(Json(RateResponse {
        currency: currency.code().to_string(),
        date: query.date,
        rate: quote.rate,
        source: quote.source,
    }))
}
