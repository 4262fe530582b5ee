//! Progress billing (hakediş) engine
//!
//! Claims a percentage of an approved contract per period. The cumulative
//! percentage over one order is hard-capped at 100; creation serializes on a
//! row lock of the order so concurrent claims cannot squeeze past the cap
//! together. All amounts derive from the quote's locked TRY totals.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::finance::{claim_amounts, remaining_headroom};
use shared::{
    validate_claim_percentage, validate_non_negative, validate_percentage, validate_vat_rate,
    DeliveryStatus, ProgressBilling,
};

/// Progress billing service
#[derive(Clone)]
pub struct ProgressBillingService {
    db: PgPool,
}

/// Input for creating a progress claim
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClaimInput {
    /// Progress claimed this period, percent of the whole contract.
    pub percentage: Decimal,
    /// Stopaj percentage withheld at source.
    pub withholding_rate: Option<Decimal>,
    /// Teminat percentage retained until acceptance.
    pub retention_rate: Option<Decimal>,
    pub advance_deduction: Option<Decimal>,
    pub other_deductions: Option<Decimal>,
    /// Defaults to the contract quote's VAT rate.
    pub vat_rate: Option<i32>,
    pub date: Option<NaiveDate>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Database row for a claim
#[derive(Debug, FromRow)]
struct BillingRow {
    id: Uuid,
    order_id: Uuid,
    claim_no: i32,
    date: NaiveDate,
    period_start: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
    description: Option<String>,
    percentage: Decimal,
    gross_amount: Decimal,
    vat_rate: i32,
    vat_amount: Decimal,
    withholding_rate: Decimal,
    withholding_amount: Decimal,
    retention_rate: Decimal,
    retention_amount: Decimal,
    advance_deduction: Decimal,
    other_deductions: Decimal,
    net_payable: Decimal,
    approved: bool,
    created_at: DateTime<Utc>,
}

impl From<BillingRow> for ProgressBilling {
    fn from(row: BillingRow) -> Self {
        ProgressBilling {
            id: row.id,
            order_id: row.order_id,
            claim_no: row.claim_no,
            date: row.date,
            period_start: row.period_start,
            period_end: row.period_end,
            description: row.description,
            percentage: row.percentage,
            gross_amount: row.gross_amount,
            vat_rate: row.vat_rate,
            vat_amount: row.vat_amount,
            withholding_rate: row.withholding_rate,
            withholding_amount: row.withholding_amount,
            retention_rate: row.retention_rate,
            retention_amount: row.retention_amount,
            advance_deduction: row.advance_deduction,
            other_deductions: row.other_deductions,
            net_payable: row.net_payable,
            approved: row.approved,
            created_at: row.created_at,
        }
    }
}

const BILLING_COLUMNS: &str = r#"
    id, order_id, claim_no, date, period_start, period_end, description,
    percentage, gross_amount, vat_rate, vat_amount,
    withholding_rate, withholding_amount, retention_rate, retention_amount,
    advance_deduction, other_deductions, net_payable, approved, created_at
"#;

impl ProgressBillingService {
    /// Create a new ProgressBillingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create and approve a progress claim against an order.
    pub async fn create_claim(
        &self,
        order_id: Uuid,
        input: CreateClaimInput,
    ) -> AppResult<ProgressBilling> {
        if let Err(msg) = validate_claim_percentage(input.percentage) {
            return Err(AppError::Validation {
                field: "percentage".to_string(),
                message: msg.to_string(),
                message_tr: "İlerleme oranı 0 ile 100 arasında olmalıdır".to_string(),
            });
        }

        let withholding_rate = input.withholding_rate.unwrap_or(Decimal::ZERO);
        let retention_rate = input.retention_rate.unwrap_or(Decimal::ZERO);
        let advance_deduction = input.advance_deduction.unwrap_or(Decimal::ZERO);
        let other_deductions = input.other_deductions.unwrap_or(Decimal::ZERO);

        for (field, value) in [
            ("withholding_rate", withholding_rate),
            ("retention_rate", retention_rate),
        ] {
            if let Err(msg) = validate_percentage(value) {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: msg.to_string(),
                    message_tr: "Oran 0 ile 100 arasında olmalıdır".to_string(),
                });
            }
        }
        for (field, value) in [
            ("advance_deduction", advance_deduction),
            ("other_deductions", other_deductions),
        ] {
            if let Err(msg) = validate_non_negative(value) {
                return Err(AppError::Validation {
                    field: field.to_string(),
                    message: msg.to_string(),
                    message_tr: "Kesinti negatif olamaz".to_string(),
                });
            }
        }

        if let Some(vat_rate) = input.vat_rate {
            if let Err(msg) = validate_vat_rate(vat_rate) {
                return Err(AppError::Validation {
                    field: "vat_rate".to_string(),
                    message: msg.to_string(),
                    message_tr: "Geçersiz KDV oranı".to_string(),
                });
            }
        }

        let mut tx = self.db.begin().await?;

        // Serializes concurrent claim creation for the same order.
        let order = sqlx::query_as::<_, (Uuid, Uuid, Decimal, Decimal, Decimal)>(
            r#"
            SELECT id, quote_id, ordered_quantity, delivered_quantity, invoiced_quantity
            FROM purchase_orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let (quote_vat_rate, locked_net_try, locked_gross_try, work_item_id) =
            sqlx::query_as::<_, (i32, Decimal, Decimal, Option<Uuid>)>(
                r#"
                SELECT vat_rate, locked_net_try, locked_gross_try, work_item_id
                FROM quotes
                WHERE id = $1
                "#,
            )
            .bind(order.1)
            .fetch_one(&mut *tx)
            .await?;

        // The contract value comes from the lock snapshot alone; a quote
        // that was never locked cannot be billed against.
        if locked_gross_try <= Decimal::ZERO {
            return Err(AppError::MissingContractSnapshot);
        }

        let prior_total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(percentage), 0) FROM progress_billings WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        if prior_total + input.percentage > Decimal::ONE_HUNDRED {
            return Err(AppError::OverCapPercentage {
                remaining: remaining_headroom(prior_total),
            });
        }

        let vat_rate = input.vat_rate.unwrap_or(quote_vat_rate);
        let amounts = claim_amounts(
            locked_net_try,
            input.percentage,
            vat_rate,
            withholding_rate,
            retention_rate,
            advance_deduction,
            other_deductions,
        );

        let claim_no = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM progress_billings WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await? as i32
            + 1;

        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());

        let row = sqlx::query_as::<_, BillingRow>(&format!(
            r#"
            INSERT INTO progress_billings (
                order_id, claim_no, date, period_start, period_end, description,
                percentage, gross_amount, vat_rate, vat_amount,
                withholding_rate, withholding_amount, retention_rate, retention_amount,
                advance_deduction, other_deductions, net_payable, approved
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, TRUE)
            RETURNING {}
            "#,
            BILLING_COLUMNS
        ))
        .bind(order_id)
        .bind(claim_no)
        .bind(date)
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(&input.description)
        .bind(input.percentage)
        .bind(amounts.gross)
        .bind(vat_rate)
        .bind(amounts.vat)
        .bind(withholding_rate)
        .bind(amounts.withholding)
        .bind(retention_rate)
        .bind(amounts.retention)
        .bind(advance_deduction)
        .bind(other_deductions)
        .bind(amounts.net_payable)
        .fetch_one(&mut *tx)
        .await?;

        // Re-validate the cap after the write; a violation that slipped past
        // the lock under weaker isolation rolls the whole claim back.
        let total_after = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(percentage), 0) FROM progress_billings WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        if total_after > Decimal::ONE_HUNDRED {
            return Err(AppError::OverCapPercentage {
                remaining: remaining_headroom(prior_total),
            });
        }

        // Work-item contracts have no physical deliveries; the claim itself
        // advances the order's progress.
        if work_item_id.is_some() {
            let earned = order.2 * input.percentage / Decimal::ONE_HUNDRED;
            let delivered = order.3 + earned;
            let invoiced = order.4 + earned;
            let status = DeliveryStatus::derive(delivered, order.2);

            sqlx::query(
                r#"
                UPDATE purchase_orders
                SET delivered_quantity = $1, invoiced_quantity = $2, delivery_status = $3
                WHERE id = $4
                "#,
            )
            .bind(delivered)
            .bind(invoiced)
            .bind(status.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Claim #{} for order {}: {}% -> net payable {} TRY",
            claim_no,
            order_id,
            input.percentage,
            amounts.net_payable
        );

        Ok(row.into())
    }

    /// All claims of one order, oldest first.
    pub async fn claims_for_order(&self, order_id: Uuid) -> AppResult<Vec<ProgressBilling>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM purchase_orders WHERE id = $1)",
        )
        .bind(order_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Purchase order".to_string()));
        }

        let rows = sqlx::query_as::<_, BillingRow>(&format!(
            "SELECT {} FROM progress_billings WHERE order_id = $1 ORDER BY claim_no ASC",
            BILLING_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Cumulative claimed percentage and remaining headroom for an order.
    pub async fn claimed_so_far(&self, order_id: Uuid) -> AppResult<(Decimal, Decimal)> {
        let prior = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(percentage), 0) FROM progress_billings WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_one(&self.db)
        .await?;

        Ok((prior, remaining_headroom(prior)))
    }
}
