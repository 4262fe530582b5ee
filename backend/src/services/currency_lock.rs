//! Currency locking for quote approval
//!
//! At approval time a quote's local-currency totals are computed once and
//! frozen together with the exchange rate that produced them. Everything
//! downstream (orders, claims, settlement) reads the snapshot; a later rate
//! change can never move an approved contract's value.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{RateProvider, RateQuote};
use shared::finance::{round_rate, to_local, vat_breakdown, VatBreakdown};
use shared::types::Currency;
use shared::{LockSnapshot, Quote, QuoteStatus};

/// Currency lock service. The rate provider is injected so tests can pin the
/// rate and so caching stays outside this service.
#[derive(Clone)]
pub struct CurrencyLockService<R> {
    db: PgPool,
    rates: R,
}

/// The frozen local-currency result of a lock
#[derive(Debug, Clone, Serialize)]
pub struct LockedTotals {
    pub net_try: Decimal,
    pub vat_try: Decimal,
    pub gross_try: Decimal,
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub rate_source: String,
}

/// Result of approving a quote
#[derive(Debug, Clone, Serialize)]
pub struct ApproveOutcome {
    pub quote_id: Uuid,
    pub order_id: Uuid,
    pub totals: LockedTotals,
}

/// Financial fields of a quote row
#[derive(Debug, FromRow)]
struct QuoteRow {
    id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
    currency: String,
    vat_rate: i32,
    vat_inclusive: bool,
    manual_rate: Option<Decimal>,
    locked_rate: Option<Decimal>,
    locked_rate_date: Option<NaiveDate>,
    locked_rate_source: Option<String>,
    locked_net_try: Decimal,
    locked_vat_try: Decimal,
    locked_gross_try: Decimal,
}

impl QuoteRow {
    fn is_locked(&self) -> bool {
        self.locked_gross_try > Decimal::ZERO
    }

    fn stored_totals(&self) -> LockedTotals {
        LockedTotals {
            net_try: self.locked_net_try,
            vat_try: self.locked_vat_try,
            gross_try: self.locked_gross_try,
            rate: self.locked_rate.unwrap_or(Decimal::ONE),
            rate_date: self.locked_rate_date.unwrap_or_default(),
            rate_source: self
                .locked_rate_source
                .clone()
                .unwrap_or_else(|| "local".to_string()),
        }
    }
}

/// Full quote row for the read projection
#[derive(Debug, FromRow)]
struct QuoteDetailRow {
    id: Uuid,
    supplier_id: Uuid,
    material_id: Option<Uuid>,
    work_item_id: Option<Uuid>,
    quantity: Decimal,
    unit_price: Decimal,
    currency: String,
    vat_rate: i32,
    vat_inclusive: bool,
    manual_rate: Option<Decimal>,
    status: String,
    locked_rate: Option<Decimal>,
    locked_rate_date: Option<NaiveDate>,
    locked_rate_source: Option<String>,
    locked_net_try: Decimal,
    locked_vat_try: Decimal,
    locked_gross_try: Decimal,
    locked_at: Option<chrono::DateTime<Utc>>,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<QuoteDetailRow> for Quote {
    type Error = AppError;

    fn try_from(row: QuoteDetailRow) -> Result<Self, Self::Error> {
        let lock = match (row.locked_at, row.locked_rate, row.locked_rate_source) {
            (Some(locked_at), Some(rate), Some(rate_source)) => Some(LockSnapshot {
                rate,
                rate_date: row.locked_rate_date,
                rate_source,
                net_try: row.locked_net_try,
                vat_try: row.locked_vat_try,
                gross_try: row.locked_gross_try,
                locked_at,
            }),
            _ => None,
        };

        Ok(Quote {
            id: row.id,
            supplier_id: row.supplier_id,
            material_id: row.material_id,
            work_item_id: row.work_item_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            currency: row.currency,
            vat_rate: row.vat_rate,
            vat_inclusive: row.vat_inclusive,
            manual_rate: row.manual_rate,
            status: QuoteStatus::parse(&row.status)
                .ok_or_else(|| AppError::Internal(format!("bad quote status: {}", row.status)))?,
            lock,
            created_at: row.created_at,
        })
    }
}

const QUOTE_FOR_UPDATE: &str = r#"
    SELECT id, quantity, unit_price, currency, vat_rate, vat_inclusive,
           manual_rate, locked_rate, locked_rate_date, locked_rate_source,
           locked_net_try, locked_vat_try, locked_gross_try
    FROM quotes
    WHERE id = $1
    FOR UPDATE
"#;

/// Resolve the exchange rate for a lock. A manually entered rate wins over
/// the provider; the local currency is always 1.0000. A missing rate is an
/// error — the early habit of defaulting to 1.0 silently understated every
/// foreign-currency contract.
pub(crate) async fn resolve_rate<R: RateProvider>(
    provider: &R,
    currency_code: &str,
    manual_rate: Option<Decimal>,
    as_of: Option<NaiveDate>,
) -> AppResult<RateQuote> {
    let currency = Currency::parse(currency_code).ok_or_else(|| AppError::Validation {
        field: "currency".to_string(),
        message: format!("Unsupported currency: {}", currency_code),
        message_tr: format!("Desteklenmeyen para birimi: {}", currency_code),
    })?;

    if currency.is_local() {
        return Ok(RateQuote {
            rate: Decimal::new(10000, 4),
            source: "local".to_string(),
        });
    }

    if let Some(manual) = manual_rate.filter(|r| *r > Decimal::ZERO) {
        return Ok(RateQuote {
            rate: round_rate(manual),
            source: "manual".to_string(),
        });
    }

    provider.rate(currency, as_of).await
}

impl<R: RateProvider> CurrencyLockService<R> {
    /// Create a new CurrencyLockService instance
    pub fn new(db: PgPool, rates: R) -> Self {
        Self { db, rates }
    }

    /// Compute and freeze a quote's TRY totals.
    ///
    /// Idempotent: a locked quote returns its stored snapshot untouched
    /// unless `force` is set (e.g. after correcting a mis-entered rate).
    pub async fn lock_quote(
        &self,
        quote_id: Uuid,
        as_of: Option<NaiveDate>,
        force: bool,
    ) -> AppResult<LockedTotals> {
        let mut tx = self.db.begin().await?;
        let totals = self.lock_in_tx(&mut tx, quote_id, as_of, force).await?;
        tx.commit().await?;
        Ok(totals)
    }

    /// Approve a quote: lock its currency and create the one-to-one purchase
    /// order, all under one row lock so two concurrent approvals cannot both
    /// pass.
    pub async fn approve_quote(
        &self,
        quote_id: Uuid,
        as_of: Option<NaiveDate>,
    ) -> AppResult<ApproveOutcome> {
        let mut tx = self.db.begin().await?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM quotes WHERE id = $1 FOR UPDATE",
        )
        .bind(quote_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Quote".to_string()))?;

        if status == "approved" {
            return Err(AppError::Conflict {
                resource: "quote".to_string(),
                message: "Quote is already approved".to_string(),
                message_tr: "Bu teklif zaten onaylanmış! İkinci onaya izin verilmez.".to_string(),
            });
        }

        let totals = self.lock_in_tx(&mut tx, quote_id, as_of, false).await?;

        sqlx::query("UPDATE quotes SET status = 'approved' WHERE id = $1")
            .bind(quote_id)
            .execute(&mut *tx)
            .await?;

        let quantity = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity FROM quotes WHERE id = $1",
        )
        .bind(quote_id)
        .fetch_one(&mut *tx)
        .await?;

        // One order per approved quote; an earlier order survives a re-lock.
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (quote_id, order_date, ordered_quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (quote_id) DO NOTHING
            "#,
        )
        .bind(quote_id)
        .bind(Utc::now().date_naive())
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        let order_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM purchase_orders WHERE quote_id = $1",
        )
        .bind(quote_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ApproveOutcome {
            quote_id,
            order_id,
            totals,
        })
    }

    /// A quote with its lock snapshot, if any.
    pub async fn get_quote(&self, quote_id: Uuid) -> AppResult<Quote> {
        let row = sqlx::query_as::<_, QuoteDetailRow>(
            r#"
            SELECT id, supplier_id, material_id, work_item_id, quantity, unit_price,
                   currency, vat_rate, vat_inclusive, manual_rate, status,
                   locked_rate, locked_rate_date, locked_rate_source,
                   locked_net_try, locked_vat_try, locked_gross_try, locked_at,
                   created_at
            FROM quotes
            WHERE id = $1
            "#,
        )
        .bind(quote_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Quote".to_string()))?;

        row.try_into()
    }

    async fn lock_in_tx(
        &self,
        conn: &mut PgConnection,
        quote_id: Uuid,
        as_of: Option<NaiveDate>,
        force: bool,
    ) -> AppResult<LockedTotals> {
        let quote = sqlx::query_as::<_, QuoteRow>(QUOTE_FOR_UPDATE)
            .bind(quote_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Quote".to_string()))?;

        if quote.is_locked() && !force {
            return Ok(quote.stored_totals());
        }

        let original: VatBreakdown = vat_breakdown(
            quote.quantity,
            quote.unit_price,
            quote.vat_rate,
            quote.vat_inclusive,
        );

        let resolved =
            resolve_rate(&self.rates, &quote.currency, quote.manual_rate, as_of).await?;
        let local = to_local(&original, resolved.rate);
        let rate_date = as_of.unwrap_or_else(|| Utc::now().date_naive());

        sqlx::query(
            r#"
            UPDATE quotes
            SET locked_rate = $1, locked_rate_date = $2, locked_rate_source = $3,
                locked_net_try = $4, locked_vat_try = $5, locked_gross_try = $6,
                locked_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(resolved.rate)
        .bind(rate_date)
        .bind(&resolved.source)
        .bind(local.net)
        .bind(local.vat)
        .bind(local.gross)
        .bind(quote.id)
        .execute(&mut *conn)
        .await?;

        tracing::info!(
            "Locked quote {} at {} ({}): net {} TRY, gross {} TRY",
            quote.id,
            resolved.rate,
            resolved.source,
            local.net,
            local.gross
        );

        Ok(LockedTotals {
            net_try: local.net,
            vat_try: local.vat,
            gross_try: local.gross,
            rate: resolved.rate,
            rate_date,
            rate_source: resolved.source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    struct FixedProvider {
        rate: Decimal,
    }

    impl RateProvider for FixedProvider {
        async fn rate(&self, _: Currency, _: Option<NaiveDate>) -> AppResult<RateQuote> {
            Ok(RateQuote {
                rate: self.rate,
                source: "fixed".to_string(),
            })
        }
    }

    struct NoRates;

    impl RateProvider for NoRates {
        async fn rate(&self, currency: Currency, date: Option<NaiveDate>) -> AppResult<RateQuote> {
            Err(AppError::RateUnavailable {
                currency: currency.code().to_string(),
                date,
            })
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn local_currency_is_always_one() {
        let quote = resolve_rate(&NoRates, "TRY", None, None).await.unwrap();
        assert_eq!(quote.rate, dec("1.0000"));
        assert_eq!(quote.source, "local");
    }

    #[tokio::test]
    async fn manual_rate_beats_the_provider() {
        let provider = FixedProvider { rate: dec("30") };
        let quote = resolve_rate(&provider, "USD", Some(dec("32.5")), None)
            .await
            .unwrap();
        assert_eq!(quote.rate, dec("32.5000"));
        assert_eq!(quote.source, "manual");
    }

    #[tokio::test]
    async fn zero_manual_rate_is_ignored() {
        let provider = FixedProvider { rate: dec("30") };
        let quote = resolve_rate(&provider, "USD", Some(Decimal::ZERO), None)
            .await
            .unwrap();
        assert_eq!(quote.rate, dec("30"));
        assert_eq!(quote.source, "fixed");
    }

    #[tokio::test]
    async fn missing_rate_is_an_error_not_a_default() {
        let err = resolve_rate(&NoRates, "USD", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::RateUnavailable { .. }));
    }

    #[tokio::test]
    async fn unknown_currency_is_rejected() {
        let err = resolve_rate(&NoRates, "CHF", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
