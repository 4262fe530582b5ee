//! Payment allocation and advance tracking
//!
//! A payment is distributed FIFO over selected invoices and approved claims.
//! Allocations are written once and never mutated; a target's paid-to-date
//! and a payment's unallocated advance are always sums over the allocation
//! rows, so deleting a payment needs no counter fix-up anywhere.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    validate_positive_amount, AllocationTargetKind, Payment, PaymentAllocation, PaymentMethod,
};

/// Open balances below one kuruş count as settled.
const DUST_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Payment allocation service
#[derive(Clone)]
pub struct PaymentAllocationService {
    db: PgPool,
}

/// One target of an allocation run, in payment order
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AllocationTargetRef {
    pub kind: AllocationTargetKind,
    pub id: Uuid,
}

/// Input for recording a payment
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentInput {
    pub supplier_id: Uuid,
    /// Direct claim link when paying a specific hakediş.
    pub claim_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub method: Option<PaymentMethod>,
    pub amount: Decimal,
    pub bank_name: Option<String>,
    pub cheque_no: Option<String>,
    pub cheque_due_date: Option<NaiveDate>,
    pub note: Option<String>,
    /// Explicit settlement order. Defaults to the direct claim, then the
    /// supplier's open items oldest-first.
    pub targets: Option<Vec<AllocationTargetRef>>,
}

/// Result of an allocation run
#[derive(Debug, Clone, Serialize)]
pub struct AllocationOutcome {
    pub payment_id: Uuid,
    pub allocations: Vec<PaymentAllocation>,
    /// Unallocated remainder: the payment's advance balance.
    pub remainder: Decimal,
}

/// An unpaid invoice or approved claim of a supplier
#[derive(Debug, Clone, Serialize)]
pub struct OpenItem {
    pub kind: AllocationTargetKind,
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    pub total: Decimal,
    pub remaining: Decimal,
}

/// A payment's advance position
#[derive(Debug, Clone, Serialize)]
pub struct AdvancePosition {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub allocated: Decimal,
    pub advance: Decimal,
}

#[derive(Debug, FromRow)]
struct AllocationRow {
    id: Uuid,
    payment_id: Uuid,
    target_kind: String,
    target_id: Uuid,
    amount: Decimal,
    date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<AllocationRow> for PaymentAllocation {
    type Error = AppError;

    fn try_from(row: AllocationRow) -> Result<Self, Self::Error> {
        Ok(PaymentAllocation {
            id: row.id,
            payment_id: row.payment_id,
            target_kind: AllocationTargetKind::parse(&row.target_kind)
                .ok_or_else(|| AppError::Internal(format!("bad target kind: {}", row.target_kind)))?,
            target_id: row.target_id,
            amount: row.amount,
            date: row.date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    supplier_id: Uuid,
    claim_id: Option<Uuid>,
    date: NaiveDate,
    method: String,
    amount: Decimal,
    bank_name: Option<String>,
    cheque_no: Option<String>,
    cheque_due_date: Option<NaiveDate>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            supplier_id: row.supplier_id,
            claim_id: row.claim_id,
            date: row.date,
            method: PaymentMethod::parse(&row.method)
                .ok_or_else(|| AppError::Internal(format!("bad payment method: {}", row.method)))?,
            amount: row.amount,
            bank_name: row.bank_name,
            cheque_no: row.cheque_no,
            cheque_due_date: row.cheque_due_date,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

/// Sum of allocations already recorded against one target.
async fn paid_to_target(
    conn: &mut PgConnection,
    kind: AllocationTargetKind,
    target_id: Uuid,
) -> AppResult<Decimal> {
    let paid = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM payment_allocations WHERE target_kind = $1 AND target_id = $2",
    )
    .bind(kind.as_str())
    .bind(target_id)
    .fetch_one(conn)
    .await?;
    Ok(paid)
}

/// Sum of allocations already recorded for one payment.
async fn allocated_of_payment(conn: &mut PgConnection, payment_id: Uuid) -> AppResult<Decimal> {
    let allocated = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM payment_allocations WHERE payment_id = $1",
    )
    .bind(payment_id)
    .fetch_one(conn)
    .await?;
    Ok(allocated)
}

/// Gross outstanding total of a target: invoice gross or claim net payable.
/// Unapproved claims and foreign suppliers' documents are rejected.
async fn target_total(
    conn: &mut PgConnection,
    supplier_id: Uuid,
    target: &AllocationTargetRef,
) -> AppResult<Decimal> {
    match target.kind {
        AllocationTargetKind::Invoice => {
            let (total, owner) = sqlx::query_as::<_, (Decimal, Uuid)>(
                "SELECT gross_total, supplier_id FROM invoices WHERE id = $1",
            )
            .bind(target.id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

            if owner != supplier_id {
                return Err(AppError::Validation {
                    field: "targets".to_string(),
                    message: "Invoice belongs to another supplier".to_string(),
                    message_tr: "Fatura başka bir tedarikçiye ait".to_string(),
                });
            }
            Ok(total)
        }
        AllocationTargetKind::Claim => {
            let (total, approved, owner) = sqlx::query_as::<_, (Decimal, bool, Uuid)>(
                r#"
                SELECT pb.net_payable, pb.approved, q.supplier_id
                FROM progress_billings pb
                JOIN purchase_orders po ON po.id = pb.order_id
                JOIN quotes q ON q.id = po.quote_id
                WHERE pb.id = $1
                "#,
            )
            .bind(target.id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Progress claim".to_string()))?;

            if owner != supplier_id {
                return Err(AppError::Validation {
                    field: "targets".to_string(),
                    message: "Claim belongs to another supplier".to_string(),
                    message_tr: "Hakediş başka bir tedarikçiye ait".to_string(),
                });
            }
            // Only approved claims are payable; an unapproved one simply has
            // no open balance yet.
            Ok(if approved { total } else { Decimal::ZERO })
        }
    }
}

/// The FIFO distribution loop. Consumes the payment's current unallocated
/// remainder, so first allocation and later advance matching are the same
/// operation and the run is safe to repeat.
async fn allocate_in_tx(
    conn: &mut PgConnection,
    payment_id: Uuid,
    supplier_id: Uuid,
    payment_amount: Decimal,
    payment_date: NaiveDate,
    targets: &[AllocationTargetRef],
) -> AppResult<(Vec<PaymentAllocation>, Decimal)> {
    let mut remaining = payment_amount - allocated_of_payment(conn, payment_id).await?;
    let mut written = Vec::new();

    for target in targets {
        if remaining <= Decimal::ZERO {
            break;
        }

        let total = target_total(conn, supplier_id, target).await?;
        let due = total - paid_to_target(conn, target.kind, target.id).await?;
        if due <= Decimal::ZERO {
            continue;
        }

        let pay = if remaining >= due { due } else { remaining };

        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            INSERT INTO payment_allocations (payment_id, target_kind, target_id, amount, date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, payment_id, target_kind, target_id, amount, date, created_at
            "#,
        )
        .bind(payment_id)
        .bind(target.kind.as_str())
        .bind(target.id)
        .bind(pay)
        .bind(payment_date)
        .fetch_one(&mut *conn)
        .await?;

        written.push(row.try_into()?);
        remaining -= pay;
    }

    Ok((written, remaining))
}

impl PaymentAllocationService {
    /// Create a new PaymentAllocationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a payment and distribute it over its targets in one
    /// transaction. Whatever stays unallocated is the payment's advance.
    pub async fn create_payment(&self, input: CreatePaymentInput) -> AppResult<AllocationOutcome> {
        if let Err(msg) = validate_positive_amount(input.amount) {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: msg.to_string(),
                message_tr: "Tutar 0'dan büyük olmalıdır".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let supplier_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
        )
        .bind(input.supplier_id)
        .fetch_one(&mut *tx)
        .await?;
        if !supplier_exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());
        let method = input.method.unwrap_or_default();

        // Cheques mature on the payment date unless told otherwise.
        let cheque_due_date = match method {
            PaymentMethod::Cheque => Some(input.cheque_due_date.unwrap_or(date)),
            _ => input.cheque_due_date,
        };

        let payment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO payments (supplier_id, claim_id, date, method, amount,
                                  bank_name, cheque_no, cheque_due_date, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(input.supplier_id)
        .bind(input.claim_id)
        .bind(date)
        .bind(method.as_str())
        .bind(input.amount)
        .bind(&input.bank_name)
        .bind(&input.cheque_no)
        .bind(cheque_due_date)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        let targets = match input.targets {
            Some(targets) => targets,
            None => match input.claim_id {
                Some(claim_id) => vec![AllocationTargetRef {
                    kind: AllocationTargetKind::Claim,
                    id: claim_id,
                }],
                None => open_targets(&mut tx, input.supplier_id).await?,
            },
        };

        let (allocations, remainder) = allocate_in_tx(
            &mut tx,
            payment_id,
            input.supplier_id,
            input.amount,
            date,
            &targets,
        )
        .await?;

        tx.commit().await?;

        Ok(AllocationOutcome {
            payment_id,
            allocations,
            remainder,
        })
    }

    /// Re-run the FIFO loop for an existing payment against new targets,
    /// consuming only its unallocated advance. Safe to call repeatedly.
    pub async fn match_advance(
        &self,
        payment_id: Uuid,
        targets: Vec<AllocationTargetRef>,
    ) -> AppResult<AllocationOutcome> {
        let mut tx = self.db.begin().await?;

        let payment = sqlx::query_as::<_, (Uuid, Decimal, NaiveDate)>(
            "SELECT supplier_id, amount, date FROM payments WHERE id = $1",
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment".to_string()))?;

        let (allocations, remainder) =
            allocate_in_tx(&mut tx, payment_id, payment.0, payment.1, payment.2, &targets).await?;

        tx.commit().await?;

        Ok(AllocationOutcome {
            payment_id,
            allocations,
            remainder,
        })
    }

    /// A payment's amount, allocated total and advance remainder.
    pub async fn advance_remainder(&self, payment_id: Uuid) -> AppResult<AdvancePosition> {
        let mut conn = self.db.acquire().await?;

        let amount = sqlx::query_scalar::<_, Decimal>(
            "SELECT amount FROM payments WHERE id = $1",
        )
        .bind(payment_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment".to_string()))?;

        let allocated = allocated_of_payment(&mut conn, payment_id).await?;

        Ok(AdvancePosition {
            payment_id,
            amount,
            allocated,
            advance: amount - allocated,
        })
    }

    /// Delete a payment and its allocations. Paid-to-date figures re-derive
    /// themselves because nothing stores them.
    pub async fn delete_payment(&self, payment_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE id = $1)",
        )
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Payment".to_string()));
        }

        sqlx::query("DELETE FROM payment_allocations WHERE payment_id = $1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// A payment with its allocations.
    pub async fn get_payment(&self, payment_id: Uuid) -> AppResult<(Payment, Vec<PaymentAllocation>)> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, supplier_id, claim_id, date, method, amount,
                   bank_name, cheque_no, cheque_due_date, note, created_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment".to_string()))?;

        let allocations = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, payment_id, target_kind, target_id, amount, date, created_at
            FROM payment_allocations
            WHERE payment_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(payment_id)
        .fetch_all(&self.db)
        .await?;

        Ok((
            row.try_into()?,
            allocations
                .into_iter()
                .map(TryInto::try_into)
                .collect::<AppResult<Vec<_>>>()?,
        ))
    }

    /// Unpaid invoices and approved claims of a supplier, oldest first —
    /// both the payment screen's debt list and the default FIFO order.
    pub async fn open_items(&self, supplier_id: Uuid) -> AppResult<Vec<OpenItem>> {
        let mut conn = self.db.acquire().await?;
        open_items_in_conn(&mut conn, supplier_id).await
    }
}

async fn open_items_in_conn(
    conn: &mut PgConnection,
    supplier_id: Uuid,
) -> AppResult<Vec<OpenItem>> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
    )
    .bind(supplier_id)
    .fetch_one(&mut *conn)
    .await?;
    if !exists {
        return Err(AppError::NotFound("Supplier".to_string()));
    }

    let mut items = Vec::new();

    let invoices = sqlx::query_as::<_, (Uuid, NaiveDate, String, Decimal)>(
        r#"
        SELECT id, date, invoice_no, gross_total
        FROM invoices
        WHERE supplier_id = $1
        ORDER BY date ASC, created_at ASC
        "#,
    )
    .bind(supplier_id)
    .fetch_all(&mut *conn)
    .await?;

    for (id, date, invoice_no, total) in invoices {
        let remaining = total - paid_to_target(conn, AllocationTargetKind::Invoice, id).await?;
        if remaining > DUST_THRESHOLD {
            items.push(OpenItem {
                kind: AllocationTargetKind::Invoice,
                id,
                date,
                description: format!("Fatura #{}", invoice_no),
                total,
                remaining,
            });
        }
    }

    let claims = sqlx::query_as::<_, (Uuid, NaiveDate, i32, Decimal)>(
        r#"
        SELECT pb.id, pb.date, pb.claim_no, pb.net_payable
        FROM progress_billings pb
        JOIN purchase_orders po ON po.id = pb.order_id
        JOIN quotes q ON q.id = po.quote_id
        WHERE q.supplier_id = $1 AND pb.approved = TRUE
        ORDER BY pb.date ASC, pb.created_at ASC
        "#,
    )
    .bind(supplier_id)
    .fetch_all(&mut *conn)
    .await?;

    for (id, date, claim_no, total) in claims {
        let remaining = total - paid_to_target(conn, AllocationTargetKind::Claim, id).await?;
        if remaining > DUST_THRESHOLD {
            items.push(OpenItem {
                kind: AllocationTargetKind::Claim,
                id,
                date,
                description: format!("Hakediş #{}", claim_no),
                total,
                remaining,
            });
        }
    }

    items.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(items)
}

/// Open items reduced to allocation targets, oldest first.
async fn open_targets(
    conn: &mut PgConnection,
    supplier_id: Uuid,
) -> AppResult<Vec<AllocationTargetRef>> {
    let items = open_items_in_conn(conn, supplier_id).await?;
    Ok(items
        .into_iter()
        .map(|item| AllocationTargetRef {
            kind: item.kind,
            id: item.id,
        })
        .collect())
}
