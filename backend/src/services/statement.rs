//! Supplier account statement (cari ekstre)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Statement service
#[derive(Clone)]
pub struct StatementService {
    db: PgPool,
}

/// One statement row: invoices and approved claims debit the account,
/// payments credit it.
#[derive(Debug, Clone, Serialize)]
pub struct StatementEntry {
    pub date: NaiveDate,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

/// A supplier's net position
#[derive(Debug, Clone, Serialize)]
pub struct SupplierBalance {
    pub supplier_id: Uuid,
    pub total_debit: Decimal,
    pub total_paid: Decimal,
    pub balance: Decimal,
}

impl StatementService {
    /// Create a new StatementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Chronological statement with a running balance.
    pub async fn statement(&self, supplier_id: Uuid) -> AppResult<Vec<StatementEntry>> {
        self.ensure_supplier(supplier_id).await?;

        let mut entries: Vec<(NaiveDate, String, Decimal, Decimal)> = Vec::new();

        let invoices = sqlx::query_as::<_, (NaiveDate, String, Decimal)>(
            "SELECT date, invoice_no, gross_total FROM invoices WHERE supplier_id = $1",
        )
        .bind(supplier_id)
        .fetch_all(&self.db)
        .await?;
        for (date, invoice_no, gross) in invoices {
            entries.push((date, format!("Fatura #{}", invoice_no), gross, Decimal::ZERO));
        }

        let claims = sqlx::query_as::<_, (NaiveDate, i32, Decimal)>(
            r#"
            SELECT pb.date, pb.claim_no, pb.net_payable
            FROM progress_billings pb
            JOIN purchase_orders po ON po.id = pb.order_id
            JOIN quotes q ON q.id = po.quote_id
            WHERE q.supplier_id = $1 AND pb.approved = TRUE
            "#,
        )
        .bind(supplier_id)
        .fetch_all(&self.db)
        .await?;
        for (date, claim_no, net) in claims {
            entries.push((date, format!("Hakediş #{}", claim_no), net, Decimal::ZERO));
        }

        let payments = sqlx::query_as::<_, (NaiveDate, String, Decimal)>(
            "SELECT date, method, amount FROM payments WHERE supplier_id = $1",
        )
        .bind(supplier_id)
        .fetch_all(&self.db)
        .await?;
        for (date, method, amount) in payments {
            entries.push((date, format!("Ödeme ({})", method), Decimal::ZERO, amount));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut balance = Decimal::ZERO;
        Ok(entries
            .into_iter()
            .map(|(date, description, debit, credit)| {
                balance += debit - credit;
                StatementEntry {
                    date,
                    description,
                    debit,
                    credit,
                    balance,
                }
            })
            .collect())
    }

    /// Net balance: invoices plus approved claims minus everything paid.
    pub async fn supplier_balance(&self, supplier_id: Uuid) -> AppResult<SupplierBalance> {
        self.ensure_supplier(supplier_id).await?;

        let invoice_debit = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(gross_total), 0) FROM invoices WHERE supplier_id = $1",
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        let claim_debit = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(pb.net_payable), 0)
            FROM progress_billings pb
            JOIN purchase_orders po ON po.id = pb.order_id
            JOIN quotes q ON q.id = po.quote_id
            WHERE q.supplier_id = $1 AND pb.approved = TRUE
            "#,
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        let total_paid = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE supplier_id = $1",
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        let total_debit = invoice_debit + claim_debit;
        Ok(SupplierBalance {
            supplier_id,
            total_debit,
            total_paid,
            balance: total_debit - total_paid,
        })
    }

    async fn ensure_supplier(&self, supplier_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        Ok(())
    }
}
