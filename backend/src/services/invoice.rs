//! Supplier invoices
//!
//! Two entry paths, both in local currency: an order-backed invoice builds
//! its single line from the order's locked contract figures, a manual
//! invoice takes free-form lines. Material lines put the goods into the
//! vendor-virtual location, keyed `(invoice_line, line_id, IN)` so re-saving
//! a document can never double stock. Totals are recomputed from the lines
//! on every change and never touched by an exchange rate again.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::stock::{append_movement, NewMovement};
use shared::finance::round_currency;
use shared::{
    validate_vat_rate, Invoice, InvoiceLine, MovementDirection, MovementRef, RefKind, RefLeg,
};

/// Invoice service
#[derive(Clone)]
pub struct InvoiceService {
    db: PgPool,
}

/// Header fields for an order-backed invoice
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceHeaderInput {
    pub invoice_no: String,
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// One line of a manual invoice
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceLineInput {
    pub material_id: Option<Uuid>,
    pub description: Option<String>,
    pub quantity: Decimal,
    /// Net unit price, TRY.
    pub unit_price: Decimal,
    pub vat_rate: Option<i32>,
}

/// Input for a free-form (manual) invoice
#[derive(Debug, Clone, Deserialize)]
pub struct ManualInvoiceInput {
    pub supplier_id: Uuid,
    pub invoice_no: String,
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
    /// Where material lines enter stock; defaults to the vendor-virtual
    /// location.
    pub warehouse_id: Option<Uuid>,
    pub lines: Vec<InvoiceLineInput>,
}

/// An invoice with its lines and settlement position
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    pub paid: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    supplier_id: Uuid,
    order_id: Option<Uuid>,
    invoice_no: String,
    date: NaiveDate,
    net_total: Decimal,
    vat_total: Decimal,
    gross_total: Decimal,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            supplier_id: row.supplier_id,
            order_id: row.order_id,
            invoice_no: row.invoice_no,
            date: row.date,
            net_total: row.net_total,
            vat_total: row.vat_total,
            gross_total: row.gross_total,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    id: Uuid,
    invoice_id: Uuid,
    material_id: Option<Uuid>,
    description: Option<String>,
    quantity: Decimal,
    unit_price: Decimal,
    vat_rate: i32,
}

impl From<LineRow> for InvoiceLine {
    fn from(row: LineRow) -> Self {
        InvoiceLine {
            id: row.id,
            invoice_id: row.invoice_id,
            material_id: row.material_id,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            vat_rate: row.vat_rate,
        }
    }
}

/// Roll the line set up into the invoice header totals.
async fn recompute_totals(conn: &mut PgConnection, invoice_id: Uuid) -> AppResult<()> {
    let (net_raw, vat_raw) = sqlx::query_as::<_, (Decimal, Decimal)>(
        r#"
        SELECT COALESCE(SUM(quantity * unit_price), 0),
               COALESCE(SUM(quantity * unit_price *
                   (CASE WHEN vat_rate = -1 THEN 0 ELSE vat_rate END) / 100.0), 0)
        FROM invoice_lines
        WHERE invoice_id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_one(&mut *conn)
    .await?;

    let net = round_currency(net_raw);
    let vat = round_currency(vat_raw);

    sqlx::query(
        "UPDATE invoices SET net_total = $1, vat_total = $2, gross_total = $3 WHERE id = $4",
    )
    .bind(net)
    .bind(vat)
    .bind(net + vat)
    .bind(invoice_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// First vendor-virtual warehouse; required before invoiced goods can be
/// parked on the supplier.
async fn vendor_virtual_warehouse(conn: &mut PgConnection) -> AppResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM warehouses WHERE kind = 'vendor_virtual' ORDER BY created_at ASC LIMIT 1",
    )
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| {
        AppError::Configuration(
            "No vendor-virtual warehouse is defined; create one before invoicing".to_string(),
        )
    })
}

async fn fetch_detail(conn: &mut PgConnection, invoice_id: Uuid) -> AppResult<InvoiceDetail> {
    let invoice: Invoice = sqlx::query_as::<_, InvoiceRow>(
        r#"
        SELECT id, supplier_id, order_id, invoice_no, date, net_total, vat_total,
               gross_total, note, created_at
        FROM invoices
        WHERE id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?
    .into();

    let lines = sqlx::query_as::<_, LineRow>(
        r#"
        SELECT id, invoice_id, material_id, description, quantity, unit_price, vat_rate
        FROM invoice_lines
        WHERE invoice_id = $1
        ORDER BY id
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    let paid = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM payment_allocations WHERE target_kind = 'invoice' AND target_id = $1",
    )
    .bind(invoice_id)
    .fetch_one(&mut *conn)
    .await?;

    let remaining = invoice.gross_total - paid;

    Ok(InvoiceDetail {
        invoice,
        lines: lines.into_iter().map(Into::into).collect(),
        paid,
        remaining,
    })
}

impl InvoiceService {
    /// Create a new InvoiceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Invoice an order: the line is built from the order's quote, priced by
    /// the locked contract figures, and material stock enters the
    /// vendor-virtual location.
    pub async fn create_from_order(
        &self,
        order_id: Uuid,
        input: InvoiceHeaderInput,
    ) -> AppResult<InvoiceDetail> {
        if input.invoice_no.trim().is_empty() {
            return Err(AppError::Validation {
                field: "invoice_no".to_string(),
                message: "Invoice number is required".to_string(),
                message_tr: "Fatura numarası zorunludur".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, (Uuid, Uuid, Decimal, Decimal)>(
            r#"
            SELECT id, quote_id, ordered_quantity, invoiced_quantity
            FROM purchase_orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        #[allow(clippy::type_complexity)]
        let quote = sqlx::query_as::<_, (Uuid, Option<Uuid>, Option<Uuid>, Decimal, i32, Decimal)>(
            r#"
            SELECT supplier_id, material_id, work_item_id, quantity, vat_rate, locked_net_try
            FROM quotes
            WHERE id = $1
            "#,
        )
        .bind(order.1)
        .fetch_one(&mut *tx)
        .await?;

        let (supplier_id, material_id, work_item_id, quote_quantity, vat_rate, locked_net_try) =
            quote;

        if locked_net_try <= Decimal::ZERO || quote_quantity <= Decimal::ZERO {
            return Err(AppError::MissingContractSnapshot);
        }

        let quantity = order.2;
        // TRY net unit price back-computed once from the locked totals.
        let unit_price = round_currency(locked_net_try / quote_quantity);
        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());

        let invoice_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO invoices (supplier_id, order_id, invoice_no, date, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(supplier_id)
        .bind(order_id)
        .bind(input.invoice_no.trim())
        .bind(date)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        let description = match work_item_id {
            Some(id) => sqlx::query_scalar::<_, String>("SELECT name FROM work_items WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?,
            None => None,
        };

        let line_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO invoice_lines (invoice_id, material_id, description, quantity, unit_price, vat_rate)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(invoice_id)
        .bind(material_id)
        .bind(&description)
        .bind(quantity)
        .bind(unit_price)
        .bind(vat_rate)
        .fetch_one(&mut *tx)
        .await?;

        // Material arrives on paper first: it is owned but not received, so
        // it enters the vendor-virtual location. Service scopes move no stock.
        if let Some(material_id) = material_id {
            let vendor_warehouse = vendor_virtual_warehouse(&mut tx).await?;
            append_movement(
                &mut tx,
                &NewMovement {
                    material_id,
                    warehouse_id: vendor_warehouse,
                    order_id: Some(order_id),
                    supplier_id: Some(supplier_id),
                    direction: MovementDirection::In,
                    quantity,
                    date,
                    delivery_note_no: Some(input.invoice_no.trim().to_string()),
                    note: Some(format!("Fatura #{} (Sanal depoya giriş)", input.invoice_no.trim())),
                    reference: Some(MovementRef {
                        kind: RefKind::InvoiceLine,
                        id: line_id,
                        leg: RefLeg::In,
                    }),
                },
            )
            .await?;

            sqlx::query(
                "UPDATE purchase_orders SET invoiced_quantity = invoiced_quantity + $1 WHERE id = $2",
            )
            .bind(quantity)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        }

        recompute_totals(&mut tx, invoice_id).await?;
        let detail = fetch_detail(&mut tx, invoice_id).await?;

        tx.commit().await?;
        Ok(detail)
    }

    /// Record a free-form invoice with explicit lines.
    pub async fn create_manual(&self, input: ManualInvoiceInput) -> AppResult<InvoiceDetail> {
        if input.invoice_no.trim().is_empty() {
            return Err(AppError::Validation {
                field: "invoice_no".to_string(),
                message: "Invoice number is required".to_string(),
                message_tr: "Fatura numarası zorunludur".to_string(),
            });
        }

        // Drop incomplete rows the way the entry form does; what remains
        // must contain at least one real line.
        let lines: Vec<&InvoiceLineInput> = input
            .lines
            .iter()
            .filter(|l| {
                l.quantity > Decimal::ZERO
                    && l.unit_price >= Decimal::ZERO
                    && (l.material_id.is_some() || l.description.is_some())
            })
            .collect();

        if lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "At least one valid line is required".to_string(),
                message_tr: "En az 1 geçerli satır girmelisiniz".to_string(),
            });
        }

        for line in &lines {
            if let Some(vat_rate) = line.vat_rate {
                if let Err(msg) = validate_vat_rate(vat_rate) {
                    return Err(AppError::Validation {
                        field: "lines".to_string(),
                        message: msg.to_string(),
                        message_tr: "Geçersiz KDV oranı".to_string(),
                    });
                }
            }
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

        let invoice_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO invoices (supplier_id, invoice_no, date, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(input.supplier_id)
        .bind(input.invoice_no.trim())
        .bind(date)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        let has_materials = lines.iter().any(|l| l.material_id.is_some());
        let warehouse_id = if has_materials {
            match input.warehouse_id {
                Some(id) => {
                    let exists = sqlx::query_scalar::<_, bool>(
                        "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
                    )
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
                    if !exists {
                        return Err(AppError::NotFound("Warehouse".to_string()));
                    }
                    Some(id)
                }
                None => Some(vendor_virtual_warehouse(&mut tx).await?),
            }
        } else {
            None
        };

        for line in lines {
            let material_vat = match line.material_id {
                Some(material_id) => sqlx::query_scalar::<_, i32>(
                    "SELECT vat_rate FROM materials WHERE id = $1",
                )
                .bind(material_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Material".to_string()))?,
                None => 20,
            };
            let vat_rate = line.vat_rate.unwrap_or(material_vat);

            let line_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO invoice_lines (invoice_id, material_id, description, quantity, unit_price, vat_rate)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(invoice_id)
            .bind(line.material_id)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(vat_rate)
            .fetch_one(&mut *tx)
            .await?;

            if let (Some(material_id), Some(warehouse_id)) = (line.material_id, warehouse_id) {
                append_movement(
                    &mut tx,
                    &NewMovement {
                        material_id,
                        warehouse_id,
                        order_id: None,
                        supplier_id: Some(input.supplier_id),
                        direction: MovementDirection::In,
                        quantity: line.quantity,
                        date,
                        delivery_note_no: Some(input.invoice_no.trim().to_string()),
                        note: Some(format!("Serbest Fatura #{}", input.invoice_no.trim())),
                        reference: Some(MovementRef {
                            kind: RefKind::InvoiceLine,
                            id: line_id,
                            leg: RefLeg::In,
                        }),
                    },
                )
                .await?;
            }
        }

        recompute_totals(&mut tx, invoice_id).await?;
        let detail = fetch_detail(&mut tx, invoice_id).await?;

        tx.commit().await?;
        Ok(detail)
    }

    /// An invoice with lines and settlement position.
    pub async fn get_invoice(&self, invoice_id: Uuid) -> AppResult<InvoiceDetail> {
        let mut conn = self.db.acquire().await?;
        fetch_detail(&mut conn, invoice_id).await
    }

    /// Delete an invoice together with the stock entries it created and the
    /// allocations pointing at it. Ledger entries are found by their
    /// reference keys, never by matching note text.
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let order_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT order_id FROM invoices WHERE id = $1",
        )
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let line_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM invoice_lines WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM stock_movements WHERE ref_type = 'invoice_line' AND ref_id = ANY($1)",
        )
        .bind(&line_ids)
        .execute(&mut *tx)
        .await?;

        // Roll the order's invoiced quantity back by this invoice's share of
        // the order material, floored at zero.
        if let Some(order_id) = order_id {
            let material_quantity = sqlx::query_scalar::<_, Decimal>(
                r#"
                SELECT COALESCE(SUM(il.quantity), 0)
                FROM invoice_lines il
                JOIN purchase_orders po ON po.id = $2
                JOIN quotes q ON q.id = po.quote_id
                WHERE il.invoice_id = $1 AND il.material_id = q.material_id
                "#,
            )
            .bind(invoice_id)
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE purchase_orders
                SET invoiced_quantity = GREATEST(invoiced_quantity - $1, 0)
                WHERE id = $2
                "#,
            )
            .bind(material_quantity)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "DELETE FROM payment_allocations WHERE target_kind = 'invoice' AND target_id = $1",
        )
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
