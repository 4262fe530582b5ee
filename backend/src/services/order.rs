//! Purchase order projections and goods receipt

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::billing::ProgressBillingService;
use crate::services::matching::{pending_in_vendor, OrderFifoMatcher};
use crate::services::transfer::{TransferInput, TransferOutcome, TransferService};
use shared::{validate_positive_quantity, DeliveryStatus, PurchaseOrder};

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// Input for receiving goods out of the vendor-virtual location
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptInput {
    pub quantity: Decimal,
    /// Destination warehouse (physical or site).
    pub warehouse_id: Uuid,
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
    /// Client-generated key; a retried receipt with the same key posts once.
    pub idempotency_key: Option<Uuid>,
}

/// An order with its read projections
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    /// Material or work-item name.
    pub subject: String,
    pub currency: String,
    pub contract_gross_try: Decimal,
    pub remaining_to_deliver: Decimal,
    pub remaining_to_invoice: Decimal,
    pub completion_percent: Decimal,
    /// Invoiced but not yet physically received.
    pub pending_in_vendor: Decimal,
    /// Cumulative progress claimed so far, percent of the contract.
    pub claimed_percent: Decimal,
    /// Percentage still claimable before the 100% cap.
    pub claim_headroom: Decimal,
    /// Sum of allocations against this order's invoices and claims.
    pub paid_to_date: Decimal,
}

/// Open and settled orders
#[derive(Debug, Clone, Serialize)]
pub struct OrderList {
    pub open: Vec<OrderDetail>,
    pub settled: Vec<OrderDetail>,
}

/// Result of a goods receipt
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptOutcome {
    pub transfer: TransferOutcome,
    pub order: PurchaseOrder,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    quote_id: Uuid,
    order_date: NaiveDate,
    ordered_quantity: Decimal,
    delivered_quantity: Decimal,
    invoiced_quantity: Decimal,
    delivery_status: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for PurchaseOrder {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(PurchaseOrder {
            id: row.id,
            quote_id: row.quote_id,
            order_date: row.order_date,
            ordered_quantity: row.ordered_quantity,
            delivered_quantity: row.delivered_quantity,
            invoiced_quantity: row.invoiced_quantity,
            delivery_status: DeliveryStatus::parse(&row.delivery_status)
                .ok_or_else(|| AppError::Internal(format!("bad delivery status: {}", row.delivery_status)))?,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = r#"
    id, quote_id, order_date, ordered_quantity, delivered_quantity,
    invoiced_quantity, delivery_status, note, created_at
"#;

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// One order with all projections.
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderDetail> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        self.build_detail(row).await
    }

    /// All orders, split into open (stock pending at the vendor or quantity
    /// still to invoice) and settled.
    pub async fn list_orders(&self) -> AppResult<OrderList> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {}
            FROM purchase_orders
            ORDER BY created_at DESC
            "#,
            ORDER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let mut open = Vec::new();
        let mut settled = Vec::new();
        for row in rows {
            let detail = self.build_detail(row).await?;
            if detail.pending_in_vendor > Decimal::ZERO
                || detail.remaining_to_invoice > Decimal::ZERO
            {
                open.push(detail);
            } else {
                settled.push(detail);
            }
        }

        Ok(OrderList { open, settled })
    }

    /// Receive goods: move them from the vendor-virtual location into a real
    /// warehouse, then advance the order's delivered quantity. The order
    /// update is the explicit second step on top of the transfer, so the
    /// ledger stays the single source for stock and the order row for
    /// delivery progress.
    pub async fn receive_goods(
        &self,
        order_id: Uuid,
        input: ReceiptInput,
    ) -> AppResult<ReceiptOutcome> {
        if let Err(msg) = validate_positive_quantity(input.quantity) {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
                message_tr: "Miktar 0'dan büyük olmalıdır".to_string(),
            });
        }

        let material_id = {
            let mut conn = self.db.acquire().await?;

            let material_id = sqlx::query_scalar::<_, Option<Uuid>>(
                r#"
                SELECT q.material_id
                FROM purchase_orders po
                JOIN quotes q ON q.id = po.quote_id
                WHERE po.id = $1
                "#,
            )
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?
            .ok_or_else(|| AppError::Validation {
                field: "order_id".to_string(),
                message: "Work-item orders have no physical goods to receive".to_string(),
                message_tr: "Hizmet siparişlerinde mal kabul yapılamaz".to_string(),
            })?;

            let pending = pending_in_vendor(&mut conn, order_id).await?;
            if input.quantity > pending {
                return Err(AppError::InsufficientStock(format!(
                    "Only {} units are waiting in the vendor location for this order",
                    pending
                )));
            }

            material_id
        };

        let vendor_warehouse = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM warehouses WHERE kind = 'vendor_virtual' ORDER BY created_at ASC LIMIT 1",
        )
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::Configuration(
                "No vendor-virtual warehouse is defined; create one before receiving goods"
                    .to_string(),
            )
        })?;

        let transfer = TransferService::new(self.db.clone())
            .transfer(TransferInput {
                material_id,
                quantity: input.quantity,
                source_warehouse_id: vendor_warehouse,
                dest_warehouse_id: input.warehouse_id,
                order_id: Some(order_id),
                note: Some(match &input.note {
                    Some(n) => format!("Mal kabul: {}", n),
                    None => format!("Mal kabul: sipariş {}", order_id),
                }),
                date: input.date,
                transfer_id: Some(input.idempotency_key.unwrap_or_else(Uuid::new_v4)),
            })
            .await?;

        // A deduplicated replay must not advance the order twice either.
        let order = if transfer.posted {
            self.add_delivered(order_id, input.quantity).await?
        } else {
            let row = sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {} FROM purchase_orders WHERE id = $1",
                ORDER_COLUMNS
            ))
            .bind(order_id)
            .fetch_one(&self.db)
            .await?;
            row.try_into()?
        };

        Ok(ReceiptOutcome { transfer, order })
    }

    /// Advance delivered quantity and recompute the delivery status.
    async fn add_delivered(&self, order_id: Uuid, quantity: Decimal) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;

        let (ordered, delivered) = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT ordered_quantity, delivered_quantity FROM purchase_orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let new_delivered = delivered + quantity;
        let status = DeliveryStatus::derive(new_delivered, ordered);

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE purchase_orders
            SET delivered_quantity = $1, delivery_status = $2
            WHERE id = $3
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(new_delivered)
        .bind(status.as_str())
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn build_detail(&self, row: OrderRow) -> AppResult<OrderDetail> {
        let order: PurchaseOrder = row.try_into()?;

        #[allow(clippy::type_complexity)]
        let (supplier_id, supplier_name, material_name, work_item_name, currency, gross_try) =
            sqlx::query_as::<_, (Uuid, String, Option<String>, Option<String>, String, Decimal)>(
                r#"
                SELECT s.id, s.company_name, m.name, wi.name, q.currency, q.locked_gross_try
                FROM quotes q
                JOIN suppliers s ON s.id = q.supplier_id
                LEFT JOIN materials m ON m.id = q.material_id
                LEFT JOIN work_items wi ON wi.id = q.work_item_id
                WHERE q.id = $1
                "#,
            )
            .bind(order.quote_id)
            .fetch_one(&self.db)
            .await?;

        let pending = OrderFifoMatcher::new(self.db.clone())
            .pending_for_order(order.id)
            .await?;
        let (claimed_percent, claim_headroom) = ProgressBillingService::new(self.db.clone())
            .claimed_so_far(order.id)
            .await?;

        let paid_to_date = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(pa.amount), 0)
            FROM payment_allocations pa
            WHERE (pa.target_kind = 'claim'
                   AND pa.target_id IN (SELECT id FROM progress_billings WHERE order_id = $1))
               OR (pa.target_kind = 'invoice'
                   AND pa.target_id IN (SELECT id FROM invoices WHERE order_id = $1))
            "#,
        )
        .bind(order.id)
        .fetch_one(&self.db)
        .await?;

        Ok(OrderDetail {
            supplier_id,
            supplier_name,
            subject: material_name
                .or(work_item_name)
                .unwrap_or_else(|| "-".to_string()),
            currency,
            contract_gross_try: gross_try,
            remaining_to_deliver: order.remaining_to_deliver(),
            remaining_to_invoice: order.remaining_to_invoice(),
            completion_percent: order.completion_percent(),
            pending_in_vendor: pending,
            claimed_percent,
            claim_headroom,
            paid_to_date,
            order,
        })
    }
}
