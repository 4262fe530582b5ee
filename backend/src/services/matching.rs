//! FIFO matching of vendor-virtual stock depletions to open purchase orders
//!
//! When goods leave the vendor-virtual location without an explicit order,
//! the depletion is bound to the oldest open order of the same material that
//! still has unmatched stock waiting at the vendor. Best-effort: no match
//! leaves the movement floating, and a resolution failure never aborts the
//! transfer it rides on.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// Oldest-open-order matcher for vendor-virtual depletions
#[derive(Clone)]
pub struct OrderFifoMatcher {
    db: PgPool,
}

/// Quantity still sitting in vendor-virtual warehouses for one order:
/// inflows minus outflows, floored at zero.
pub(crate) async fn pending_in_vendor(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> AppResult<Decimal> {
    let pending = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(
            CASE WHEN sm.direction = 'in' THEN sm.quantity
                 WHEN sm.direction = 'out' THEN -sm.quantity
                 ELSE 0
            END
        ), 0)
        FROM stock_movements sm
        JOIN warehouses w ON w.id = sm.warehouse_id
        WHERE sm.order_id = $1 AND w.kind = 'vendor_virtual'
        "#,
    )
    .bind(order_id)
    .fetch_one(conn)
    .await?;

    Ok(if pending < Decimal::ZERO {
        Decimal::ZERO
    } else {
        pending
    })
}

/// Resolve the order a vendor-virtual depletion of `material_id` belongs to.
///
/// Candidates are the material's orders that are not fully delivered, oldest
/// first; the first one with stock still pending at the vendor wins. The
/// deterministic creation-time ordering makes repeated runs over the same
/// data produce the same binding.
pub(crate) async fn resolve_open_order(
    conn: &mut PgConnection,
    material_id: Uuid,
) -> AppResult<Option<Uuid>> {
    let candidates = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT po.id
        FROM purchase_orders po
        JOIN quotes q ON q.id = po.quote_id
        WHERE q.material_id = $1 AND po.delivery_status <> 'complete'
        ORDER BY po.created_at ASC
        "#,
    )
    .bind(material_id)
    .fetch_all(&mut *conn)
    .await?;

    for candidate in candidates {
        if pending_in_vendor(conn, candidate).await? > Decimal::ZERO {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

impl OrderFifoMatcher {
    /// Create a new OrderFifoMatcher instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Standalone resolution, outside any transfer.
    pub async fn resolve(&self, material_id: Uuid) -> AppResult<Option<Uuid>> {
        let mut conn = self.db.acquire().await?;
        resolve_open_order(&mut conn, material_id).await
    }

    /// Unmatched vendor-virtual quantity for one order.
    pub async fn pending_for_order(&self, order_id: Uuid) -> AppResult<Decimal> {
        let mut conn = self.db.acquire().await?;
        pending_in_vendor(&mut conn, order_id).await
    }
}
