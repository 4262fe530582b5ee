//! Route definitions for the Construction Procurement Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Exchange rates (TCMB passthrough with caching)
        .route("/rates", get(handlers::get_rate))
        // Stock transfers
        .route("/transfers", post(handlers::create_transfer))
        // Stock projections
        .nest("/stock", stock_routes())
        .nest("/materials", material_routes())
        // Quote approval and currency locking
        .nest("/quotes", quote_routes())
        // Orders, receipts and progress claims
        .nest("/orders", order_routes())
        // Invoices
        .nest("/invoices", invoice_routes())
        // Payments and allocation
        .nest("/payments", payment_routes())
        // Supplier settlement projections
        .nest("/suppliers", supplier_routes())
        // Remaining master-data lookups
        .route("/work-items/:work_item_id", get(handlers::get_work_item))
        .route("/warehouses/:warehouse_id", get(handlers::get_warehouse))
}

/// Aggregated stock projections and manual postings
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/movements", post(handlers::post_movement))
        .route("/summary", get(handlers::get_stock_summary))
        .route("/report", get(handlers::get_stock_report))
}

/// Per-material ledger projections and lookup
fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/:material_id", get(handlers::get_material))
        .route("/:material_id/balance", get(handlers::get_balance))
        .route("/:material_id/movements", get(handlers::get_movements))
}

/// Quote approval routes
fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/:quote_id", get(handlers::get_quote))
        .route("/:quote_id/approve", post(handlers::approve_quote))
        .route("/:quote_id/lock", post(handlers::lock_quote))
}

/// Order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/receipts", post(handlers::receive_goods))
        .route(
            "/:order_id/claims",
            get(handlers::list_claims).post(handlers::create_claim),
        )
        .route("/:order_id/invoices", post(handlers::create_order_invoice))
}

/// Invoice routes
fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_manual_invoice))
        .route(
            "/:invoice_id",
            get(handlers::get_invoice).delete(handlers::delete_invoice),
        )
}

/// Payment routes
fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_payment))
        .route(
            "/:payment_id",
            get(handlers::get_payment).delete(handlers::delete_payment),
        )
        .route("/:payment_id/advance", get(handlers::get_advance))
        .route("/:payment_id/allocations", post(handlers::match_advance))
}

/// Supplier routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/:supplier_id", get(handlers::get_supplier))
        .route("/:supplier_id/open-items", get(handlers::get_open_items))
        .route("/:supplier_id/statement", get(handlers::get_statement))
        .route("/:supplier_id/balance", get(handlers::get_supplier_balance))
}
