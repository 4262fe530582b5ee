//! HTTP handlers for read-only master-data lookups

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::reference::ReferenceDataService;
use crate::AppState;
use shared::{Material, Supplier, Warehouse, WorkItem};

/// Material lookup
pub async fn get_material(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Material>> {
    let service = ReferenceDataService::new(state.db);
    let material = service.get_material(material_id).await?;
    Ok(Json(material))
}

/// Work item lookup
pub async fn get_work_item(
    State(state): State<AppState>,
    Path(work_item_id): Path<Uuid>,
) -> AppResult<Json<WorkItem>> {
    let service = ReferenceDataService::new(state.db);
    let work_item = service.get_work_item(work_item_id).await?;
    Ok(Json(work_item))
}

/// Warehouse lookup
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let service = ReferenceDataService::new(state.db);
    let warehouse = service.get_warehouse(warehouse_id).await?;
    Ok(Json(warehouse))
}

/// Supplier lookup
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = ReferenceDataService::new(state.db);
    let supplier = service.get_supplier(supplier_id).await?;
    Ok(Json(supplier))
}
