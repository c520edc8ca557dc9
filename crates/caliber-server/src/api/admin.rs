//! Admin product endpoints: listing across statuses, create, full update and
//! status transitions.

use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use caliber_core::{to_display_form, DisplayProduct, ProductInput, ProductStatus};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, map_json_rejection, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct AdminListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusRequest {
    pub status: String,
}

fn parse_status(req_id: &str, raw: &str) -> Result<ProductStatus, ApiError> {
    ProductStatus::from_str(raw).map_err(|message| ApiError::new(req_id, "validation_error", message))
}

/// GET /api/v1/admin/products lists every product, optionally filtered by status.
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<ApiResponse<Vec<DisplayProduct>>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_status(&req_id.0, raw)?),
        None => None,
    };

    let products = caliber_db::list_admin_products(&state.pool, status)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    let data = products.iter().map(to_display_form).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// POST /api/v1/admin/products creates a product.
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<DisplayProduct>>), ApiError> {
    let Json(body) = body.map_err(|e| map_json_rejection(req_id.0.clone(), &e))?;
    let product = caliber_db::create_product(&state.pool, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, to_display_form(&product))),
    ))
}

/// GET /api/v1/admin/products/{id} returns a product in any status.
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DisplayProduct>>, ApiError> {
    let product = caliber_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("product {id} not found"),
            )
        })?;

    Ok(Json(ApiResponse::new(req_id.0, to_display_form(&product))))
}

/// PUT /api/v1/admin/products/{id} replaces the full record.
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<ApiResponse<DisplayProduct>>, ApiError> {
    let Json(body) = body.map_err(|e| map_json_rejection(req_id.0.clone(), &e))?;
    let product = caliber_db::update_product(&state.pool, id, &body)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::new(req_id.0, to_display_form(&product))))
}

/// PUT /api/v1/admin/products/{id}/status changes the lifecycle status.
pub(super) async fn set_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DisplayProduct>>, ApiError> {
    let Json(body) = body.map_err(|e| map_json_rejection(req_id.0.clone(), &e))?;
    let status = parse_status(&req_id.0, &body.status)?;

    let product = caliber_db::set_product_status(&state.pool, id, status)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::new(req_id.0, to_display_form(&product))))
}
