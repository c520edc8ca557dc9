//! Shopper-facing catalog endpoints. Only published products are visible.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use caliber_core::{to_display_form, DisplayProduct, Gender, ProductFilter, SortKey};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const DEFAULT_FEATURED_LIMIT: i64 = 8;

#[derive(Debug, Default, Deserialize)]
pub(super) struct ProductQuery {
    /// Comma-separated brand ids.
    pub brand: Option<String>,
    /// Comma-separated genders.
    pub gender: Option<String>,
    /// Comma-separated watch-style ids.
    pub style: Option<String>,
    /// Comma-separated condition labels.
    pub condition: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LimitQuery {
    pub limit: Option<i64>,
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_ids(param: &str, raw: Option<&str>) -> Result<Vec<i64>, String> {
    split_list(raw)
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| format!("{param} must be a comma-separated list of ids, got '{s}'"))
        })
        .collect()
}

fn parse_price(param: &str, raw: Option<&str>) -> Result<Option<Decimal>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Decimal::from_str(s)
            .map(Some)
            .map_err(|_| format!("{param} must be a decimal number, got '{s}'")),
    }
}

/// Turn query-string parameters into a [`ProductFilter`].
pub(super) fn parse_filter(query: &ProductQuery) -> Result<ProductFilter, String> {
    let genders = split_list(query.gender.as_deref())
        .map(Gender::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProductFilter {
        brand_ids: parse_ids("brand", query.brand.as_deref())?,
        genders,
        watch_style_ids: parse_ids("style", query.style.as_deref())?,
        conditions: split_list(query.condition.as_deref())
            .map(ToOwned::to_owned)
            .collect(),
        min_price: parse_price("min_price", query.min_price.as_deref())?,
        max_price: parse_price("max_price", query.max_price.as_deref())?,
    })
}

fn featured_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_FEATURED_LIMIT)
        .clamp(1, caliber_db::MAX_FEATURED_LIMIT)
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<DisplayProduct>>>, ApiError> {
    let filter = parse_filter(&query)
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;
    let sort = SortKey::parse_or_default(query.sort.as_deref());

    let products = caliber_db::list_products(&state.pool, &filter, sort)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    let data = products.iter().map(to_display_form).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

pub(super) async fn list_featured(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<DisplayProduct>>>, ApiError> {
    let limit = featured_limit(query.limit);

    let products = caliber_db::list_featured_products(&state.pool, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    let data = products.iter().map(to_display_form).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<DisplayProduct>>, ApiError> {
    let product = caliber_db::get_published_product_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("product '{slug}' not found"),
            )
        })?;

    Ok(Json(ApiResponse::new(req_id.0, to_display_form(&product))))
}

pub(super) async fn list_recommendations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<DisplayProduct>>>, ApiError> {
    let product = caliber_db::get_published_product_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("product '{slug}' not found"),
            )
        })?;

    let limit = query.limit.unwrap_or(state.recommendation_limit);
    let picks = caliber_db::recommend(&state.pool, &product, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    let data = picks.iter().map(to_display_form).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}
