use axum::{
    extract::{Path, State},
    Extension, Json,
};
use caliber_core::{Reference, ReferenceKind};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

/// GET /api/v1/reference/{kind}, e.g. `brands`, `watch-styles`.
pub(super) async fn list_reference_entities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(kind): Path<String>,
) -> Result<Json<ApiResponse<Vec<Reference>>>, ApiError> {
    let kind: ReferenceKind = kind
        .parse()
        .map_err(|message: String| ApiError::new(req_id.0.clone(), "not_found", message))?;

    let rows = caliber_db::list_reference_entities(&state.pool, kind)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), e))?;

    Ok(Json(ApiResponse::new(req_id.0, rows)))
}
