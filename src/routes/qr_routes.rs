use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::dto::ApiResponse;
use crate::services::qr_service::{QrData, QrService};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Verificación pública: no requiere sesión
pub fn create_qr_router() -> Router<AppState> {
    Router::new().route("/get-qr-data/:sticker_number", get(get_qr_data))
}

async fn get_qr_data(
    State(state): State<AppState>,
    Path(sticker_number): Path<String>,
) -> Result<Json<ApiResponse<QrData>>, AppError> {
    let service = QrService::new(state.pool.clone(), state.config.clone());
    let data = service.verify(&sticker_number).await?;
    Ok(Json(ApiResponse::success(data)))
}
