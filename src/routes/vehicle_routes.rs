use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::dto::ApiResponse;
use crate::services::vehicle_service::{VehicleDetail, VehicleService};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new().route("/get-vehicle-data/:plate", get(get_vehicle_data))
}

async fn get_vehicle_data(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<ApiResponse<VehicleDetail>>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    let vehicle = service.get_by_plate(&plate).await?;
    Ok(Json(ApiResponse::success(vehicle)))
}
