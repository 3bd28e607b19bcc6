use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use tracing::info;

use crate::dto::ApiResponse;
use crate::services::expiration_sweeper::{ExpirationSweeper, SweepReport};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_cron_router() -> Router<AppState> {
    Router::new().route("/condicional-expired", post(expire_conditionals).get(expire_conditionals))
}

async fn expire_conditionals(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SweepReport>>, AppError> {
    info!("⏰ Ejecutando vencimiento de condicionales");
    let sweeper = ExpirationSweeper::new(state.pool.clone(), state.config.clone());
    let report = sweeper.run(Utc::now()).await?;
    Ok(Json(ApiResponse::success(report)))
}
