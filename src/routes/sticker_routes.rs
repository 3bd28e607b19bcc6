use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::sticker_dto::{CreateStickerOrderRequest, ListStickersQuery};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::sticker::Sticker;
use crate::services::sticker_service::{StickerBatchReport, StickerService};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_sticker_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stickers))
        .route("/orders", post(create_order))
        .route("/:id/release", post(release_sticker))
        .route("/:id/mark-unavailable", post(mark_unavailable))
}

fn service(state: &AppState) -> StickerService {
    StickerService::new(state.pool.clone(), state.config.clone())
}

async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateStickerOrderRequest>,
) -> Result<Json<ApiResponse<StickerBatchReport>>, AppError> {
    request.validate()?;
    let report = service(&state)
        .create_order(
            &user.context(),
            request.workshop_id,
            &request.numbers,
            request.range.as_ref(),
            request.expiration_date,
        )
        .await?;
    let message = format!(
        "{} obleas cargadas, {} duplicadas",
        report.inserted.len(),
        report.duplicates.len()
    );
    Ok(Json(ApiResponse::success_with_message(report, message)))
}

async fn list_stickers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ListStickersQuery>,
) -> Result<Json<ApiResponse<Vec<Sticker>>>, AppError> {
    let stickers = service(&state)
        .list(&user.context(), query.workshop_id, query.status)
        .await?;
    Ok(Json(ApiResponse::success(stickers)))
}

async fn release_sticker(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Sticker>>, AppError> {
    let sticker = service(&state).release(&user.context(), id).await?;
    Ok(Json(ApiResponse::success_with_message(
        sticker,
        "Oblea liberada",
    )))
}

async fn mark_unavailable(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Sticker>>, AppError> {
    let sticker = service(&state).mark_unavailable(&user.context(), id).await?;
    Ok(Json(ApiResponse::success(sticker)))
}
