use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::inspection_dto::{
    CheckedObservationsRequest, GlobalObservationsRequest, InspectionQuery, UpsertDetailRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::inspection::{CatalogCategory, Inspection, InspectionDetail, OrderedStep};
use crate::services::inspection_service::{InspectionService, InspectionView};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_inspection_router() -> Router<AppState> {
    Router::new()
        .route("/steps/:workshop_id", get(list_steps))
        .route("/catalog/:workshop_id/:step_id", get(get_catalog))
        .route("/applications/:application_id", get(get_inspection))
        .route("/applications/:application_id/details", put(upsert_detail))
        .route(
            "/applications/:application_id/global-observations",
            put(set_global_observations),
        )
        .route("/details/:detail_id/observations", put(set_checked_observations))
}

async fn list_steps(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(workshop_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<OrderedStep>>>, AppError> {
    let service = InspectionService::new(state.pool.clone());
    let steps = service.steps(&user.context(), workshop_id).await?;
    Ok(Json(ApiResponse::success(steps)))
}

async fn get_catalog(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((workshop_id, step_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Vec<CatalogCategory>>>, AppError> {
    let service = InspectionService::new(state.pool.clone());
    let catalog = service.catalog(&user.context(), workshop_id, step_id).await?;
    Ok(Json(ApiResponse::success(catalog)))
}

async fn get_inspection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(application_id): Path<Uuid>,
    Query(query): Query<InspectionQuery>,
) -> Result<Json<ApiResponse<InspectionView>>, AppError> {
    let service = InspectionService::new(state.pool.clone());
    let view = service
        .get(&user.context(), application_id, query.second)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn upsert_detail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(application_id): Path<Uuid>,
    Json(request): Json<UpsertDetailRequest>,
) -> Result<Json<ApiResponse<InspectionDetail>>, AppError> {
    request.validate()?;
    let service = InspectionService::new(state.pool.clone());
    let detail = service
        .upsert_detail(
            &user.context(),
            application_id,
            request.is_second,
            request.step_id,
            request.status,
            request.observations.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

async fn set_checked_observations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(detail_id): Path<Uuid>,
    Json(request): Json<CheckedObservationsRequest>,
) -> Result<Json<ApiResponse<Vec<Uuid>>>, AppError> {
    let service = InspectionService::new(state.pool.clone());
    let checked = service
        .set_checked_observations(&user.context(), detail_id, &request.checked_ids)
        .await?;
    Ok(Json(ApiResponse::success(checked)))
}

async fn set_global_observations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(application_id): Path<Uuid>,
    Json(request): Json<GlobalObservationsRequest>,
) -> Result<Json<ApiResponse<Inspection>>, AppError> {
    request.validate()?;
    let service = InspectionService::new(state.pool.clone());
    let inspection = service
        .set_global_observations(
            &user.context(),
            application_id,
            request.is_second,
            request.observations.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::success(inspection)))
}
