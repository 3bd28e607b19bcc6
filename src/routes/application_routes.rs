use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::application_dto::{
    ApplicationResponse, CreateApplicationRequest, DriverRequest, FinalizeRequest,
    ListApplicationsQuery, PersonRequest, UploadQuery, VehicleRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::application::Application;
use crate::models::document::ApplicationDocument;
use crate::models::inspection::Inspection;
use crate::services::application_service::{
    ApplicationDetail, ApplicationService, ConsumeOutcome, FinalizeOutcome,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Límite de tamaño de documentos adjuntos
const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

pub fn create_application_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_application))
        .route("/", get(list_applications))
        .route("/:id", get(get_application))
        .route("/:id", delete(delete_application))
        .route("/:id/owner", put(set_owner))
        .route("/:id/driver", put(set_driver))
        .route("/:id/vehicle", put(set_vehicle))
        .route("/:id/enqueue", post(enqueue))
        .route("/:id/consume-slot", post(consume_slot))
        .route("/:id/start-inspection", post(start_inspection))
        .route("/:id/finalize", post(finalize))
        .route("/:id/second-inspection", post(start_second_inspection))
        .route("/:id/second-finalize", post(second_finalize))
        .route(
            "/:id/documents",
            post(upload_document).layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES)),
        )
        .route("/:id/documents", get(list_documents))
        .route("/:id/documents/:document_id", delete(delete_document))
}

/// Content-Type del body o genérico
pub(crate) fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
}

fn respond(state: &AppState, application: Application) -> ApplicationResponse {
    ApplicationResponse::from_model(application, &state.config.display_zone)
}

async fn create_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, AppError> {
    let service = ApplicationService::new(&state);
    let application = service.create(&user.context(), request.workshop_id).await?;
    Ok(Json(ApiResponse::success_with_message(
        respond(&state, application),
        "Trámite creado exitosamente",
    )))
}

async fn list_applications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<ApiResponse<Vec<ApplicationResponse>>>, AppError> {
    let service = ApplicationService::new(&state);
    let applications = service
        .list(
            &user.context(),
            query.workshop_id,
            query.status,
            query.limit,
            query.offset,
        )
        .await?;
    let data = applications
        .into_iter()
        .map(|application| respond(&state, application))
        .collect();
    Ok(Json(ApiResponse::success(data)))
}

async fn get_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApplicationDetail>>, AppError> {
    let service = ApplicationService::new(&state);
    let detail = service.get(&user.context(), id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

async fn delete_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    let service = ApplicationService::new(&state);
    service.soft_delete(&user.context(), id).await?;
    Ok(Json(ApiResponse::success_with_message(
        id,
        "Trámite eliminado exitosamente",
    )))
}

async fn set_owner(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<PersonRequest>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, AppError> {
    request.validate()?;
    let service = ApplicationService::new(&state);
    let application = service
        .set_owner(&user.context(), id, &request.into_data())
        .await?;
    Ok(Json(ApiResponse::success(respond(&state, application))))
}

async fn set_driver(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<DriverRequest>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, AppError> {
    request.validate()?;
    let driver = request.into_input()?;
    let service = ApplicationService::new(&state);
    let application = service.set_driver(&user.context(), id, &driver).await?;
    Ok(Json(ApiResponse::success(respond(&state, application))))
}

async fn set_vehicle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<VehicleRequest>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, AppError> {
    request.validate()?;
    let (data, sticker_id) = request.into_data();
    let service = ApplicationService::new(&state);
    let application = service
        .set_vehicle(&user.context(), id, &data, sticker_id)
        .await?;
    Ok(Json(ApiResponse::success(respond(&state, application))))
}

async fn enqueue(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, AppError> {
    let service = ApplicationService::new(&state);
    let application = service.enqueue(&user.context(), id).await?;
    Ok(Json(ApiResponse::success(respond(&state, application))))
}

async fn consume_slot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsumeOutcome>>, AppError> {
    let service = ApplicationService::new(&state);
    let outcome = service.consume_slot(&user.context(), id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

async fn start_inspection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Inspection>>, AppError> {
    let service = ApplicationService::new(&state);
    let inspection = service.start_inspection(&user.context(), id).await?;
    Ok(Json(ApiResponse::success(inspection)))
}

async fn finalize(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    request: Option<Json<FinalizeRequest>>,
) -> Result<Json<ApiResponse<FinalizeOutcome>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let service = ApplicationService::new(&state);
    let outcome = service.finalize(&user.context(), id, request.result).await?;
    Ok(Json(ApiResponse::success_with_message(
        outcome,
        "Certificado emitido",
    )))
}

async fn start_second_inspection(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Inspection>>, AppError> {
    let service = ApplicationService::new(&state);
    let inspection = service.start_second_inspection(&user.context(), id).await?;
    Ok(Json(ApiResponse::success(inspection)))
}

async fn second_finalize(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    request: Option<Json<FinalizeRequest>>,
) -> Result<Json<ApiResponse<FinalizeOutcome>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let service = ApplicationService::new(&state);
    let outcome = service
        .second_finalize(&user.context(), id, request.result)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        outcome,
        "Certificado de reinspección emitido",
    )))
}

async fn upload_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<ApplicationDocument>>, AppError> {
    let service = ApplicationService::new(&state);
    let document = service
        .upload_document(
            &user.context(),
            id,
            &query.file_name,
            content_type(&headers),
            body.to_vec(),
        )
        .await?;
    Ok(Json(ApiResponse::success(document)))
}

async fn list_documents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ApplicationDocument>>>, AppError> {
    let service = ApplicationService::new(&state);
    let documents = service.list_documents(&user.context(), id).await?;
    Ok(Json(ApiResponse::success(documents)))
}

async fn delete_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    let service = ApplicationService::new(&state);
    service
        .delete_document(&user.context(), id, document_id)
        .await?;
    Ok(Json(ApiResponse::success(document_id)))
}
