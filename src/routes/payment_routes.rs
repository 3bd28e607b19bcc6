use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::HeaderMap,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::application_dto::UploadQuery;
use crate::dto::payment_dto::{
    AdminPaymentsQuery, CreatePaymentRequest, ListPaymentsQuery, TransitionRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::payment::PaymentOrder;
use crate::routes::application_routes::content_type;
use crate::services::payment_service::{PaymentService, PaymentTransition};
use crate::state::AppState;
use crate::utils::errors::AppError;

const MAX_RECEIPT_BYTES: usize = 10 * 1024 * 1024;

pub fn create_payment_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/", get(list_payments))
        .route(
            "/:id/receipt",
            post(upload_receipt).layer(DefaultBodyLimit::max(MAX_RECEIPT_BYTES)),
        )
        .route("/admin", get(admin_list))
        .route("/admin/:id/status", put(admin_transition))
}

async fn create_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<ApiResponse<PaymentOrder>>, AppError> {
    request.validate()?;
    let service = PaymentService::new(&state);
    let order = service
        .create(
            &user.context(),
            request.workshop_id,
            request.quantity,
            &request.zone,
        )
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Orden de pago creada",
    )))
}

async fn list_payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<ApiResponse<Vec<PaymentOrder>>>, AppError> {
    let service = PaymentService::new(&state);
    let orders = service
        .list_for_workshop(&user.context(), query.workshop_id, query.status)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn upload_receipt(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<PaymentOrder>>, AppError> {
    let service = PaymentService::new(&state);
    let order = service
        .upload_receipt(
            &user.context(),
            id,
            &query.file_name,
            content_type(&headers),
            body.to_vec(),
        )
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Comprobante recibido; la orden queda en revisión",
    )))
}

async fn admin_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<AdminPaymentsQuery>,
) -> Result<Json<ApiResponse<Vec<PaymentOrder>>>, AppError> {
    let service = PaymentService::new(&state);
    let orders = service
        .admin_list(&user.context(), query.workshop_id, query.status)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn admin_transition(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<ApiResponse<PaymentTransition>>, AppError> {
    let service = PaymentService::new(&state);
    let transition = service
        .admin_transition(&user.context(), id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(transition)))
}
