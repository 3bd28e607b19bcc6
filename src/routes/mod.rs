//! Router de la API
//!
//! Rutas públicas (`/health`, `/qr`), rutas del cron con API key y el resto detrás de la
//! cookie de sesión.

pub mod application_routes;
pub mod cron_routes;
pub mod inspection_routes;
pub mod payment_routes;
pub mod qr_routes;
pub mod sticker_routes;
pub mod vehicle_routes;

use axum::{extract::State, middleware::from_fn_with_state, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{cors_layer, cron_api_key, session_auth};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/applications", application_routes::create_application_router())
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/stickers", sticker_routes::create_sticker_router())
        .nest("/inspections", inspection_routes::create_inspection_router())
        .nest("/payments", payment_routes::create_payment_router())
        .route_layer(from_fn_with_state(state.clone(), session_auth));

    let cron = Router::new()
        .nest("/cron", cron_routes::create_cron_router())
        .route_layer(from_fn_with_state(state.clone(), cron_api_key));

    let public = Router::new()
        .route("/health", get(health_check))
        .nest("/qr", qr_routes::create_qr_router());

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(cron)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_origins)),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;
    Ok(Json(json!({
        "status": "healthy",
        "database": "reachable",
        "timestamp": chrono::Utc::now()
    })))
}
