//! Middleware de CORS
//!
//! Sin orígenes configurados se permite cualquiera (desarrollo); con `CORS_ORIGINS`
//! se acepta sólo esa lista y se envían credenciales para la cookie de sesión.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::middleware::auth::CRON_API_KEY_HEADER;

/// Crear middleware de CORS según los orígenes configurados
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static(CRON_API_KEY_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
