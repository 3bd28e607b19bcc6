//! Middleware de autenticación por cookie de sesión
//!
//! La cookie lleva un JWT HS256 firmado con `SESSION_SECRET`. El usuario se busca en la
//! base y se inyecta como `AuthenticatedUser` en las extensions de la request.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::RequestContext;
use crate::repositories::UserRepository;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Header con la API key del cron
pub const CRON_API_KEY_HEADER: &str = "x-api-key";

/// Claims del JWT de sesión
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
    pub iat: usize,
}

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.user_id, self.is_admin)
    }
}

/// Valor de una cookie del header `Cookie`
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Verifica firma y expiración y devuelve el id de usuario
pub fn verify_session_token(secret: &str, token: &str) -> Result<Uuid, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| AppError::Unauthorized("Sesión inválida o expirada".to_string()))?;

    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::Unauthorized("ID de usuario inválido".to_string()))
}

/// Genera el JWT de sesión
pub fn issue_session_token(
    secret: &str,
    user_id: Uuid,
    ttl: Duration,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Error generando JWT: {}", e)))
}

/// Middleware de sesión para las rutas autenticadas
pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookie_value(request.headers(), &state.config.session_cookie_name)
        .ok_or_else(|| AppError::Unauthorized("Sesión requerida".to_string()))?;
    let user_id = verify_session_token(&state.config.session_secret, token)?;

    let mut conn = state.pool.acquire().await?;
    let user = UserRepository::find_by_id(&mut *conn, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Usuario no encontrado".to_string()))?;
    drop(conn);

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: user.id,
        email: user.email,
        is_admin: user.is_admin,
    });

    Ok(next.run(request).await)
}

/// Middleware para el endpoint del cron
pub async fn cron_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get(CRON_API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key == state.config.cron_api_key => Ok(next.run(request).await),
        _ => Err(AppError::Unauthorized("API key inválida".to_string())),
    }
}
