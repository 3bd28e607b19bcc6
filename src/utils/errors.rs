//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Workshop has no available inspections")]
    NoQuota,

    #[error("Sticker {0} is expired")]
    StickerExpired(String),

    #[error("Sticker {0} is already assigned to another vehicle")]
    StickerAlreadyAssigned(String),

    #[error("Ledger underflow: workshop holds {available}, cannot debit {requested}")]
    LedgerUnderflow { available: i32, requested: i32 },

    #[error("Certificate stored but application update failed")]
    PartialSuccess {
        application_id: Uuid,
        public_url: String,
    },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: Some(code.to_string()),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl AppError {
    /// Código HTTP asociado a cada tipo de error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::NoQuota
            | AppError::StickerExpired(_)
            | AppError::StickerAlreadyAssigned(_)
            | AppError::LedgerUnderflow { .. } => StatusCode::CONFLICT,
            AppError::PartialSuccess { .. } => StatusCode::MULTI_STATUS,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Código estable expuesto a los clientes
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DB_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NoQuota => "NO_QUOTA",
            AppError::StickerExpired(_) => "STICKER_EXPIRED",
            AppError::StickerAlreadyAssigned(_) => "STICKER_ALREADY_ASSIGNED",
            AppError::LedgerUnderflow { .. } => "LEDGER_UNDERFLOW",
            AppError::PartialSuccess { .. } => "PARTIAL_SUCCESS",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let body = match self {
            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                ErrorResponse::new(
                    "Database Error",
                    "An error occurred while accessing the database".to_string(),
                    code,
                )
            }

            AppError::Validation(e) => {
                warn!("Validation error: {}", e);
                ErrorResponse::new(
                    "Validation Error",
                    "The provided data is invalid".to_string(),
                    code,
                )
                .with_details(json!(e))
            }

            AppError::BadRequest(msg) => {
                warn!("Bad request: {}", msg);
                ErrorResponse::new("Bad Request", msg, code)
            }

            AppError::Unauthorized(msg) => {
                warn!("Unauthorized access: {}", msg);
                ErrorResponse::new("Unauthorized", msg, code)
            }

            AppError::Forbidden(msg) => {
                warn!("Forbidden access: {}", msg);
                ErrorResponse::new("Forbidden", msg, code)
            }

            AppError::NotFound(msg) => ErrorResponse::new("Not Found", msg, code),

            AppError::Conflict(msg) => {
                warn!("Conflict: {}", msg);
                ErrorResponse::new("Conflict", msg, code)
            }

            AppError::NoQuota => ErrorResponse::new(
                "Conflict",
                "El taller no tiene inspecciones disponibles".to_string(),
                code,
            ),

            AppError::StickerExpired(number) => ErrorResponse::new(
                "Conflict",
                format!("La oblea {} está vencida", number),
                code,
            )
            .with_details(json!({ "sticker_number": number })),

            AppError::StickerAlreadyAssigned(number) => ErrorResponse::new(
                "Conflict",
                format!("La oblea {} ya está asignada a otro vehículo", number),
                code,
            )
            .with_details(json!({ "sticker_number": number })),

            AppError::LedgerUnderflow {
                available,
                requested,
            } => {
                error!(
                    "❌ Ledger underflow: disponibles {}, a debitar {}",
                    available, requested
                );
                ErrorResponse::new(
                    "Conflict",
                    "El taller no tiene cupos suficientes para revertir la orden".to_string(),
                    code,
                )
                .with_details(json!({ "available": available, "requested": requested }))
            }

            AppError::PartialSuccess {
                application_id,
                public_url,
            } => {
                error!(
                    "⚠️ Certificado subido pero el trámite {} no se actualizó",
                    application_id
                );
                ErrorResponse::new(
                    "Partial Success",
                    "El certificado se guardó pero el trámite no se pudo actualizar; reintente"
                        .to_string(),
                    code,
                )
                .with_details(json!({
                    "application_id": application_id,
                    "public_url": public_url,
                }))
            }

            AppError::ExternalService(msg) => {
                error!("❌ External service error: {}", msg);
                ErrorResponse::new(
                    "External Service Error",
                    "An error occurred while communicating with external service".to_string(),
                    code,
                )
            }

            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                ErrorResponse::new(
                    "Internal Server Error",
                    "An unexpected error occurred".to_string(),
                    code,
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Traducción de errores de Postgres en el borde del repositorio que posee la restricción
pub trait DbErrorExt<T> {
    fn map_db_err(self, context: &str) -> AppResult<T>;
}

impl<T> DbErrorExt<T> for Result<T, sqlx::Error> {
    fn map_db_err(self, context: &str) -> AppResult<T> {
        self.map_err(|e| translate_db_error(e, context))
    }
}

pub fn translate_db_error(err: sqlx::Error, context: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => {
                return AppError::Conflict(format!("{}: registro duplicado", context));
            }
            // lock_not_available, query_canceled (statement_timeout)
            Some("55P03") | Some("57014") => {
                return AppError::Conflict(format!(
                    "{}: recurso bloqueado, reintente la operación",
                    context
                ));
            }
            // check_violation
            Some("23514") => {
                return AppError::BadRequest(format!("{}: valor fuera de rango", context));
            }
            _ => {}
        }
    }
    error!("❌ {}: {}", context, err);
    AppError::Database(err)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_error_kinds() {
        assert_eq!(AppError::NoQuota.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::StickerExpired("A1".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::StickerAlreadyAssigned("A1".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PartialSuccess {
                application_id: Uuid::nil(),
                public_url: "http://x".into()
            }
            .status_code(),
            StatusCode::MULTI_STATUS
        );
        assert_eq!(
            AppError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_row_not_found_is_not_translated() {
        let err = translate_db_error(sqlx::Error::RowNotFound, "buscar trámite");
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_partial_success_body_carries_url() {
        let id = Uuid::new_v4();
        let response = AppError::PartialSuccess {
            application_id: id,
            public_url: "https://storage/cert.pdf".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "PARTIAL_SUCCESS");
        assert_eq!(body["details"]["public_url"], "https://storage/cert.pdf");
        assert_eq!(body["details"]["application_id"], id.to_string());
    }
}
