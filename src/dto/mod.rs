//! DTOs de la API
//!
//! Requests validados con `validator` y respuestas con los códigos estables y las
//! etiquetas que ven los operadores.

pub mod application_dto;
pub mod inspection_dto;
pub mod payment_dto;
pub mod sticker_dto;

use serde::Serialize;

/// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}
