//! Modelo de User
//!
//! Usuarios de la plataforma y el contexto explícito con el que se invocan los servicios.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Quién invoca una operación; se pasa explícitamente a cada servicio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl RequestContext {
    pub fn new(user_id: Uuid, is_admin: bool) -> Self {
        Self { user_id, is_admin }
    }
}
