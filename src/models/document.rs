//! Documentación adjunta a un trámite

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationDocument {
    pub id: Uuid,
    pub application_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
