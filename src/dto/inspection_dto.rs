use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::inspection::DetailStatus;

// Request para cargar el resultado de un paso
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertDetailRequest {
    pub step_id: Uuid,
    pub status: DetailStatus,
    #[validate(length(max = 2000))]
    pub observations: Option<String>,
    #[serde(default)]
    pub is_second: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckedObservationsRequest {
    #[serde(default)]
    pub checked_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GlobalObservationsRequest {
    #[validate(length(max = 4000))]
    pub observations: Option<String>,
    #[serde(default)]
    pub is_second: bool,
}

/// `?second=true` selecciona la reinspección
#[derive(Debug, Default, Deserialize)]
pub struct InspectionQuery {
    #[serde(default)]
    pub second: bool,
}
