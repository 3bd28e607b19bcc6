use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::sticker::{StickerRange, StickerStatus};
use crate::utils::validation::validate_sticker_numbers;

// Request para cargar una orden de obleas
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStickerOrderRequest {
    pub workshop_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 50000), custom = "validate_sticker_numbers")]
    pub numbers: Vec<String>,
    #[validate]
    pub range: Option<StickerRange>,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ListStickersQuery {
    pub workshop_id: Uuid,
    pub status: Option<StickerStatus>,
}
