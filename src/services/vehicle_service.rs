//! Consulta de vehículos por patente

use serde::Serialize;
use sqlx::PgPool;

use crate::models::person::Person;
use crate::models::sticker::Sticker;
use crate::models::vehicle::Vehicle;
use crate::repositories::{PersonRepository, StickerRepository, VehicleRepository};
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::parse_plate;

#[derive(Debug, Clone, Serialize)]
pub struct VehicleDetail {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub owner: Option<Person>,
    pub driver: Option<Person>,
    pub sticker: Option<Sticker>,
}

pub struct VehicleService {
    pool: PgPool,
}

impl VehicleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_plate(&self, plate: &str) -> AppResult<VehicleDetail> {
        let plate = parse_plate(plate)?;
        let mut conn = self.pool.acquire().await?;

        let vehicle = VehicleRepository::find_by_plate(&mut *conn, &plate)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehículo {} inexistente", plate)))?;
        let owner = PersonRepository::find_optional(&mut *conn, vehicle.owner_id).await?;
        let driver = PersonRepository::find_optional(&mut *conn, vehicle.driver_id).await?;
        let sticker = match vehicle.sticker_id {
            Some(id) => StickerRepository::find_by_id(&mut *conn, id).await?,
            None => None,
        };

        Ok(VehicleDetail {
            vehicle,
            owner,
            driver,
            sticker,
        })
    }
}
