//! Repositorio de vehículos
//!
//! Upsert por patente normalizada y el vínculo vehículo ↔ oblea. El vínculo solo lo
//! escribe el gestor de obleas.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::vehicle::{Vehicle, VehicleData};
use crate::utils::errors::{AppResult, DbErrorExt};

pub struct VehicleRepository;

impl VehicleRepository {
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando vehículo")
    }

    pub async fn find_by_plate(
        conn: &mut PgConnection,
        plate: &str,
    ) -> AppResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE license_plate = $1")
            .bind(plate)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando vehículo por patente")
    }

    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error bloqueando vehículo")
    }

    pub async fn find_by_sticker(
        conn: &mut PgConnection,
        sticker_id: Uuid,
    ) -> AppResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE sticker_id = $1")
            .bind(sticker_id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando vehículo por oblea")
    }

    /// Alta o modificación por patente; no toca `sticker_id`
    pub async fn upsert_by_plate(
        conn: &mut PgConnection,
        data: &VehicleData,
        owner_id: Option<Uuid>,
        driver_id: Option<Uuid>,
    ) -> AppResult<Uuid> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO vehicles (
                id, license_plate, brand, model, manufacture_year, vehicle_type, usage_type,
                fuel_type, engine_number, chassis_number, owner_id, driver_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (license_plate) DO UPDATE
            SET brand = COALESCE(EXCLUDED.brand, vehicles.brand),
                model = COALESCE(EXCLUDED.model, vehicles.model),
                manufacture_year = COALESCE(EXCLUDED.manufacture_year, vehicles.manufacture_year),
                vehicle_type = COALESCE(EXCLUDED.vehicle_type, vehicles.vehicle_type),
                usage_type = COALESCE(EXCLUDED.usage_type, vehicles.usage_type),
                fuel_type = COALESCE(EXCLUDED.fuel_type, vehicles.fuel_type),
                engine_number = COALESCE(EXCLUDED.engine_number, vehicles.engine_number),
                chassis_number = COALESCE(EXCLUDED.chassis_number, vehicles.chassis_number),
                owner_id = COALESCE(EXCLUDED.owner_id, vehicles.owner_id),
                driver_id = COALESCE(EXCLUDED.driver_id, vehicles.driver_id),
                updated_at = now()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.license_plate)
        .bind(&data.brand)
        .bind(&data.model)
        .bind(data.manufacture_year)
        .bind(&data.vehicle_type)
        .bind(&data.usage_type)
        .bind(&data.fuel_type)
        .bind(&data.engine_number)
        .bind(&data.chassis_number)
        .bind(owner_id)
        .bind(driver_id)
        .fetch_one(conn)
        .await
        .map_db_err("Error guardando vehículo")?;

        Ok(row.0)
    }

    pub async fn set_people(
        conn: &mut PgConnection,
        vehicle_id: Uuid,
        owner_id: Option<Uuid>,
        driver_id: Option<Uuid>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE vehicles
            SET owner_id = COALESCE($2, owner_id),
                driver_id = COALESCE($3, driver_id),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(vehicle_id)
        .bind(owner_id)
        .bind(driver_id)
        .execute(conn)
        .await
        .map_db_err("Error actualizando titular/conductor del vehículo")?;

        Ok(())
    }

    pub async fn set_sticker(
        conn: &mut PgConnection,
        vehicle_id: Uuid,
        sticker_id: Option<Uuid>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE vehicles SET sticker_id = $2, updated_at = now() WHERE id = $1")
            .bind(vehicle_id)
            .bind(sticker_id)
            .execute(conn)
            .await
            .map_db_err("Error vinculando oblea al vehículo")?;

        Ok(())
    }
}
