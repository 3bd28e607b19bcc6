//! Ciclo de vida de obleas
//!
//! `StickerManager` opera dentro de la transacción de quien lo invoca y es el único que
//! cambia `stickers.status` o `vehicles.sticker_id`. `StickerService` expone las
//! operaciones de obleas que llegan por HTTP.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::config::EnvironmentConfig;
use crate::models::sticker::{
    expand_sticker_numbers, AssignmentCheck, ReleaseTarget, Sticker, StickerOrder, StickerRange,
    StickerStatus,
};
use crate::models::user::RequestContext;
use crate::models::vehicle::Vehicle;
use crate::repositories::{StickerRepository, VehicleRepository};
use crate::services::access::{ensure_admin, ensure_workshop_access};
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct StickerManager;

impl StickerManager {
    /// Vincula la oblea al vehículo (ya bloqueado). La oblea anterior, si la hay,
    /// vuelve a Disponible, o a No Disponible si ya venció.
    pub async fn bind(
        conn: &mut PgConnection,
        vehicle: &Vehicle,
        sticker_id: Uuid,
        workshop_scope: Option<Uuid>,
        today: NaiveDate,
    ) -> AppResult<()> {
        let prior = vehicle.sticker_id.filter(|prior| *prior != sticker_id);

        // dos obleas: se bloquean siempre en el mismo orden
        let mut prior_sticker = None;
        if let Some(prior) = prior {
            if prior < sticker_id {
                prior_sticker = StickerRepository::lock_by_id(&mut *conn, prior).await?;
            }
        }

        let locked = StickerRepository::lock_for_assignment(&mut *conn, sticker_id)
            .await?
            .ok_or_else(|| not_found_error("Sticker", &sticker_id.to_string()))?;

        if let Some(prior) = prior {
            if prior > sticker_id {
                prior_sticker = StickerRepository::lock_by_id(&mut *conn, prior).await?;
            }
        }

        if locked.check_assignable(&vehicle.license_plate, workshop_scope, today)?
            == AssignmentCheck::AlreadyBound
        {
            return Ok(());
        }

        VehicleRepository::set_sticker(&mut *conn, vehicle.id, Some(sticker_id)).await?;
        StickerRepository::set_status(&mut *conn, sticker_id, StickerStatus::InUse).await?;

        if let Some(prior) = prior_sticker {
            let status = release_status(&prior, today);
            StickerRepository::set_status(&mut *conn, prior.id, status).await?;
            info!(
                "🔁 Vehículo {}: oblea {} reemplazada por {} (anterior: {})",
                vehicle.license_plate,
                prior.sticker_number,
                locked.sticker_number,
                status.label()
            );
        } else {
            info!(
                "🏷️ Oblea {} asignada a {}",
                locked.sticker_number, vehicle.license_plate
            );
        }
        Ok(())
    }

    /// Desvincula la oblea del vehículo (ya bloqueado). Devuelve la oblea liberada.
    pub async fn release(
        conn: &mut PgConnection,
        vehicle: &Vehicle,
        target: ReleaseTarget,
    ) -> AppResult<Option<Uuid>> {
        let Some(sticker_id) = vehicle.sticker_id else {
            return Ok(None);
        };

        StickerRepository::lock_by_id(&mut *conn, sticker_id).await?;
        VehicleRepository::set_sticker(&mut *conn, vehicle.id, None).await?;
        StickerRepository::set_status(&mut *conn, sticker_id, target.into()).await?;

        info!(
            "🏷️ Oblea {} liberada de {} ({})",
            sticker_id,
            vehicle.license_plate,
            StickerStatus::from(target).label()
        );
        Ok(Some(sticker_id))
    }

    /// Baja por vencimiento del condicional: el vehículo queda sin oblea y la oblea
    /// pasa a No Disponible marcada como vencida por trámite.
    pub async fn revoke(conn: &mut PgConnection, vehicle: &Vehicle) -> AppResult<Option<Uuid>> {
        let released = Self::release(&mut *conn, vehicle, ReleaseTarget::Unavailable).await?;
        if let Some(sticker_id) = released {
            StickerRepository::mark_expired_application(&mut *conn, sticker_id).await?;
        }
        Ok(released)
    }
}

/// Resultado de la carga de una orden de obleas
#[derive(Debug, Clone, Serialize)]
pub struct StickerBatchReport {
    pub order: StickerOrder,
    pub inserted: Vec<String>,
    pub duplicates: Vec<String>,
}

pub struct StickerService {
    pool: PgPool,
    config: EnvironmentConfig,
}

impl StickerService {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        Self { pool, config }
    }

    /// Alta de una orden de obleas. Los números ya existentes se informan y no se insertan.
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        workshop_id: Uuid,
        numbers: &[String],
        range: Option<&StickerRange>,
        expiration_date: Option<NaiveDate>,
    ) -> AppResult<StickerBatchReport> {
        ensure_admin(ctx)?;
        let requested = expand_sticker_numbers(numbers, range)?;

        let mut tx = self.pool.begin().await?;
        let order = StickerRepository::create_order(&mut *tx, workshop_id).await?;
        let inserted =
            StickerRepository::insert_batch(&mut *tx, order.id, &requested, expiration_date)
                .await?;
        let order =
            StickerRepository::set_order_amount(&mut *tx, order.id, inserted.len() as i32).await?;
        tx.commit().await?;

        let duplicates = split_duplicates(&requested, &inserted);
        info!(
            "📦 Orden de obleas {} para taller {}: {} insertadas, {} duplicadas",
            order.id,
            workshop_id,
            inserted.len(),
            duplicates.len()
        );

        Ok(StickerBatchReport {
            order,
            inserted,
            duplicates,
        })
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        workshop_id: Uuid,
        status: Option<StickerStatus>,
    ) -> AppResult<Vec<Sticker>> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop_access(&mut *conn, ctx, workshop_id).await?;
        StickerRepository::list_by_workshop(&mut *conn, workshop_id, status).await
    }

    /// Liberación manual: el vehículo queda sin oblea y la oblea vuelve a Disponible
    pub async fn release(&self, ctx: &RequestContext, sticker_id: Uuid) -> AppResult<Sticker> {
        ensure_admin(ctx)?;
        let mut tx = self.pool.begin().await?;

        let holder = VehicleRepository::find_by_sticker(&mut *tx, sticker_id).await?;
        match holder {
            Some(holder) => {
                let vehicle = VehicleRepository::lock_by_id(&mut *tx, holder.id)
                    .await?
                    .ok_or_else(|| not_found_error("Vehicle", &holder.id.to_string()))?;
                if vehicle.sticker_id != Some(sticker_id) {
                    return Err(AppError::Conflict(
                        "La oblea cambió de vehículo durante la operación; reintente".to_string(),
                    ));
                }
                let sticker = StickerRepository::lock_by_id(&mut *tx, sticker_id)
                    .await?
                    .ok_or_else(|| not_found_error("Sticker", &sticker_id.to_string()))?;
                if sticker.is_expired(self.today()) {
                    return Err(AppError::StickerExpired(sticker.sticker_number));
                }
                StickerManager::release(&mut *tx, &vehicle, ReleaseTarget::Available).await?;
            }
            None => {
                let sticker = StickerRepository::lock_by_id(&mut *tx, sticker_id)
                    .await?
                    .ok_or_else(|| not_found_error("Sticker", &sticker_id.to_string()))?;
                if sticker.is_expired(self.today()) {
                    return Err(AppError::StickerExpired(sticker.sticker_number));
                }
                StickerRepository::set_status(&mut *tx, sticker_id, StickerStatus::Available)
                    .await?;
            }
        }

        let sticker = StickerRepository::find_by_id(&mut *tx, sticker_id)
            .await?
            .ok_or_else(|| not_found_error("Sticker", &sticker_id.to_string()))?;
        tx.commit().await?;
        Ok(sticker)
    }

    /// Baja manual de una oblea que no está en uso
    pub async fn mark_unavailable(&self, ctx: &RequestContext, sticker_id: Uuid) -> AppResult<Sticker> {
        ensure_admin(ctx)?;
        let mut tx = self.pool.begin().await?;

        let locked = StickerRepository::lock_for_assignment(&mut *tx, sticker_id)
            .await?
            .ok_or_else(|| not_found_error("Sticker", &sticker_id.to_string()))?;
        if let Some(plate) = locked.holder_plate {
            return Err(AppError::Conflict(format!(
                "La oblea {} está asignada al vehículo {}",
                locked.sticker_number, plate
            )));
        }
        StickerRepository::set_status(&mut *tx, sticker_id, StickerStatus::Unavailable).await?;

        let sticker = StickerRepository::find_by_id(&mut *tx, sticker_id)
            .await?
            .ok_or_else(|| not_found_error("Sticker", &sticker_id.to_string()))?;
        tx.commit().await?;
        Ok(sticker)
    }

    fn today(&self) -> NaiveDate {
        self.config.display_zone.today(Utc::now())
    }
}

/// Una oblea vencida nunca vuelve a Disponible
fn release_status(sticker: &Sticker, today: NaiveDate) -> StickerStatus {
    if sticker.is_expired(today) {
        StickerStatus::Unavailable
    } else {
        StickerStatus::Available
    }
}

fn split_duplicates(requested: &[String], inserted: &[String]) -> Vec<String> {
    let inserted: std::collections::HashSet<&str> = inserted.iter().map(String::as_str).collect();
    requested
        .iter()
        .filter(|n| !inserted.contains(n.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_duplicates_keeps_request_order() {
        let requested = vec!["A3".to_string(), "A1".to_string(), "A2".to_string()];
        let inserted = vec!["A1".to_string()];
        assert_eq!(split_duplicates(&requested, &inserted), vec!["A3", "A2"]);
    }

    #[test]
    fn test_expired_sticker_is_released_as_unavailable() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut sticker = Sticker {
            id: Uuid::new_v4(),
            sticker_number: "A0001".to_string(),
            sticker_order_id: Uuid::new_v4(),
            status: StickerStatus::InUse,
            expiration_date: NaiveDate::from_ymd_opt(2024, 5, 27),
            is_expired_application: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(release_status(&sticker, today), StickerStatus::Unavailable);

        sticker.expiration_date = Some(today);
        assert_eq!(release_status(&sticker, today), StickerStatus::Available);

        sticker.expiration_date = None;
        assert_eq!(release_status(&sticker, today), StickerStatus::Available);
    }
}
