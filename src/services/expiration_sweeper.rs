//! Vencimiento de trámites condicionales
//!
//! Cada candidato se procesa en su propia transacción y la condición se vuelve a
//! evaluar con la fila bloqueada, así dos corridas simultáneas no lo procesan dos veces.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::EnvironmentConfig;
use crate::models::application::{Application, ApplicationResult};
use crate::repositories::{ApplicationRepository, StickerRepository, VehicleRepository};
use crate::services::sticker_service::StickerManager;
use crate::utils::errors::AppResult;
use crate::utils::time::conditional_cutoff;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub candidates: usize,
    pub expired: usize,
    pub stickers_revoked: usize,
    pub skipped: usize,
    pub stickers_retired: u64,
}

/// Qué pasa con la oblea del vehículo al vencer el condicional
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerFate {
    /// Primer trámite del vehículo: la oblea se da de baja
    Revoke,
    /// El vehículo tiene otros trámites: la oblea no se toca
    Keep,
}

impl StickerFate {
    pub fn for_vehicle_history(applications_for_vehicle: i64) -> Self {
        if applications_for_vehicle == 1 {
            StickerFate::Revoke
        } else {
            StickerFate::Keep
        }
    }
}

/// Condición de vencimiento evaluada sobre la fila bloqueada
pub fn is_expirable(application: &Application, cutoff: DateTime<Utc>) -> bool {
    application.result == Some(ApplicationResult::Conditional)
        && application.result_2.is_none()
        && !application.is_expired
        && application.created_at < cutoff
}

enum Outcome {
    Skipped,
    Expired { sticker_revoked: bool },
}

pub struct ExpirationSweeper {
    pool: PgPool,
    config: EnvironmentConfig,
}

impl ExpirationSweeper {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        Self { pool, config }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let cutoff = conditional_cutoff(now, self.config.conditional_grace_days);
        let mut report = SweepReport::default();

        let candidates = {
            let mut conn = self.pool.acquire().await?;
            ApplicationRepository::conditional_candidates(&mut *conn, cutoff).await?
        };
        report.candidates = candidates.len();

        for id in candidates {
            let mut tx = self.pool.begin().await?;
            match Self::expire_one(&mut *tx, id, cutoff).await {
                Ok(outcome) => {
                    tx.commit().await?;
                    match outcome {
                        Outcome::Skipped => report.skipped += 1,
                        Outcome::Expired { sticker_revoked } => {
                            report.expired += 1;
                            if sticker_revoked {
                                report.stickers_revoked += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("❌ Error venciendo trámite {}: {}", id, e);
                    return Err(e);
                }
            }
        }

        let today = self.config.display_zone.today(now);
        let mut conn = self.pool.acquire().await?;
        report.stickers_retired = StickerRepository::retire_expired_available(&mut *conn, today).await?;

        info!(
            "⏰ Barrido de condicionales: {} candidatos, {} vencidos, {} obleas dadas de baja, {} obleas disponibles retiradas",
            report.candidates, report.expired, report.stickers_revoked, report.stickers_retired
        );
        Ok(report)
    }

    async fn expire_one(
        conn: &mut PgConnection,
        id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Outcome> {
        let application = ApplicationRepository::lock(&mut *conn, id).await?;
        if !is_expirable(&application, cutoff) {
            return Ok(Outcome::Skipped);
        }

        let mut sticker_revoked = false;
        if let Some(vehicle_id) = application.vehicle_id {
            let history = ApplicationRepository::count_for_vehicle(&mut *conn, vehicle_id).await?;
            if StickerFate::for_vehicle_history(history) == StickerFate::Revoke {
                if let Some(vehicle) = VehicleRepository::lock_by_id(&mut *conn, vehicle_id).await? {
                    sticker_revoked = StickerManager::revoke(&mut *conn, &vehicle).await?.is_some();
                }
            }
        }

        ApplicationRepository::mark_conditional_expired(&mut *conn, id).await?;
        info!("⏰ Trámite {} pasó a Condicional Expirado", id);
        Ok(Outcome::Expired { sticker_revoked })
    }
}
