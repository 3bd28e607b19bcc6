//! Verificación pública por QR
//!
//! A partir del número de oblea devuelve el vehículo, el taller y el último trámite con
//! la inspección más relevante.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::EnvironmentConfig;
use crate::models::application::{Application, ApplicationResult};
use crate::models::inspection::Inspection;
use crate::models::sticker::Sticker;
use crate::models::vehicle::Vehicle;
use crate::models::workshop::WorkshopIdentity;
use crate::repositories::{
    ApplicationRepository, InspectionRepository, StickerRepository, VehicleRepository,
    WorkshopRepository,
};
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct QrSticker {
    pub sticker_number: String,
    pub status: String,
    pub expiration_date: Option<chrono::NaiveDate>,
    pub is_expired_application: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrCar {
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub manufacture_year: Option<i32>,
    pub vehicle_type: Option<String>,
    pub usage_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrApplication {
    pub id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub date: String,
    pub is_expired: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrInspection {
    pub id: Uuid,
    pub is_second: bool,
    pub result: Option<ApplicationResult>,
    pub result_label: Option<&'static str>,
    pub global_observations: Option<String>,
    pub inspected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrData {
    pub sticker: QrSticker,
    pub car: Option<QrCar>,
    pub workshop: Option<WorkshopIdentity>,
    pub application: Option<QrApplication>,
    pub inspection: Option<QrInspection>,
}

/// La reinspección, si existe, es la inspección informada; su resultado es `result_2`
pub fn select_inspection(
    application: &Application,
    inspections: Vec<Inspection>,
) -> Option<(Inspection, Option<ApplicationResult>)> {
    let mut primary = None;
    for inspection in inspections {
        if inspection.is_second {
            return Some((inspection, application.effective_result()));
        }
        primary = Some(inspection);
    }
    primary.map(|inspection| (inspection, application.result))
}

pub struct QrService {
    pool: PgPool,
    config: EnvironmentConfig,
}

impl QrService {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        Self { pool, config }
    }

    pub async fn verify(&self, sticker_number: &str) -> AppResult<QrData> {
        let number = sticker_number.trim().to_uppercase();
        let mut conn = self.pool.acquire().await?;

        let sticker = StickerRepository::find_by_number(&mut *conn, &number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Oblea {} inexistente", number)))?;

        let vehicle = VehicleRepository::find_by_sticker(&mut *conn, sticker.id).await?;
        let application = match vehicle.as_ref() {
            Some(vehicle) => ApplicationRepository::latest_for_vehicle(&mut *conn, vehicle.id).await?,
            None => None,
        };

        let workshop_id = match application.as_ref() {
            Some(application) => Some(application.workshop_id),
            None => StickerRepository::workshop_of(&mut *conn, sticker.id).await?,
        };
        let workshop = match workshop_id {
            Some(id) => WorkshopRepository::identity(&mut *conn, id).await?,
            None => None,
        };

        let inspection = match application.as_ref() {
            Some(application) => {
                let inspections =
                    InspectionRepository::list_for_application(&mut *conn, application.id).await?;
                select_inspection(application, inspections)
            }
            None => None,
        };

        Ok(QrData {
            sticker: qr_sticker(&sticker),
            car: vehicle.as_ref().map(qr_car),
            workshop,
            application: application.as_ref().map(|a| QrApplication {
                id: a.id,
                status: a.status.label().to_string(),
                created_at: a.created_at,
                date: self.config.display_zone.format(a.created_at),
                is_expired: a.is_expired,
            }),
            inspection: inspection.map(|(inspection, result)| QrInspection {
                id: inspection.id,
                is_second: inspection.is_second,
                result,
                result_label: result.map(|r| r.label()),
                global_observations: inspection.global_observations,
                inspected_at: inspection.updated_at,
            }),
        })
    }
}

fn qr_sticker(sticker: &Sticker) -> QrSticker {
    QrSticker {
        sticker_number: sticker.sticker_number.clone(),
        status: sticker.status.label().to_string(),
        expiration_date: sticker.expiration_date,
        is_expired_application: sticker.is_expired_application,
    }
}

fn qr_car(vehicle: &Vehicle) -> QrCar {
    QrCar {
        license_plate: vehicle.license_plate.clone(),
        brand: vehicle.brand.clone(),
        model: vehicle.model.clone(),
        manufacture_year: vehicle.manufacture_year,
        vehicle_type: vehicle.vehicle_type.clone(),
        usage_type: vehicle.usage_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::ApplicationStatus;

    fn application(result: ApplicationResult, result_2: Option<ApplicationResult>) -> Application {
        let now = Utc::now();
        Application {
            id: Uuid::new_v4(),
            workshop_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            owner_id: None,
            driver_id: None,
            vehicle_id: None,
            status: ApplicationStatus::Completed,
            result: Some(result),
            result_2,
            consumed: true,
            is_deleted: false,
            is_expired: false,
            certificate_url: None,
            second_certificate_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn inspection(application_id: Uuid, is_second: bool) -> Inspection {
        let now = Utc::now();
        Inspection {
            id: Uuid::new_v4(),
            application_id,
            is_second,
            global_observations: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_second_inspection_reports_result_2() {
        let app = application(ApplicationResult::Conditional, Some(ApplicationResult::Apt));
        let (chosen, result) = select_inspection(
            &app,
            vec![inspection(app.id, false), inspection(app.id, true)],
        )
        .unwrap();
        assert!(chosen.is_second);
        assert_eq!(result, Some(ApplicationResult::Apt));
    }

    #[test]
    fn test_pending_second_inspection_falls_back_to_result() {
        let app = application(ApplicationResult::Conditional, None);
        let (chosen, result) = select_inspection(&app, vec![inspection(app.id, true)]).unwrap();
        assert!(chosen.is_second);
        assert_eq!(result, Some(ApplicationResult::Conditional));
    }

    #[test]
    fn test_primary_inspection_reports_result() {
        let app = application(ApplicationResult::Rejected, None);
        let (chosen, result) = select_inspection(&app, vec![inspection(app.id, false)]).unwrap();
        assert!(!chosen.is_second);
        assert_eq!(result, Some(ApplicationResult::Rejected));
        assert!(select_inspection(&app, Vec::new()).is_none());
    }
}
