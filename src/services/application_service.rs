//! Máquina de estados del trámite
//!
//! Cada transición abre una transacción, bloquea primero la fila del trámite y recién
//! después el taller y la oblea. Los efectos externos (PDF, storage, emails) ocurren
//! después del commit.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::ObjectStorage;
use crate::config::EnvironmentConfig;
use crate::models::application::{Application, ApplicationStatus, InspectionResult};
use crate::models::document::ApplicationDocument;
use crate::models::inspection::Inspection;
use crate::models::person::{Person, PersonData};
use crate::models::sticker::Sticker;
use crate::models::user::RequestContext;
use crate::models::vehicle::{Vehicle, VehicleData};
use crate::repositories::{
    ApplicationRepository, DocumentRepository, InspectionRepository, PersonRepository,
    StickerRepository, VehicleRepository, WorkshopRepository,
};
use crate::services::access::ensure_workshop_access;
use crate::services::certificate_service::{
    CertificateData, CertificateIssuer, CertificateKind, CertificateRecorder,
    PgCertificateRecorder,
};
use crate::services::notifications::{EmailJob, Notifier, TEMPLATE_CERTIFICATE_ISSUED};
use crate::services::slot_ledger::SlotLedger;
use crate::services::sticker_service::StickerManager;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::validation::sanitize_file_name;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Conductor del trámite: el mismo titular o una persona distinta
#[derive(Debug, Clone)]
pub enum DriverInput {
    SameAsOwner,
    Person(PersonData),
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsumeOutcome {
    pub application_id: Uuid,
    /// `false` si el cupo ya se había consumido antes
    pub newly_consumed: bool,
    pub available_inspections: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalizeOutcome {
    pub application: Application,
    pub result: InspectionResult,
    pub certificate_url: String,
}

/// Trámite con todas sus relaciones
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    pub application: Application,
    pub created_at_local: String,
    pub owner: Option<Person>,
    pub driver: Option<Person>,
    pub vehicle: Option<Vehicle>,
    pub sticker: Option<Sticker>,
    pub inspections: Vec<Inspection>,
    pub documents: Vec<ApplicationDocument>,
}

pub struct ApplicationService {
    pool: PgPool,
    config: EnvironmentConfig,
    storage: Arc<dyn ObjectStorage>,
    issuer: CertificateIssuer,
    recorder: Arc<dyn CertificateRecorder>,
    notifier: Notifier,
}

impl ApplicationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            config: state.config.clone(),
            storage: state.storage.clone(),
            issuer: CertificateIssuer::new(
                state.storage.clone(),
                state.renderer.clone(),
                state.config.clone(),
            ),
            recorder: Arc::new(PgCertificateRecorder::new(state.pool.clone())),
            notifier: state.notifier.clone(),
        }
    }

    /// Bloquea el trámite y verifica que el usuario opere sobre su taller
    async fn lock_for(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        id: Uuid,
    ) -> AppResult<Application> {
        let application = ApplicationRepository::lock(&mut *conn, id).await?;
        ensure_workshop_access(&mut *conn, ctx, application.workshop_id).await?;
        application.ensure_not_deleted()?;
        Ok(application)
    }

    async fn reload(conn: &mut PgConnection, id: Uuid) -> AppResult<Application> {
        ApplicationRepository::find_by_id(conn, id)
            .await?
            .ok_or_else(|| not_found_error("Application", &id.to_string()))
    }

    pub async fn create(&self, ctx: &RequestContext, workshop_id: Uuid) -> AppResult<Application> {
        let mut tx = self.pool.begin().await?;
        ensure_workshop_access(&mut *tx, ctx, workshop_id).await?;
        WorkshopRepository::get(&mut *tx, workshop_id)
            .await?
            .ensure_operational()?;

        let application =
            ApplicationRepository::insert(&mut *tx, workshop_id, ctx.user_id, Utc::now()).await?;
        tx.commit().await?;

        info!("📝 Trámite {} creado en taller {}", application.id, workshop_id);
        Ok(application)
    }

    pub async fn set_owner(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        owner: &PersonData,
    ) -> AppResult<Application> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        application.ensure_editable()?;

        let owner_id = PersonRepository::upsert_by_dni(&mut *tx, owner).await?;
        ApplicationRepository::set_owner(&mut *tx, id, owner_id).await?;
        if let Some(vehicle_id) = application.vehicle_id {
            VehicleRepository::set_people(&mut *tx, vehicle_id, Some(owner_id), None).await?;
        }

        let application = Self::reload(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(application)
    }

    pub async fn set_driver(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        driver: &DriverInput,
    ) -> AppResult<Application> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        application.ensure_editable()?;

        let driver_id = match driver {
            DriverInput::SameAsOwner => application.owner_id.ok_or_else(|| {
                AppError::BadRequest(
                    "Primero se debe cargar el titular para usarlo como conductor".to_string(),
                )
            })?,
            DriverInput::Person(data) => PersonRepository::upsert_by_dni(&mut *tx, data).await?,
        };
        ApplicationRepository::set_driver(&mut *tx, id, driver_id).await?;
        if let Some(vehicle_id) = application.vehicle_id {
            VehicleRepository::set_people(&mut *tx, vehicle_id, None, Some(driver_id)).await?;
        }

        let application = Self::reload(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(application)
    }

    /// Alta o modificación del vehículo por patente y, si viene, cambio de oblea
    pub async fn set_vehicle(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        data: &VehicleData,
        sticker_id: Option<Uuid>,
    ) -> AppResult<Application> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        application.ensure_editable()?;

        let vehicle_id = VehicleRepository::upsert_by_plate(
            &mut *tx,
            data,
            application.owner_id,
            application.driver_id,
        )
        .await?;
        let vehicle = VehicleRepository::lock_by_id(&mut *tx, vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &vehicle_id.to_string()))?;

        if let Some(sticker_id) = sticker_id {
            let today = self.config.display_zone.today(Utc::now());
            StickerManager::bind(
                &mut *tx,
                &vehicle,
                sticker_id,
                Some(application.workshop_id),
                today,
            )
            .await?;
        }

        ApplicationRepository::set_vehicle(&mut *tx, id, vehicle_id).await?;
        let application = Self::reload(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(application)
    }

    pub async fn enqueue(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Application> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        application.ensure_can_enqueue()?;

        let application =
            ApplicationRepository::set_status(&mut *tx, id, ApplicationStatus::Queued).await?;
        tx.commit().await?;
        Ok(application)
    }

    /// Consume un cupo del taller. Idempotente: si ya se consumió devuelve el cupo actual.
    pub async fn consume_slot(&self, ctx: &RequestContext, id: Uuid) -> AppResult<ConsumeOutcome> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;

        if application.consumed {
            let quota = WorkshopRepository::current_quota(&mut *tx, application.workshop_id).await?;
            tx.commit().await?;
            return Ok(ConsumeOutcome {
                application_id: id,
                newly_consumed: false,
                available_inspections: quota,
            });
        }

        application.ensure_can_consume(self.config.allow_consume_in_progress)?;
        let quota = SlotLedger::consume(&mut *tx, application.workshop_id).await?;
        ApplicationRepository::mark_consumed(&mut *tx, id).await?;
        tx.commit().await?;

        info!(
            "🎫 Trámite {} consumió un cupo; quedan {} en taller {}",
            id, quota, application.workshop_id
        );
        Ok(ConsumeOutcome {
            application_id: id,
            newly_consumed: true,
            available_inspections: quota,
        })
    }

    pub async fn start_inspection(&self, ctx: &RequestContext, id: Uuid) -> AppResult<Inspection> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        let already_started =
            application.ensure_can_start_inspection(!self.config.allow_consume_in_progress)?;

        if !already_started {
            ApplicationRepository::set_status(&mut *tx, id, ApplicationStatus::InProgress).await?;
        }
        let inspection = InspectionRepository::insert_if_absent(&mut *tx, id, false).await?;
        tx.commit().await?;
        Ok(inspection)
    }

    pub async fn start_second_inspection(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> AppResult<Inspection> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        application.ensure_can_reinspect()?;

        let inspection = InspectionRepository::insert_if_absent(&mut *tx, id, true).await?;
        tx.commit().await?;
        Ok(inspection)
    }

    /// Cierra la inspección principal y emite el certificado
    pub async fn finalize(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        result: Option<InspectionResult>,
    ) -> AppResult<FinalizeOutcome> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        application.ensure_can_finalize()?;
        let result = Self::resolve_result(&mut *tx, id, false, result).await?;
        let data = Self::certificate_data(&mut *tx, application, false).await?;
        tx.commit().await?;

        self.issue(data, result, CertificateKind::Primary).await
    }

    /// Cierra la reinspección de un condicional; no consume cupo
    pub async fn second_finalize(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        result: Option<InspectionResult>,
    ) -> AppResult<FinalizeOutcome> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        application.ensure_can_reinspect()?;
        if InspectionRepository::find(&mut *tx, id, true).await?.is_none() {
            return Err(AppError::Conflict(
                "La reinspección del trámite no fue iniciada".to_string(),
            ));
        }
        let result = Self::resolve_result(&mut *tx, id, true, result).await?;
        let data = Self::certificate_data(&mut *tx, application, true).await?;
        tx.commit().await?;

        self.issue(data, result, CertificateKind::Second).await
    }

    async fn issue(
        &self,
        data: CertificateData,
        result: InspectionResult,
        kind: CertificateKind,
    ) -> AppResult<FinalizeOutcome> {
        let certificate_url = self
            .issuer
            .issue(&data, result, kind, self.recorder.as_ref())
            .await?;

        if let Some(email) = data.owner.as_ref().and_then(|o| o.email.as_deref()) {
            let job = EmailJob::new(TEMPLATE_CERTIFICATE_ISSUED, email)
                .var(
                    "nombre",
                    data.owner.as_ref().map(Person::full_name).unwrap_or_default(),
                )
                .var(
                    "dominio",
                    data.vehicle
                        .as_ref()
                        .map(|v| v.license_plate.clone())
                        .unwrap_or_default(),
                )
                .var("resultado", result.label())
                .var("certificado_url", certificate_url.clone());
            self.notifier.enqueue(job);
        }

        let mut conn = self.pool.acquire().await?;
        let application = Self::reload(&mut *conn, data.application.id).await?;
        Ok(FinalizeOutcome {
            application,
            result,
            certificate_url,
        })
    }

    /// Resultado explícito o derivado de los pasos cargados
    async fn resolve_result(
        conn: &mut PgConnection,
        id: Uuid,
        is_second: bool,
        explicit: Option<InspectionResult>,
    ) -> AppResult<InspectionResult> {
        if let Some(result) = explicit {
            return Ok(result);
        }
        let inspection = InspectionRepository::find(&mut *conn, id, is_second)
            .await?
            .ok_or_else(|| AppError::Conflict("El trámite no tiene inspección".to_string()))?;
        let statuses: Vec<_> = InspectionRepository::details(&mut *conn, inspection.id)
            .await?
            .into_iter()
            .map(|d| d.status)
            .collect();
        InspectionResult::derive(&statuses).ok_or_else(|| {
            AppError::BadRequest(
                "La inspección no tiene pasos cargados; indique el resultado".to_string(),
            )
        })
    }

    async fn certificate_data(
        conn: &mut PgConnection,
        application: Application,
        is_second: bool,
    ) -> AppResult<CertificateData> {
        let workshop = WorkshopRepository::get(&mut *conn, application.workshop_id).await?;
        let owner = PersonRepository::find_optional(&mut *conn, application.owner_id).await?;
        let driver = PersonRepository::find_optional(&mut *conn, application.driver_id).await?;
        let vehicle = match application.vehicle_id {
            Some(vehicle_id) => VehicleRepository::find_by_id(&mut *conn, vehicle_id).await?,
            None => None,
        };
        let sticker = match vehicle.as_ref().and_then(|v| v.sticker_id) {
            Some(sticker_id) => StickerRepository::find_by_id(&mut *conn, sticker_id).await?,
            None => None,
        };
        let global_observations = InspectionRepository::find(&mut *conn, application.id, is_second)
            .await?
            .and_then(|i| i.global_observations);

        Ok(CertificateData {
            application,
            workshop,
            owner,
            driver,
            vehicle,
            sticker,
            global_observations,
        })
    }

    /// Baja lógica; el cupo consumido no se devuelve
    pub async fn soft_delete(&self, ctx: &RequestContext, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let application = Self::lock_for(&mut *tx, ctx, id).await?;
        application.ensure_can_delete()?;
        ApplicationRepository::soft_delete(&mut *tx, id).await?;
        tx.commit().await?;

        info!("🗑️ Trámite {} eliminado", id);
        Ok(())
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        workshop_id: Uuid,
        status: Option<ApplicationStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> AppResult<Vec<Application>> {
        let (limit, offset) = page(limit, offset);
        let mut conn = self.pool.acquire().await?;
        ensure_workshop_access(&mut *conn, ctx, workshop_id).await?;
        ApplicationRepository::list_by_workshop(&mut *conn, workshop_id, status, limit, offset).await
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> AppResult<ApplicationDetail> {
        let mut conn = self.pool.acquire().await?;
        let application = self.readable(&mut *conn, ctx, id).await?;

        let owner = PersonRepository::find_optional(&mut *conn, application.owner_id).await?;
        let driver = PersonRepository::find_optional(&mut *conn, application.driver_id).await?;
        let vehicle = match application.vehicle_id {
            Some(vehicle_id) => VehicleRepository::find_by_id(&mut *conn, vehicle_id).await?,
            None => None,
        };
        let sticker = match vehicle.as_ref().and_then(|v| v.sticker_id) {
            Some(sticker_id) => StickerRepository::find_by_id(&mut *conn, sticker_id).await?,
            None => None,
        };
        let inspections = InspectionRepository::list_for_application(&mut *conn, id).await?;
        let documents = DocumentRepository::list_for_application(&mut *conn, id).await?;

        Ok(ApplicationDetail {
            created_at_local: self.config.display_zone.format(application.created_at),
            application,
            owner,
            driver,
            vehicle,
            sticker,
            inspections,
            documents,
        })
    }

    /// Lectura sin bloqueo con verificación de acceso
    async fn readable(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
        id: Uuid,
    ) -> AppResult<Application> {
        let application = ApplicationRepository::find_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| not_found_error("Application", &id.to_string()))?;
        ensure_workshop_access(&mut *conn, ctx, application.workshop_id).await?;
        application.ensure_not_deleted()?;
        Ok(application)
    }

    pub async fn upload_document(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<ApplicationDocument> {
        if bytes.is_empty() {
            return Err(AppError::BadRequest("El archivo está vacío".to_string()));
        }
        {
            let mut conn = self.pool.acquire().await?;
            self.readable(&mut *conn, ctx, id).await?;
        }

        let name = sanitize_file_name(file_name);
        let path = format!("{}/{}-{}", id, Uuid::new_v4(), name);
        let size = bytes.len() as i64;
        let bucket = &self.config.buckets.documents;
        let url = self.storage.put(bucket, &path, bytes, content_type).await?;

        let mut conn = self.pool.acquire().await?;
        match DocumentRepository::insert(&mut *conn, id, &name, &path, &url, content_type, size)
            .await
        {
            Ok(document) => Ok(document),
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(bucket, &path).await {
                    warn!("⚠️ No se pudo borrar {} tras el error: {}", path, cleanup);
                }
                Err(e)
            }
        }
    }

    pub async fn list_documents(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> AppResult<Vec<ApplicationDocument>> {
        let mut conn = self.pool.acquire().await?;
        self.readable(&mut *conn, ctx, id).await?;
        DocumentRepository::list_for_application(&mut *conn, id).await
    }

    pub async fn delete_document(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        document_id: Uuid,
    ) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        self.readable(&mut *conn, ctx, id).await?;
        let document = DocumentRepository::find(&mut *conn, id, document_id)
            .await?
            .ok_or_else(|| not_found_error("Document", &document_id.to_string()))?;
        DocumentRepository::delete(&mut *conn, document.id).await?;
        drop(conn);

        if let Err(e) = self
            .storage
            .delete(&self.config.buckets.documents, &document.storage_path)
            .await
        {
            warn!("⚠️ Documento {} borrado pero el objeto quedó: {}", document.id, e);
        }
        Ok(())
    }
}

fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(page(None, None), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page(Some(10_000), Some(-5)), (MAX_PAGE_SIZE, 0));
        assert_eq!(page(Some(0), Some(20)), (1, 20));
    }
}
