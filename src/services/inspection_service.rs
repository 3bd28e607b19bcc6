//! Carga de inspecciones
//!
//! Pasos ordenados por taller, detalle por paso, checklist de observaciones y
//! observaciones generales. Toda escritura bloquea antes el trámite.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::application::Application;
use crate::models::inspection::{
    build_catalog_tree, CatalogCategory, DetailStatus, Inspection, InspectionDetail, OrderedStep,
};
use crate::models::user::RequestContext;
use crate::repositories::{ApplicationRepository, InspectionRepository};
use crate::services::access::ensure_workshop_access;
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    #[serde(flatten)]
    pub detail: InspectionDetail,
    pub checked_observation_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectionView {
    pub inspection: Inspection,
    pub steps: Vec<OrderedStep>,
    pub details: Vec<DetailView>,
}

pub struct InspectionService {
    pool: PgPool,
}

impl InspectionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn steps(&self, ctx: &RequestContext, workshop_id: Uuid) -> AppResult<Vec<OrderedStep>> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop_access(&mut *conn, ctx, workshop_id).await?;
        InspectionRepository::ordered_steps(&mut *conn, workshop_id).await
    }

    pub async fn catalog(
        &self,
        ctx: &RequestContext,
        workshop_id: Uuid,
        step_id: Uuid,
    ) -> AppResult<Vec<CatalogCategory>> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop_access(&mut *conn, ctx, workshop_id).await?;
        let rows = InspectionRepository::catalog_rows(&mut *conn, workshop_id, step_id).await?;
        Ok(build_catalog_tree(rows))
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        application_id: Uuid,
        is_second: bool,
    ) -> AppResult<InspectionView> {
        let mut conn = self.pool.acquire().await?;
        let application = ApplicationRepository::find_by_id(&mut *conn, application_id)
            .await?
            .ok_or_else(|| not_found_error("Application", &application_id.to_string()))?;
        ensure_workshop_access(&mut *conn, ctx, application.workshop_id).await?;
        application.ensure_not_deleted()?;

        let inspection = InspectionRepository::find(&mut *conn, application_id, is_second)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "El trámite {} no tiene {}",
                    application_id,
                    if is_second { "reinspección" } else { "inspección" }
                ))
            })?;

        let steps = InspectionRepository::ordered_steps(&mut *conn, application.workshop_id).await?;
        let details = InspectionRepository::details(&mut *conn, inspection.id).await?;
        let checked = InspectionRepository::checked_observations(&mut *conn, inspection.id).await?;

        let mut by_detail: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in checked {
            by_detail.entry(row.detail_id).or_default().push(row.observation_id);
        }
        let details = details
            .into_iter()
            .map(|detail| DetailView {
                checked_observation_ids: by_detail.remove(&detail.id).unwrap_or_default(),
                detail,
            })
            .collect();

        Ok(InspectionView {
            inspection,
            steps,
            details,
        })
    }

    /// Bloquea el trámite y devuelve la inspección editable
    async fn lock_editable(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        application_id: Uuid,
        is_second: bool,
    ) -> AppResult<(Application, Inspection)> {
        let application = ApplicationRepository::lock(&mut *conn, application_id).await?;
        ensure_workshop_access(&mut *conn, ctx, application.workshop_id).await?;
        application.ensure_inspection_editable(is_second)?;

        let inspection = InspectionRepository::find(&mut *conn, application_id, is_second)
            .await?
            .ok_or_else(|| AppError::Conflict("La inspección no fue iniciada".to_string()))?;
        Ok((application, inspection))
    }

    pub async fn upsert_detail(
        &self,
        ctx: &RequestContext,
        application_id: Uuid,
        is_second: bool,
        step_id: Uuid,
        status: DetailStatus,
        observations: Option<&str>,
    ) -> AppResult<InspectionDetail> {
        let mut tx = self.pool.begin().await?;
        let (application, inspection) =
            Self::lock_editable(&mut *tx, ctx, application_id, is_second).await?;

        if !InspectionRepository::step_in_workshop(&mut *tx, application.workshop_id, step_id).await? {
            return Err(AppError::BadRequest(format!(
                "El paso {} no pertenece al taller",
                step_id
            )));
        }

        let detail =
            InspectionRepository::upsert_detail(&mut *tx, inspection.id, step_id, status, observations)
                .await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// Reemplaza las observaciones marcadas del detalle
    pub async fn set_checked_observations(
        &self,
        ctx: &RequestContext,
        detail_id: Uuid,
        checked_ids: &[Uuid],
    ) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = checked_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

        let mut tx = self.pool.begin().await?;
        let context = InspectionRepository::detail_context(&mut *tx, detail_id)
            .await?
            .ok_or_else(|| not_found_error("InspectionDetail", &detail_id.to_string()))?;
        Self::lock_editable(&mut *tx, ctx, context.application_id, context.is_second).await?;

        if !ids.is_empty() {
            let matches = InspectionRepository::count_catalog_matches(
                &mut *tx,
                context.workshop_id,
                context.step_id,
                &ids,
            )
            .await?;
            if matches != ids.len() as i64 {
                return Err(AppError::BadRequest(
                    "Hay observaciones que no pertenecen al paso o al taller".to_string(),
                ));
            }
        }

        InspectionRepository::replace_detail_observations(&mut *tx, detail_id, &ids).await?;
        tx.commit().await?;
        Ok(ids)
    }

    pub async fn set_global_observations(
        &self,
        ctx: &RequestContext,
        application_id: Uuid,
        is_second: bool,
        text: Option<&str>,
    ) -> AppResult<Inspection> {
        let mut tx = self.pool.begin().await?;
        let (_, inspection) = Self::lock_editable(&mut *tx, ctx, application_id, is_second).await?;

        let text = text.map(str::trim).filter(|t| !t.is_empty());
        let inspection =
            InspectionRepository::set_global_observations(&mut *tx, inspection.id, text).await?;
        tx.commit().await?;
        Ok(inspection)
    }
}
