//! Repositorio de inspecciones
//!
//! Inspecciones (una principal y a lo sumo una reinspección por trámite), detalles por
//! paso, pasos ordenados del taller y el checklist de observaciones.

use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::models::inspection::{
    CatalogRow, DetailStatus, Inspection, InspectionDetail, OrderedStep,
};
use crate::utils::errors::{AppResult, DbErrorExt};

/// Detalle con el trámite y taller a los que pertenece
#[derive(Debug, Clone, FromRow)]
pub struct DetailContext {
    pub detail_id: Uuid,
    pub step_id: Uuid,
    pub inspection_id: Uuid,
    pub is_second: bool,
    pub application_id: Uuid,
    pub workshop_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct CheckedObservation {
    pub detail_id: Uuid,
    pub observation_id: Uuid,
}

pub struct InspectionRepository;

impl InspectionRepository {
    pub async fn find(
        conn: &mut PgConnection,
        application_id: Uuid,
        is_second: bool,
    ) -> AppResult<Option<Inspection>> {
        sqlx::query_as::<_, Inspection>(
            "SELECT * FROM inspections WHERE application_id = $1 AND is_second = $2",
        )
        .bind(application_id)
        .bind(is_second)
        .fetch_optional(conn)
        .await
        .map_db_err("Error buscando inspección")
    }

    /// Crea la inspección si no existe y devuelve la fila vigente
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        application_id: Uuid,
        is_second: bool,
    ) -> AppResult<Inspection> {
        sqlx::query(
            r#"
            INSERT INTO inspections (id, application_id, is_second)
            VALUES ($1, $2, $3)
            ON CONFLICT (application_id, is_second) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(application_id)
        .bind(is_second)
        .execute(&mut *conn)
        .await
        .map_db_err("Error creando inspección")?;

        sqlx::query_as::<_, Inspection>(
            "SELECT * FROM inspections WHERE application_id = $1 AND is_second = $2",
        )
        .bind(application_id)
        .bind(is_second)
        .fetch_one(conn)
        .await
        .map_db_err("Error leyendo inspección")
    }

    pub async fn list_for_application(
        conn: &mut PgConnection,
        application_id: Uuid,
    ) -> AppResult<Vec<Inspection>> {
        sqlx::query_as::<_, Inspection>(
            "SELECT * FROM inspections WHERE application_id = $1 ORDER BY is_second",
        )
        .bind(application_id)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando inspecciones")
    }

    pub async fn set_global_observations(
        conn: &mut PgConnection,
        inspection_id: Uuid,
        text: Option<&str>,
    ) -> AppResult<Inspection> {
        sqlx::query_as::<_, Inspection>(
            r#"
            UPDATE inspections
            SET global_observations = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(inspection_id)
        .bind(text)
        .fetch_one(conn)
        .await
        .map_db_err("Error guardando observaciones generales")
    }

    pub async fn ordered_steps(
        conn: &mut PgConnection,
        workshop_id: Uuid,
    ) -> AppResult<Vec<OrderedStep>> {
        sqlx::query_as::<_, OrderedStep>(
            r#"
            SELECT so.step_id, so.number, s.name, s.description
            FROM steps_order so
            JOIN steps s ON s.id = so.step_id
            WHERE so.workshop_id = $1
            ORDER BY so.number
            "#,
        )
        .bind(workshop_id)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando pasos")
    }

    pub async fn step_in_workshop(
        conn: &mut PgConnection,
        workshop_id: Uuid,
        step_id: Uuid,
    ) -> AppResult<bool> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM steps_order WHERE workshop_id = $1 AND step_id = $2)",
        )
        .bind(workshop_id)
        .bind(step_id)
        .fetch_one(conn)
        .await
        .map_db_err("Error verificando paso")?;
        Ok(row.0)
    }

    pub async fn upsert_detail(
        conn: &mut PgConnection,
        inspection_id: Uuid,
        step_id: Uuid,
        status: DetailStatus,
        observations: Option<&str>,
    ) -> AppResult<InspectionDetail> {
        sqlx::query_as::<_, InspectionDetail>(
            r#"
            INSERT INTO inspection_details (id, inspection_id, step_id, status, observations)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (inspection_id, step_id) DO UPDATE
            SET status = EXCLUDED.status,
                observations = EXCLUDED.observations,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(inspection_id)
        .bind(step_id)
        .bind(status)
        .bind(observations)
        .fetch_one(conn)
        .await
        .map_db_err("Error guardando detalle de inspección")
    }

    pub async fn details(
        conn: &mut PgConnection,
        inspection_id: Uuid,
    ) -> AppResult<Vec<InspectionDetail>> {
        sqlx::query_as::<_, InspectionDetail>(
            r#"
            SELECT d.*
            FROM inspection_details d
            JOIN inspections i ON i.id = d.inspection_id
            JOIN applications a ON a.id = i.application_id
            LEFT JOIN steps_order so ON so.step_id = d.step_id AND so.workshop_id = a.workshop_id
            WHERE d.inspection_id = $1
            ORDER BY so.number NULLS LAST
            "#,
        )
        .bind(inspection_id)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando detalles")
    }

    /// Resuelve el trámite y el taller de un detalle
    pub async fn detail_context(
        conn: &mut PgConnection,
        detail_id: Uuid,
    ) -> AppResult<Option<DetailContext>> {
        sqlx::query_as::<_, DetailContext>(
            r#"
            SELECT d.id AS detail_id, d.step_id, d.inspection_id, i.is_second,
                   a.id AS application_id, a.workshop_id
            FROM inspection_details d
            JOIN inspections i ON i.id = d.inspection_id
            JOIN applications a ON a.id = i.application_id
            WHERE d.id = $1
            "#,
        )
        .bind(detail_id)
        .fetch_optional(conn)
        .await
        .map_db_err("Error buscando detalle")
    }

    /// Cuántos de los ids pertenecen al catálogo del taller para el paso
    pub async fn count_catalog_matches(
        conn: &mut PgConnection,
        workshop_id: Uuid,
        step_id: Uuid,
        observation_ids: &[Uuid],
    ) -> AppResult<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT o.id)
            FROM observations o
            JOIN observation_subcategories sc ON sc.id = o.subcategory_id
            JOIN observation_categories c ON c.id = sc.category_id
            WHERE o.id = ANY($1) AND c.workshop_id = $2 AND c.step_id = $3
            "#,
        )
        .bind(observation_ids)
        .bind(workshop_id)
        .bind(step_id)
        .fetch_one(conn)
        .await
        .map_db_err("Error validando observaciones")?;
        Ok(row.0)
    }

    /// Reemplaza la selección del detalle por `observation_ids`
    pub async fn replace_detail_observations(
        conn: &mut PgConnection,
        detail_id: Uuid,
        observation_ids: &[Uuid],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM inspection_detail_observations
            WHERE detail_id = $1 AND NOT (observation_id = ANY($2))
            "#,
        )
        .bind(detail_id)
        .bind(observation_ids)
        .execute(&mut *conn)
        .await
        .map_db_err("Error limpiando observaciones")?;

        sqlx::query(
            r#"
            INSERT INTO inspection_detail_observations (observation_id, detail_id)
            SELECT UNNEST($2::uuid[]), $1
            ON CONFLICT (observation_id, detail_id) DO NOTHING
            "#,
        )
        .bind(detail_id)
        .bind(observation_ids)
        .execute(conn)
        .await
        .map_db_err("Error guardando observaciones")?;

        Ok(())
    }

    pub async fn checked_observations(
        conn: &mut PgConnection,
        inspection_id: Uuid,
    ) -> AppResult<Vec<CheckedObservation>> {
        sqlx::query_as::<_, CheckedObservation>(
            r#"
            SELECT ido.detail_id, ido.observation_id
            FROM inspection_detail_observations ido
            JOIN inspection_details d ON d.id = ido.detail_id
            WHERE d.inspection_id = $1
            "#,
        )
        .bind(inspection_id)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando observaciones marcadas")
    }

    pub async fn catalog_rows(
        conn: &mut PgConnection,
        workshop_id: Uuid,
        step_id: Uuid,
    ) -> AppResult<Vec<CatalogRow>> {
        sqlx::query_as::<_, CatalogRow>(
            r#"
            SELECT c.id AS category_id, c.name AS category_name,
                   sc.id AS subcategory_id, sc.name AS subcategory_name,
                   o.id AS observation_id, o.description
            FROM observation_categories c
            JOIN observation_subcategories sc ON sc.category_id = c.id
            JOIN observations o ON o.subcategory_id = sc.id
            WHERE c.workshop_id = $1 AND c.step_id = $2
            ORDER BY c.name, c.id, sc.name, sc.id, o.description
            "#,
        )
        .bind(workshop_id)
        .bind(step_id)
        .fetch_all(conn)
        .await
        .map_db_err("Error leyendo catálogo de observaciones")
    }
}
