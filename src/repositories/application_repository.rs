//! Repositorio de trámites
//!
//! Todas las transiciones de estado se escriben sobre una fila previamente bloqueada con
//! `lock`. Las consultas de listado excluyen los trámites eliminados.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::application::{Application, ApplicationResult, ApplicationStatus};
use crate::utils::errors::{not_found_error, AppResult, DbErrorExt};

pub struct ApplicationRepository;

impl ApplicationRepository {
    pub async fn insert(
        conn: &mut PgConnection,
        workshop_id: Uuid,
        user_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> AppResult<Application> {
        sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (id, workshop_id, user_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'draft', $4, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workshop_id)
        .bind(user_id)
        .bind(created_at)
        .fetch_one(conn)
        .await
        .map_db_err("Error creando trámite")
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Application>> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando trámite")
    }

    /// Bloquea la fila del trámite; primer recurso de cualquier transición
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> AppResult<Application> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error bloqueando trámite")?
            .ok_or_else(|| not_found_error("Application", &id.to_string()))
    }

    pub async fn set_owner(conn: &mut PgConnection, id: Uuid, owner_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE applications SET owner_id = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(owner_id)
            .execute(conn)
            .await
            .map_db_err("Error asignando titular")?;
        Ok(())
    }

    pub async fn set_driver(conn: &mut PgConnection, id: Uuid, driver_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE applications SET driver_id = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(driver_id)
            .execute(conn)
            .await
            .map_db_err("Error asignando conductor")?;
        Ok(())
    }

    pub async fn set_vehicle(conn: &mut PgConnection, id: Uuid, vehicle_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE applications SET vehicle_id = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(vehicle_id)
            .execute(conn)
            .await
            .map_db_err("Error asignando vehículo")?;
        Ok(())
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: ApplicationStatus,
    ) -> AppResult<Application> {
        sqlx::query_as::<_, Application>(
            "UPDATE applications SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(conn)
        .await
        .map_db_err("Error actualizando estado del trámite")
    }

    pub async fn mark_consumed(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE applications SET consumed = TRUE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_db_err("Error marcando cupo consumido")?;
        Ok(())
    }

    pub async fn soft_delete(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE applications SET is_deleted = TRUE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_db_err("Error eliminando trámite")?;
        Ok(())
    }

    /// Estado, resultado y URL del certificado en una única escritura.
    /// Devuelve `false` si el trámite ya no estaba en curso.
    pub async fn mark_completed(
        conn: &mut PgConnection,
        id: Uuid,
        result: ApplicationResult,
        certificate_url: &str,
    ) -> AppResult<bool> {
        let outcome = sqlx::query(
            r#"
            UPDATE applications
            SET status = 'completed', result = $2, certificate_url = $3, updated_at = now()
            WHERE id = $1 AND status = 'in_progress' AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(result)
        .bind(certificate_url)
        .execute(conn)
        .await
        .map_db_err("Error completando trámite")?;

        Ok(outcome.rows_affected() == 1)
    }

    /// Resultado de la reinspección; devuelve `false` si el trámite dejó de ser elegible
    pub async fn mark_second_result(
        conn: &mut PgConnection,
        id: Uuid,
        result: ApplicationResult,
        certificate_url: &str,
    ) -> AppResult<bool> {
        let outcome = sqlx::query(
            r#"
            UPDATE applications
            SET result_2 = $2, second_certificate_url = $3, updated_at = now()
            WHERE id = $1
              AND status = 'completed'
              AND result = 'conditional'
              AND result_2 IS NULL
              AND is_expired = FALSE
            "#,
        )
        .bind(id)
        .bind(result)
        .bind(certificate_url)
        .execute(conn)
        .await
        .map_db_err("Error registrando reinspección")?;

        Ok(outcome.rows_affected() == 1)
    }

    pub async fn list_by_workshop(
        conn: &mut PgConnection,
        workshop_id: Uuid,
        status: Option<ApplicationStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Application>> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT *
            FROM applications
            WHERE workshop_id = $1
              AND is_deleted = FALSE
              AND ($2::application_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(workshop_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando trámites")
    }

    /// Condicionales sin reinspección cuya ventana de gracia venció antes de `cutoff`
    pub async fn conditional_candidates(
        conn: &mut PgConnection,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM applications
            WHERE result = 'conditional'
              AND result_2 IS NULL
              AND is_expired IS NOT TRUE
              AND created_at < $1
            ORDER BY created_at
            "#,
        )
        .bind(cutoff)
        .fetch_all(conn)
        .await
        .map_db_err("Error buscando condicionales vencidos")?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub async fn count_for_vehicle(conn: &mut PgConnection, vehicle_id: Uuid) -> AppResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM applications WHERE vehicle_id = $1")
                .bind(vehicle_id)
                .fetch_one(conn)
                .await
                .map_db_err("Error contando trámites del vehículo")?;
        Ok(row.0)
    }

    pub async fn mark_conditional_expired(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE applications
            SET result = 'conditional_expired', is_expired = TRUE, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(conn)
        .await
        .map_db_err("Error marcando condicional vencido")?;
        Ok(())
    }

    pub async fn latest_for_vehicle(
        conn: &mut PgConnection,
        vehicle_id: Uuid,
    ) -> AppResult<Option<Application>> {
        sqlx::query_as::<_, Application>(
            r#"
            SELECT *
            FROM applications
            WHERE vehicle_id = $1 AND is_deleted = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(conn)
        .await
        .map_db_err("Error buscando último trámite del vehículo")
    }
}
