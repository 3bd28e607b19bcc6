//! Repositorio de talleres
//!
//! Lectura de talleres, membresías y el bloqueo de fila sobre el cupo.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::workshop::{Workshop, WorkshopIdentity};
use crate::utils::errors::{not_found_error, AppResult, DbErrorExt};

pub struct WorkshopRepository;

impl WorkshopRepository {
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Workshop>> {
        sqlx::query_as::<_, Workshop>("SELECT * FROM workshops WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando taller")
    }

    pub async fn get(conn: &mut PgConnection, id: Uuid) -> AppResult<Workshop> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| not_found_error("Workshop", &id.to_string()))
    }

    /// Bloquea la fila del taller y devuelve el cupo actual
    pub async fn lock_quota(conn: &mut PgConnection, id: Uuid) -> AppResult<i32> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT available_inspections FROM workshops WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_db_err("Error bloqueando cupo del taller")?;

        row.map(|r| r.0)
            .ok_or_else(|| not_found_error("Workshop", &id.to_string()))
    }

    /// Suma `delta` al cupo; la fila debe estar bloqueada por la transacción actual
    pub async fn add_quota(conn: &mut PgConnection, id: Uuid, delta: i32) -> AppResult<i32> {
        let row: (i32,) = sqlx::query_as(
            r#"
            UPDATE workshops
            SET available_inspections = available_inspections + $2, updated_at = now()
            WHERE id = $1
            RETURNING available_inspections
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_one(conn)
        .await
        .map_db_err("Error actualizando cupo del taller")?;

        Ok(row.0)
    }

    pub async fn current_quota(conn: &mut PgConnection, id: Uuid) -> AppResult<i32> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT available_inspections FROM workshops WHERE id = $1")
                .bind(id)
                .fetch_optional(conn)
                .await
                .map_db_err("Error leyendo cupo del taller")?;

        row.map(|r| r.0)
            .ok_or_else(|| not_found_error("Workshop", &id.to_string()))
    }

    pub async fn is_member(
        conn: &mut PgConnection,
        workshop_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM workshop_users WHERE workshop_id = $1 AND user_id = $2)",
        )
        .bind(workshop_id)
        .bind(user_id)
        .fetch_one(conn)
        .await
        .map_db_err("Error verificando membresía")?;

        Ok(result.0)
    }

    pub async fn identity(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> AppResult<Option<WorkshopIdentity>> {
        sqlx::query_as::<_, WorkshopIdentity>(
            r#"
            SELECT id, name, plant_number, city, province, address, phone
            FROM workshops
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_db_err("Error buscando identidad del taller")
    }

    /// Emails del taller y de sus usuarios, para notificaciones
    pub async fn contact_emails(conn: &mut PgConnection, id: Uuid) -> AppResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT email FROM workshops WHERE id = $1 AND email IS NOT NULL
            UNION
            SELECT u.email FROM workshop_users wu JOIN users u ON u.id = wu.user_id
            WHERE wu.workshop_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando emails del taller")?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
