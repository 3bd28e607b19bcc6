use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::document::ApplicationDocument;
use crate::utils::errors::{AppResult, DbErrorExt};

pub struct DocumentRepository;

impl DocumentRepository {
    pub async fn insert(
        conn: &mut PgConnection,
        application_id: Uuid,
        file_name: &str,
        storage_path: &str,
        url: &str,
        content_type: &str,
        size_bytes: i64,
    ) -> AppResult<ApplicationDocument> {
        sqlx::query_as::<_, ApplicationDocument>(
            r#"
            INSERT INTO application_documents (
                id, application_id, file_name, storage_path, url, content_type, size_bytes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(application_id)
        .bind(file_name)
        .bind(storage_path)
        .bind(url)
        .bind(content_type)
        .bind(size_bytes)
        .fetch_one(conn)
        .await
        .map_db_err("Error guardando documento")
    }

    pub async fn list_for_application(
        conn: &mut PgConnection,
        application_id: Uuid,
    ) -> AppResult<Vec<ApplicationDocument>> {
        sqlx::query_as::<_, ApplicationDocument>(
            "SELECT * FROM application_documents WHERE application_id = $1 ORDER BY created_at",
        )
        .bind(application_id)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando documentos")
    }

    pub async fn find(
        conn: &mut PgConnection,
        application_id: Uuid,
        document_id: Uuid,
    ) -> AppResult<Option<ApplicationDocument>> {
        sqlx::query_as::<_, ApplicationDocument>(
            "SELECT * FROM application_documents WHERE id = $1 AND application_id = $2",
        )
        .bind(document_id)
        .bind(application_id)
        .fetch_optional(conn)
        .await
        .map_db_err("Error buscando documento")
    }

    pub async fn delete(conn: &mut PgConnection, document_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM application_documents WHERE id = $1")
            .bind(document_id)
            .execute(conn)
            .await
            .map_db_err("Error eliminando documento")?;
        Ok(())
    }
}
