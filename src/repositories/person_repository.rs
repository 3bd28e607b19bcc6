//! Repositorio de personas
//!
//! Upsert por DNI: el llamador recibe el id resuelto sin saber si hubo alta o modificación.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::person::{Person, PersonData};
use crate::utils::errors::{AppResult, DbErrorExt};

pub struct PersonRepository;

impl PersonRepository {
    pub async fn upsert_by_dni(conn: &mut PgConnection, data: &PersonData) -> AppResult<Uuid> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO persons (
                id, dni, first_name, last_name, email, phone, street, city, province, postal_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (dni) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                email = COALESCE(EXCLUDED.email, persons.email),
                phone = COALESCE(EXCLUDED.phone, persons.phone),
                street = COALESCE(EXCLUDED.street, persons.street),
                city = COALESCE(EXCLUDED.city, persons.city),
                province = COALESCE(EXCLUDED.province, persons.province),
                postal_code = COALESCE(EXCLUDED.postal_code, persons.postal_code),
                updated_at = now()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.dni)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.street)
        .bind(&data.city)
        .bind(&data.province)
        .bind(&data.postal_code)
        .fetch_one(conn)
        .await
        .map_db_err("Error guardando persona")?;

        Ok(row.0)
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Person>> {
        sqlx::query_as::<_, Person>("SELECT * FROM persons WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando persona")
    }

    pub async fn find_optional(
        conn: &mut PgConnection,
        id: Option<Uuid>,
    ) -> AppResult<Option<Person>> {
        match id {
            Some(id) => Self::find_by_id(conn, id).await,
            None => Ok(None),
        }
    }
}
