//! Repositorio de obleas y órdenes de obleas

use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::sticker::{LockedSticker, Sticker, StickerOrder, StickerStatus};
use crate::utils::errors::{AppResult, DbErrorExt};

pub struct StickerRepository;

impl StickerRepository {
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Sticker>> {
        sqlx::query_as::<_, Sticker>("SELECT * FROM stickers WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando oblea")
    }

    pub async fn find_by_number(
        conn: &mut PgConnection,
        sticker_number: &str,
    ) -> AppResult<Option<Sticker>> {
        sqlx::query_as::<_, Sticker>("SELECT * FROM stickers WHERE sticker_number = $1")
            .bind(sticker_number)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando oblea por número")
    }

    /// Bloquea la oblea (`SELECT … FOR UPDATE`) junto con su taller y la patente que la usa
    pub async fn lock_for_assignment(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> AppResult<Option<LockedSticker>> {
        sqlx::query_as::<_, LockedSticker>(
            r#"
            SELECT s.id, s.sticker_number, s.status, s.expiration_date,
                   so.workshop_id, v.license_plate AS holder_plate
            FROM stickers s
            JOIN sticker_orders so ON so.id = s.sticker_order_id
            LEFT JOIN vehicles v ON v.sticker_id = s.id
            WHERE s.id = $1
            FOR UPDATE OF s
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_db_err("Error bloqueando oblea")
    }

    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Sticker>> {
        sqlx::query_as::<_, Sticker>("SELECT * FROM stickers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error bloqueando oblea")
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: StickerStatus,
    ) -> AppResult<()> {
        sqlx::query("UPDATE stickers SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(conn)
            .await
            .map_db_err("Error actualizando estado de oblea")?;

        Ok(())
    }

    /// Baja de la oblea por vencimiento del trámite condicional
    pub async fn mark_expired_application(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE stickers
            SET status = 'unavailable', is_expired_application = TRUE, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(conn)
        .await
        .map_db_err("Error dando de baja oblea")?;

        Ok(())
    }

    /// Obleas disponibles con fecha de vencimiento pasada pasan a No Disponible
    pub async fn retire_expired_available(
        conn: &mut PgConnection,
        today: NaiveDate,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE stickers
            SET status = 'unavailable', updated_at = now()
            WHERE status = 'available' AND expiration_date IS NOT NULL AND expiration_date < $1
            "#,
        )
        .bind(today)
        .execute(conn)
        .await
        .map_db_err("Error retirando obleas vencidas")?;

        Ok(result.rows_affected())
    }

    pub async fn create_order(conn: &mut PgConnection, workshop_id: Uuid) -> AppResult<StickerOrder> {
        sqlx::query_as::<_, StickerOrder>(
            r#"
            INSERT INTO sticker_orders (id, workshop_id, amount)
            VALUES ($1, $2, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workshop_id)
        .fetch_one(conn)
        .await
        .map_db_err("Error creando orden de obleas")
    }

    pub async fn set_order_amount(
        conn: &mut PgConnection,
        order_id: Uuid,
        amount: i32,
    ) -> AppResult<StickerOrder> {
        sqlx::query_as::<_, StickerOrder>(
            "UPDATE sticker_orders SET amount = $2 WHERE id = $1 RETURNING *",
        )
        .bind(order_id)
        .bind(amount)
        .fetch_one(conn)
        .await
        .map_db_err("Error actualizando orden de obleas")
    }

    /// Inserta los números que no existen; devuelve los efectivamente insertados
    pub async fn insert_batch(
        conn: &mut PgConnection,
        order_id: Uuid,
        numbers: &[String],
        expiration_date: Option<NaiveDate>,
    ) -> AppResult<Vec<String>> {
        let ids: Vec<Uuid> = numbers.iter().map(|_| Uuid::new_v4()).collect();

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO stickers (id, sticker_number, sticker_order_id, status, expiration_date)
            SELECT t.id, t.number, $3, 'available', $4
            FROM UNNEST($1::uuid[], $2::text[]) AS t(id, number)
            ON CONFLICT (sticker_number) DO NOTHING
            RETURNING sticker_number
            "#,
        )
        .bind(&ids)
        .bind(numbers)
        .bind(order_id)
        .bind(expiration_date)
        .fetch_all(conn)
        .await
        .map_db_err("Error insertando obleas")?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub async fn list_by_workshop(
        conn: &mut PgConnection,
        workshop_id: Uuid,
        status: Option<StickerStatus>,
    ) -> AppResult<Vec<Sticker>> {
        sqlx::query_as::<_, Sticker>(
            r#"
            SELECT s.*
            FROM stickers s
            JOIN sticker_orders so ON so.id = s.sticker_order_id
            WHERE so.workshop_id = $1
              AND ($2::sticker_status IS NULL OR s.status = $2)
            ORDER BY s.sticker_number
            "#,
        )
        .bind(workshop_id)
        .bind(status)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando obleas")
    }

    /// Taller dueño de la orden de la oblea
    pub async fn workshop_of(conn: &mut PgConnection, sticker_id: Uuid) -> AppResult<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT so.workshop_id
            FROM stickers s JOIN sticker_orders so ON so.id = s.sticker_order_id
            WHERE s.id = $1
            "#,
        )
        .bind(sticker_id)
        .fetch_optional(conn)
        .await
        .map_db_err("Error buscando taller de la oblea")?;

        Ok(row.map(|r| r.0))
    }
}
