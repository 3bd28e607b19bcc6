//! Repositorio de órdenes de pago

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::payment::{PaymentOrder, PaymentStatus};
use crate::utils::errors::{not_found_error, AppResult, DbErrorExt};

pub struct PaymentRepository;

impl PaymentRepository {
    pub async fn zone_price(conn: &mut PgConnection, zone: &str) -> AppResult<Option<Decimal>> {
        let row: Option<(Decimal,)> =
            sqlx::query_as("SELECT unit_price FROM payment_zone_prices WHERE zone = $1")
                .bind(zone)
                .fetch_optional(conn)
                .await
                .map_db_err("Error leyendo precio de zona")?;
        Ok(row.map(|r| r.0))
    }

    pub async fn insert(
        conn: &mut PgConnection,
        workshop_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        amount: Decimal,
        zone: &str,
    ) -> AppResult<PaymentOrder> {
        sqlx::query_as::<_, PaymentOrder>(
            r#"
            INSERT INTO payment_orders (id, workshop_id, quantity, unit_price, amount, zone, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(workshop_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(amount)
        .bind(zone)
        .fetch_one(conn)
        .await
        .map_db_err("Error creando orden de pago")
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<PaymentOrder>> {
        sqlx::query_as::<_, PaymentOrder>("SELECT * FROM payment_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando orden de pago")
    }

    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> AppResult<PaymentOrder> {
        sqlx::query_as::<_, PaymentOrder>(
            "SELECT * FROM payment_orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_db_err("Error bloqueando orden de pago")?
        .ok_or_else(|| not_found_error("PaymentOrder", &id.to_string()))
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: PaymentStatus,
    ) -> AppResult<PaymentOrder> {
        sqlx::query_as::<_, PaymentOrder>(
            r#"
            UPDATE payment_orders SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(conn)
        .await
        .map_db_err("Error actualizando orden de pago")
    }

    pub async fn set_receipt(
        conn: &mut PgConnection,
        id: Uuid,
        receipt_url: &str,
    ) -> AppResult<()> {
        sqlx::query("UPDATE payment_orders SET receipt_url = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(receipt_url)
            .execute(conn)
            .await
            .map_db_err("Error guardando comprobante")?;
        Ok(())
    }

    pub async fn list(
        conn: &mut PgConnection,
        workshop_id: Option<Uuid>,
        status: Option<PaymentStatus>,
    ) -> AppResult<Vec<PaymentOrder>> {
        sqlx::query_as::<_, PaymentOrder>(
            r#"
            SELECT *
            FROM payment_orders
            WHERE ($1::uuid IS NULL OR workshop_id = $1)
              AND ($2::payment_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(workshop_id)
        .bind(status)
        .fetch_all(conn)
        .await
        .map_db_err("Error listando órdenes de pago")
    }
}
