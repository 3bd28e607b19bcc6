//! Ledger de cupos de inspección
//!
//! Único escritor de `workshops.available_inspections`. Cada operación bloquea la fila
//! del taller dentro de la transacción del llamador.

use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::payment::{LedgerDelta, PaymentOrder, PaymentStatus};
use crate::repositories::{PaymentRepository, WorkshopRepository};
use crate::utils::errors::{AppError, AppResult};

pub struct SlotLedger;

fn check_consume(available: i32) -> AppResult<()> {
    if available <= 0 {
        return Err(AppError::NoQuota);
    }
    Ok(())
}

fn check_debit(available: i32, requested: i32) -> AppResult<()> {
    if available < requested {
        return Err(AppError::LedgerUnderflow {
            available,
            requested,
        });
    }
    Ok(())
}

impl SlotLedger {
    pub async fn credit(conn: &mut PgConnection, workshop_id: Uuid, quantity: i32) -> AppResult<i32> {
        WorkshopRepository::lock_quota(&mut *conn, workshop_id).await?;
        let quota = WorkshopRepository::add_quota(&mut *conn, workshop_id, quantity).await?;
        info!("➕ Taller {}: +{} cupos (total {})", workshop_id, quantity, quota);
        Ok(quota)
    }

    pub async fn debit(conn: &mut PgConnection, workshop_id: Uuid, quantity: i32) -> AppResult<i32> {
        let available = WorkshopRepository::lock_quota(&mut *conn, workshop_id).await?;
        if let Err(e) = check_debit(available, quantity) {
            warn!(
                "⚠️ Taller {}: no se pueden debitar {} cupos (disponibles {})",
                workshop_id, quantity, available
            );
            return Err(e);
        }
        let quota = WorkshopRepository::add_quota(&mut *conn, workshop_id, -quantity).await?;
        info!("➖ Taller {}: -{} cupos (total {})", workshop_id, quantity, quota);
        Ok(quota)
    }

    /// Descuenta un cupo; el llamador ya tiene bloqueado el trámite
    pub async fn consume(conn: &mut PgConnection, workshop_id: Uuid) -> AppResult<i32> {
        let available = WorkshopRepository::lock_quota(&mut *conn, workshop_id).await?;
        check_consume(available)?;
        WorkshopRepository::add_quota(&mut *conn, workshop_id, -1).await
    }

    /// Aplica un cambio de estado a una orden ya bloqueada: orden → taller.
    /// Devuelve la orden actualizada y el cupo resultante del taller.
    pub async fn apply_payment_transition(
        conn: &mut PgConnection,
        order: &PaymentOrder,
        next: PaymentStatus,
    ) -> AppResult<(PaymentOrder, i32)> {
        if order.status == next {
            let quota = WorkshopRepository::current_quota(&mut *conn, order.workshop_id).await?;
            return Ok((order.clone(), quota));
        }

        let quota = match LedgerDelta::for_transition(order.status, next, order.quantity) {
            LedgerDelta::None => {
                WorkshopRepository::current_quota(&mut *conn, order.workshop_id).await?
            }
            LedgerDelta::Credit(quantity) => {
                Self::credit(&mut *conn, order.workshop_id, quantity).await?
            }
            LedgerDelta::Debit(quantity) => {
                Self::debit(&mut *conn, order.workshop_id, quantity).await?
            }
        };

        let updated = PaymentRepository::set_status(&mut *conn, order.id, next).await?;
        info!(
            "💳 Orden {}: {} → {}",
            order.id,
            order.status.label(),
            next.label()
        );
        Ok((updated, quota))
    }
}
