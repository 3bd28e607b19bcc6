//! Órdenes de pago de cupos
//!
//! El taller crea la orden y sube el comprobante; el administrador la aprueba o rechaza.
//! Los movimientos de cupo pasan por el ledger con la orden bloqueada antes que el taller.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::ObjectStorage;
use crate::config::EnvironmentConfig;
use crate::models::payment::{order_amount, PaymentOrder, PaymentStatus};
use crate::models::user::RequestContext;
use crate::repositories::{PaymentRepository, WorkshopRepository};
use crate::services::access::{ensure_admin, ensure_workshop_access};
use crate::services::notifications::{
    EmailJob, Notifier, TEMPLATE_PAYMENT_APPROVED, TEMPLATE_PAYMENT_REJECTED,
    TEMPLATE_RECEIPT_UPLOADED,
};
use crate::services::slot_ledger::SlotLedger;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::validation::{sanitize_file_name, validate_payment_quantity};

#[derive(Debug, Clone, serde::Serialize)]
pub struct PaymentTransition {
    pub order: PaymentOrder,
    pub previous_status: PaymentStatus,
    pub available_inspections: i32,
}

pub struct PaymentService {
    pool: PgPool,
    config: EnvironmentConfig,
    storage: Arc<dyn ObjectStorage>,
    notifier: Notifier,
}

impl PaymentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            config: state.config.clone(),
            storage: state.storage.clone(),
            notifier: state.notifier.clone(),
        }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        workshop_id: Uuid,
        quantity: i32,
        zone: &str,
    ) -> AppResult<PaymentOrder> {
        validate_payment_quantity(quantity)?;
        let zone = zone.trim();

        let mut tx = self.pool.begin().await?;
        ensure_workshop_access(&mut *tx, ctx, workshop_id).await?;
        let unit_price = PaymentRepository::zone_price(&mut *tx, zone)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Zona '{}' sin precio vigente", zone)))?;

        let order = PaymentRepository::insert(
            &mut *tx,
            workshop_id,
            quantity,
            unit_price,
            order_amount(quantity, unit_price),
            zone,
        )
        .await?;
        tx.commit().await?;

        info!(
            "💳 Orden {} creada: {} cupos para taller {} (${})",
            order.id, quantity, workshop_id, order.amount
        );
        Ok(order)
    }

    /// Sube el comprobante y pasa la orden a En Revisión
    pub async fn upload_receipt(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<PaymentOrder> {
        if bytes.is_empty() {
            return Err(AppError::BadRequest("El comprobante está vacío".to_string()));
        }

        let order = {
            let mut conn = self.pool.acquire().await?;
            let order = PaymentRepository::find_by_id(&mut *conn, order_id)
                .await?
                .ok_or_else(|| not_found_error("PaymentOrder", &order_id.to_string()))?;
            ensure_workshop_access(&mut *conn, ctx, order.workshop_id).await?;
            ensure_accepts_receipt(&order)?;
            order
        };

        let path = format!(
            "{}/{}/{}",
            order.workshop_id,
            order.id,
            sanitize_file_name(file_name)
        );
        let url = self
            .storage
            .put(&self.config.buckets.receipts, &path, bytes, content_type)
            .await?;

        let mut tx = self.pool.begin().await?;
        let locked = PaymentRepository::lock(&mut *tx, order_id).await?;
        ensure_accepts_receipt(&locked)?;
        PaymentRepository::set_receipt(&mut *tx, order_id, &url).await?;
        let (order, _) =
            SlotLedger::apply_payment_transition(&mut *tx, &locked, PaymentStatus::InReview).await?;
        tx.commit().await?;

        if let Some(admin) = self.config.admin_notification_email.as_deref() {
            self.notifier.enqueue(
                EmailJob::new(TEMPLATE_RECEIPT_UPLOADED, admin)
                    .var("orden", order.id.to_string())
                    .var("cantidad", order.quantity.to_string())
                    .var("importe", order.amount.to_string())
                    .var("comprobante_url", url),
            );
        }
        Ok(order)
    }

    pub async fn list_for_workshop(
        &self,
        ctx: &RequestContext,
        workshop_id: Uuid,
        status: Option<PaymentStatus>,
    ) -> AppResult<Vec<PaymentOrder>> {
        let mut conn = self.pool.acquire().await?;
        ensure_workshop_access(&mut *conn, ctx, workshop_id).await?;
        PaymentRepository::list(&mut *conn, Some(workshop_id), status).await
    }

    pub async fn admin_list(
        &self,
        ctx: &RequestContext,
        workshop_id: Option<Uuid>,
        status: Option<PaymentStatus>,
    ) -> AppResult<Vec<PaymentOrder>> {
        ensure_admin(ctx)?;
        let mut conn = self.pool.acquire().await?;
        PaymentRepository::list(&mut *conn, workshop_id, status).await
    }

    /// Cambio de estado por el administrador; el ledger acredita o debita según el caso
    pub async fn admin_transition(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        next: PaymentStatus,
    ) -> AppResult<PaymentTransition> {
        ensure_admin(ctx)?;

        let mut tx = self.pool.begin().await?;
        let order = PaymentRepository::lock(&mut *tx, order_id).await?;
        let previous_status = order.status;
        let (order, quota) = SlotLedger::apply_payment_transition(&mut *tx, &order, next).await?;
        tx.commit().await?;

        if previous_status != next {
            self.notify_workshop(&order).await;
        }

        Ok(PaymentTransition {
            order,
            previous_status,
            available_inspections: quota,
        })
    }

    async fn notify_workshop(&self, order: &PaymentOrder) {
        let template = match order.status {
            PaymentStatus::Approved => TEMPLATE_PAYMENT_APPROVED,
            PaymentStatus::Rejected => TEMPLATE_PAYMENT_REJECTED,
            _ => return,
        };

        let emails = match self.pool.acquire().await {
            Ok(mut conn) => WorkshopRepository::contact_emails(&mut *conn, order.workshop_id).await,
            Err(e) => Err(e.into()),
        };
        match emails {
            Ok(emails) => {
                for email in emails {
                    self.notifier.enqueue(
                        EmailJob::new(template, &email)
                            .var("orden", order.id.to_string())
                            .var("cantidad", order.quantity.to_string())
                            .var("estado", order.status.label()),
                    );
                }
            }
            Err(e) => warn!(
                "⚠️ No se pudieron leer los emails del taller {}: {}",
                order.workshop_id, e
            ),
        }
    }
}

fn ensure_accepts_receipt(order: &PaymentOrder) -> AppResult<()> {
    if order.status.accepts_receipt() {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "La orden está en estado '{}' y no admite comprobantes",
            order.status.label()
        )))
    }
}
