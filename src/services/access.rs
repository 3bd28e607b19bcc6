//! Verificaciones de acceso por taller

use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::user::RequestContext;
use crate::repositories::WorkshopRepository;
use crate::utils::errors::{forbidden_error, AppResult};

/// Administradores operan sobre cualquier taller; el resto solo sobre los suyos
pub async fn ensure_workshop_access(
    conn: &mut PgConnection,
    ctx: &RequestContext,
    workshop_id: Uuid,
) -> AppResult<()> {
    if ctx.is_admin {
        return Ok(());
    }
    if WorkshopRepository::is_member(conn, workshop_id, ctx.user_id).await? {
        return Ok(());
    }
    Err(forbidden_error(
        "operar sobre el taller",
        "el usuario no pertenece al taller",
    ))
}

pub fn ensure_admin(ctx: &RequestContext) -> AppResult<()> {
    if ctx.is_admin {
        Ok(())
    } else {
        Err(forbidden_error(
            "realizar la operación",
            "requiere permisos de administrador",
        ))
    }
}
