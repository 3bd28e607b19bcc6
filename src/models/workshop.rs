//! Modelo de Workshop (taller)
//!
//! Mapea exactamente a la tabla workshops. El cupo `available_inspections` solo lo
//! modifica el ledger de cupos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workshop {
    pub id: Uuid,
    pub name: String,
    pub razon_social: Option<String>,
    pub cuit: Option<String>,
    pub plant_number: Option<i32>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_approved: bool,
    pub is_suspended: bool,
    pub available_inspections: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workshop {
    /// Un taller opera solo si fue aprobado y no está suspendido
    pub fn ensure_operational(&self) -> AppResult<()> {
        if !self.is_approved {
            return Err(AppError::Conflict(format!(
                "El taller '{}' todavía no fue aprobado",
                self.name
            )));
        }
        if self.is_suspended {
            return Err(AppError::Conflict(format!(
                "El taller '{}' está suspendido",
                self.name
            )));
        }
        Ok(())
    }
}

/// Identidad pública del taller (verificación por QR)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkshopIdentity {
    pub id: Uuid,
    pub name: String,
    pub plant_number: Option<i32>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}
