//! Modelo de Sticker (oblea)
//!
//! Estados de la oblea, órdenes de obleas y la validación de asignación a un vehículo.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use crate::utils::errors::{AppError, AppResult};

/// Estado de la oblea - mapea al ENUM sticker_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "sticker_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StickerStatus {
    Available,
    InUse,
    Unavailable,
}

impl StickerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StickerStatus::Available => "Disponible",
            StickerStatus::InUse => "En Uso",
            StickerStatus::Unavailable => "No Disponible",
        }
    }
}

/// Estado en el que queda una oblea al desvincularla del vehículo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseTarget {
    /// Liberación manual del administrador
    Available,
    /// Baja por vencimiento de un condicional
    Unavailable,
}

impl From<ReleaseTarget> for StickerStatus {
    fn from(target: ReleaseTarget) -> Self {
        match target {
            ReleaseTarget::Available => StickerStatus::Available,
            ReleaseTarget::Unavailable => StickerStatus::Unavailable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sticker {
    pub id: Uuid,
    pub sticker_number: String,
    pub sticker_order_id: Uuid,
    pub status: StickerStatus,
    pub expiration_date: Option<NaiveDate>,
    pub is_expired_application: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sticker {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date.map(|d| d < today).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StickerOrder {
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub amount: i32,
    pub created_at: DateTime<Utc>,
}

/// Oblea bloqueada junto con el taller de su orden y la patente del vehículo que la usa
#[derive(Debug, Clone, FromRow)]
pub struct LockedSticker {
    pub id: Uuid,
    pub sticker_number: String,
    pub status: StickerStatus,
    pub expiration_date: Option<NaiveDate>,
    pub workshop_id: Uuid,
    pub holder_plate: Option<String>,
}

/// Resultado de validar una oblea para un vehículo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentCheck {
    /// La oblea ya pertenece a este vehículo; no hay nada que cambiar
    AlreadyBound,
    /// La oblea puede pasar a En Uso
    Assignable,
}

impl LockedSticker {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date.map(|d| d < today).unwrap_or(false)
    }

    /// Precondiciones de asignación sobre la fila bloqueada
    pub fn check_assignable(
        &self,
        plate: &str,
        workshop_scope: Option<Uuid>,
        today: NaiveDate,
    ) -> AppResult<AssignmentCheck> {
        if let Some(workshop_id) = workshop_scope {
            if self.workshop_id != workshop_id {
                return Err(AppError::Forbidden(format!(
                    "La oblea {} no pertenece al taller",
                    self.sticker_number
                )));
            }
        }

        match self.holder_plate.as_deref() {
            Some(holder) if holder == plate => return Ok(AssignmentCheck::AlreadyBound),
            Some(_) => {
                return Err(AppError::StickerAlreadyAssigned(self.sticker_number.clone()));
            }
            None => {}
        }

        if self.is_expired(today) {
            return Err(AppError::StickerExpired(self.sticker_number.clone()));
        }

        if self.status != StickerStatus::Available {
            return Err(AppError::Conflict(format!(
                "La oblea {} está en estado '{}'",
                self.sticker_number,
                self.status.label()
            )));
        }

        Ok(AssignmentCheck::Assignable)
    }
}

/// Rango numérico de obleas con prefijo y relleno de ceros
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct StickerRange {
    #[serde(default)]
    #[validate(length(max = 16))]
    pub prefix: String,
    pub from: u64,
    pub to: u64,
    #[serde(default)]
    #[validate(range(max = 32))]
    pub pad_width: usize,
}

/// Máximo de obleas por orden
pub const MAX_STICKERS_PER_ORDER: usize = 50_000;

/// Ancho máximo del relleno con ceros de un rango
pub const MAX_PAD_WIDTH: usize = 32;

/// Expande números explícitos y un rango opcional, sin repetidos y conservando el orden
pub fn expand_sticker_numbers(
    numbers: &[String],
    range: Option<&StickerRange>,
) -> AppResult<Vec<String>> {
    let mut expanded: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let mut push = |value: String| {
        if !value.is_empty() && seen.insert(value.clone()) {
            expanded.push(value);
        }
    };

    for number in numbers {
        push(number.trim().to_uppercase());
    }

    if let Some(range) = range {
        if range.from > range.to {
            return Err(AppError::BadRequest(
                "El rango de obleas es inválido: 'from' mayor que 'to'".to_string(),
            ));
        }
        if range.pad_width > MAX_PAD_WIDTH {
            return Err(AppError::BadRequest(format!(
                "El relleno de ceros admite como máximo {} dígitos",
                MAX_PAD_WIDTH
            )));
        }
        // to - from no desborda porque from <= to
        if range.to - range.from >= MAX_STICKERS_PER_ORDER as u64 {
            return Err(AppError::BadRequest(format!(
                "Una orden admite como máximo {} obleas",
                MAX_STICKERS_PER_ORDER
            )));
        }
        let prefix = range.prefix.trim().to_uppercase();
        for n in range.from..=range.to {
            push(format!("{}{:0width$}", prefix, n, width = range.pad_width));
        }
    }

    if expanded.is_empty() {
        return Err(AppError::BadRequest(
            "La orden no contiene números de oblea".to_string(),
        ));
    }
    if expanded.len() > MAX_STICKERS_PER_ORDER {
        return Err(AppError::BadRequest(format!(
            "Una orden admite como máximo {} obleas",
            MAX_STICKERS_PER_ORDER
        )));
    }
    Ok(expanded)
}
