//! Modelo de Application (trámite)
//!
//! Estados, resultados y las reglas de transición del trámite. Las guardas son funciones
//! puras sobre la fila bloqueada; el servicio las evalúa dentro de la transacción.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::models::inspection::DetailStatus;
use crate::utils::errors::{AppError, AppResult};

/// Estado del trámite - mapea al ENUM application_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Queued,
    InProgress,
    Completed,
}

impl ApplicationStatus {
    /// Etiqueta mostrada a los operadores
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "Pendiente",
            ApplicationStatus::Queued => "En Cola",
            ApplicationStatus::InProgress => "En Curso",
            ApplicationStatus::Completed => "Completado",
        }
    }
}

/// Resultado persistido del trámite - mapea al ENUM application_result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "application_result", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationResult {
    Apt,
    Conditional,
    Rejected,
    ConditionalExpired,
}

impl ApplicationResult {
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationResult::Apt => "Apto",
            ApplicationResult::Conditional => "Condicional",
            ApplicationResult::Rejected => "Rechazado",
            ApplicationResult::ConditionalExpired => "Condicional Expirado",
        }
    }
}

/// Resultado elegible al finalizar una inspección
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InspectionResult {
    Apt,
    Conditional,
    Rejected,
}

impl InspectionResult {
    pub fn label(&self) -> &'static str {
        ApplicationResult::from(*self).label()
    }

    /// Rechazado si algún paso fue rechazado, si no Condicional si alguno fue condicional,
    /// si no Apto. Sin pasos cargados no hay resultado.
    pub fn derive(details: &[DetailStatus]) -> Option<Self> {
        if details.is_empty() {
            return None;
        }
        if details.contains(&DetailStatus::Rejected) {
            Some(InspectionResult::Rejected)
        } else if details.contains(&DetailStatus::Conditional) {
            Some(InspectionResult::Conditional)
        } else {
            Some(InspectionResult::Apt)
        }
    }
}

impl From<InspectionResult> for ApplicationResult {
    fn from(result: InspectionResult) -> Self {
        match result {
            InspectionResult::Apt => ApplicationResult::Apt,
            InspectionResult::Conditional => ApplicationResult::Conditional,
            InspectionResult::Rejected => ApplicationResult::Rejected,
        }
    }
}

/// Application principal - mapea exactamente a la tabla applications
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub user_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub status: ApplicationStatus,
    pub result: Option<ApplicationResult>,
    pub result_2: Option<ApplicationResult>,
    pub consumed: bool,
    pub is_deleted: bool,
    pub is_expired: bool,
    pub certificate_url: Option<String>,
    pub second_certificate_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn ensure_not_deleted(&self) -> AppResult<()> {
        if self.is_deleted {
            return Err(AppError::NotFound(format!("Trámite {} eliminado", self.id)));
        }
        Ok(())
    }

    fn ensure_status(&self, expected: &[ApplicationStatus], action: &str) -> AppResult<()> {
        self.ensure_not_deleted()?;
        if !expected.contains(&self.status) {
            return Err(AppError::Conflict(format!(
                "No se puede {} un trámite en estado '{}'",
                action,
                self.status.label()
            )));
        }
        Ok(())
    }

    /// Titular, conductor y vehículo solo se editan en borrador
    pub fn ensure_editable(&self) -> AppResult<()> {
        self.ensure_status(&[ApplicationStatus::Draft], "editar")
    }

    pub fn ensure_can_enqueue(&self) -> AppResult<()> {
        self.ensure_status(&[ApplicationStatus::Draft], "encolar")?;
        let missing: Vec<&str> = [
            ("titular", self.owner_id.is_none()),
            ("conductor", self.driver_id.is_none()),
            ("vehículo", self.vehicle_id.is_none()),
        ]
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Faltan datos para encolar el trámite: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Estados desde los cuales se puede consumir un cupo
    pub fn ensure_can_consume(&self, allow_in_progress: bool) -> AppResult<()> {
        if allow_in_progress {
            self.ensure_status(
                &[ApplicationStatus::Queued, ApplicationStatus::InProgress],
                "consumir un cupo para",
            )
        } else {
            self.ensure_status(&[ApplicationStatus::Queued], "consumir un cupo para")
        }
    }

    /// Devuelve `true` si la inspección ya estaba iniciada (operación idempotente)
    pub fn ensure_can_start_inspection(&self, require_consumed: bool) -> AppResult<bool> {
        self.ensure_status(
            &[ApplicationStatus::Queued, ApplicationStatus::InProgress],
            "iniciar la inspección de",
        )?;
        if self.status == ApplicationStatus::InProgress {
            return Ok(true);
        }
        if require_consumed && !self.consumed {
            return Err(AppError::Conflict(
                "El trámite no consumió un cupo todavía".to_string(),
            ));
        }
        Ok(false)
    }

    pub fn ensure_can_finalize(&self) -> AppResult<()> {
        self.ensure_status(&[ApplicationStatus::InProgress], "finalizar")?;
        if !self.consumed {
            return Err(AppError::Conflict(
                "El trámite no consumió un cupo todavía".to_string(),
            ));
        }
        Ok(())
    }

    /// Reinspección: solo sobre trámites completados como Condicional y no vencidos
    pub fn ensure_can_reinspect(&self) -> AppResult<()> {
        self.ensure_status(&[ApplicationStatus::Completed], "reinspeccionar")?;
        if self.is_expired || self.result == Some(ApplicationResult::ConditionalExpired) {
            return Err(AppError::Conflict(
                "El plazo de reinspección del trámite está vencido".to_string(),
            ));
        }
        if self.result != Some(ApplicationResult::Conditional) {
            return Err(AppError::Conflict(
                "Solo los trámites con resultado Condicional admiten reinspección".to_string(),
            ));
        }
        if self.result_2.is_some() {
            return Err(AppError::Conflict(
                "El trámite ya tiene resultado de reinspección".to_string(),
            ));
        }
        Ok(())
    }

    /// La inspección principal se carga en curso; la reinspección mientras siga pendiente
    pub fn ensure_inspection_editable(&self, is_second: bool) -> AppResult<()> {
        if is_second {
            self.ensure_can_reinspect()
        } else {
            self.ensure_status(&[ApplicationStatus::InProgress], "cargar la inspección de")
        }
    }

    pub fn ensure_can_delete(&self) -> AppResult<()> {
        self.ensure_status(
            &[
                ApplicationStatus::Draft,
                ApplicationStatus::Queued,
                ApplicationStatus::InProgress,
            ],
            "eliminar",
        )
    }

    /// Resultado vigente: el de la reinspección si existe
    pub fn effective_result(&self) -> Option<ApplicationResult> {
        self.result_2.or(self.result)
    }
}
