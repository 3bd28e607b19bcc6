//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación
//! y manejo de fechas.

pub mod errors;
pub mod time;
pub mod validation;

pub use errors::{AppError, AppResult};
