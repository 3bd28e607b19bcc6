//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y normalización de claves naturales (patentes, DNI).

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

use crate::utils::errors::AppError;

/// Múltiplo exigido para la cantidad de cupos en una orden de pago
pub const PAYMENT_QUANTITY_STEP: i32 = 250;

/// Largo máximo de un número de oblea
pub const MAX_STICKER_NUMBER_LEN: usize = 64;

lazy_static! {
    // AAA123 (autos, formato anterior), AA123BB (Mercosur), 123ABC / A123BCD (motos)
    static ref PLATE_RE: Regex =
        Regex::new(r"^([A-Z]{3}[0-9]{3}|[A-Z]{2}[0-9]{3}[A-Z]{2}|[0-9]{3}[A-Z]{3}|[A-Z][0-9]{3}[A-Z]{3})$")
            .expect("plate regex");
    // DNI de 7/8 dígitos o CUIT/CUIL de 11
    static ref DNI_RE: Regex = Regex::new(r"^([0-9]{7,8}|[0-9]{11})$").expect("dni regex");
}

/// Normaliza una patente: trim, mayúsculas, sin guiones ni espacios
pub fn normalize_plate(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Normaliza y valida una patente
pub fn parse_plate(value: &str) -> Result<String, AppError> {
    let plate = normalize_plate(value);
    if !PLATE_RE.is_match(&plate) {
        return Err(AppError::BadRequest(format!("Patente inválida: '{}'", value)));
    }
    Ok(plate)
}

/// Normaliza un DNI eliminando puntos, guiones y espacios
pub fn normalize_dni(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '.' | '-') && !c.is_whitespace())
        .collect()
}

/// Validador para `#[validate(custom = "...")]` sobre DNI
pub fn validate_dni(value: &str) -> Result<(), ValidationError> {
    if !DNI_RE.is_match(&normalize_dni(value)) {
        let mut error = ValidationError::new("dni");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validador para `#[validate(custom = "...")]` sobre patentes
pub fn validate_plate(value: &str) -> Result<(), ValidationError> {
    if !PLATE_RE.is_match(&normalize_plate(value)) {
        let mut error = ValidationError::new("license_plate");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Números de oblea explícitos: sin vacíos y de largo acotado
pub fn validate_sticker_numbers(numbers: &[String]) -> Result<(), ValidationError> {
    if let Some(bad) = numbers
        .iter()
        .find(|n| n.trim().is_empty() || n.trim().len() > MAX_STICKER_NUMBER_LEN)
    {
        let mut error = ValidationError::new("sticker_number");
        error.add_param("value".into(), bad);
        return Err(error);
    }
    Ok(())
}

/// Cantidad de cupos: al menos 250 y múltiplo de 250
pub fn validate_payment_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < PAYMENT_QUANTITY_STEP || quantity % PAYMENT_QUANTITY_STEP != 0 {
        return Err(AppError::BadRequest(format!(
            "La cantidad debe ser mayor o igual a {} y múltiplo de {}",
            PAYMENT_QUANTITY_STEP, PAYMENT_QUANTITY_STEP
        )));
    }
    Ok(())
}

/// Sanitiza un nombre de archivo para usarlo dentro de un path de storage
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "archivo".to_string()
    } else {
        cleaned
    }
}
