//! Modelo de Vehicle
//!
//! Vehículo identificado por patente normalizada. Mantiene las referencias a titular,
//! conductor y a lo sumo una oblea.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub manufacture_year: Option<i32>,
    pub vehicle_type: Option<String>,
    pub usage_type: Option<String>,
    pub fuel_type: Option<String>,
    pub engine_number: Option<String>,
    pub chassis_number: Option<String>,
    pub owner_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub sticker_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Atributos descriptivos del vehículo, con la patente ya normalizada
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleData {
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub manufacture_year: Option<i32>,
    pub vehicle_type: Option<String>,
    pub usage_type: Option<String>,
    pub fuel_type: Option<String>,
    pub engine_number: Option<String>,
    pub chassis_number: Option<String>,
}
