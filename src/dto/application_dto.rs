use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::application::{
    Application, ApplicationResult, ApplicationStatus, InspectionResult,
};
use crate::models::person::PersonData;
use crate::models::vehicle::VehicleData;
use crate::services::application_service::DriverInput;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::time::DisplayZone;
use crate::utils::validation::{normalize_dni, normalize_plate, validate_dni, validate_plate};

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Request para crear un trámite
#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub workshop_id: Uuid,
}

// Titular o conductor
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PersonRequest {
    #[validate(custom = "validate_dni")]
    pub dni: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
}

impl PersonRequest {
    pub fn into_data(self) -> PersonData {
        PersonData {
            dni: normalize_dni(&self.dni),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: clean(self.email).map(|e| e.to_lowercase()),
            phone: clean(self.phone),
            street: clean(self.street),
            city: clean(self.city),
            province: clean(self.province),
            postal_code: clean(self.postal_code),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DriverRequest {
    #[serde(default)]
    pub is_same_person: bool,
    #[validate]
    pub person: Option<PersonRequest>,
}

impl DriverRequest {
    pub fn into_input(self) -> AppResult<DriverInput> {
        match (self.is_same_person, self.person) {
            (true, _) => Ok(DriverInput::SameAsOwner),
            (false, Some(person)) => Ok(DriverInput::Person(person.into_data())),
            (false, None) => Err(AppError::BadRequest(
                "Indique los datos del conductor o is_same_person".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct VehicleRequest {
    #[validate(custom = "validate_plate")]
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    #[validate(range(min = 1900, max = 2100))]
    pub manufacture_year: Option<i32>,
    pub vehicle_type: Option<String>,
    pub usage_type: Option<String>,
    pub fuel_type: Option<String>,
    pub engine_number: Option<String>,
    pub chassis_number: Option<String>,
    pub sticker_id: Option<Uuid>,
}

impl VehicleRequest {
    pub fn into_data(self) -> (VehicleData, Option<Uuid>) {
        let data = VehicleData {
            license_plate: normalize_plate(&self.license_plate),
            brand: clean(self.brand),
            model: clean(self.model),
            manufacture_year: self.manufacture_year,
            vehicle_type: clean(self.vehicle_type),
            usage_type: clean(self.usage_type),
            fuel_type: clean(self.fuel_type),
            engine_number: clean(self.engine_number).map(|v| v.to_uppercase()),
            chassis_number: clean(self.chassis_number).map(|v| v.to_uppercase()),
        };
        (data, self.sticker_id)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FinalizeRequest {
    pub result: Option<InspectionResult>,
}

#[derive(Debug, Deserialize)]
pub struct ListApplicationsQuery {
    pub workshop_id: Uuid,
    pub status: Option<ApplicationStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

// Response de trámite con etiquetas para el operador
#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub user_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub result: Option<ApplicationResult>,
    pub result_label: Option<&'static str>,
    pub result_2: Option<ApplicationResult>,
    pub result_2_label: Option<&'static str>,
    pub consumed: bool,
    pub is_expired: bool,
    pub certificate_url: Option<String>,
    pub second_certificate_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_at_local: String,
}

impl ApplicationResponse {
    pub fn from_model(application: Application, zone: &DisplayZone) -> Self {
        Self {
            id: application.id,
            workshop_id: application.workshop_id,
            user_id: application.user_id,
            owner_id: application.owner_id,
            driver_id: application.driver_id,
            vehicle_id: application.vehicle_id,
            status: application.status,
            status_label: application.status.label(),
            result: application.result,
            result_label: application.result.map(|r| r.label()),
            result_2: application.result_2,
            result_2_label: application.result_2.map(|r| r.label()),
            consumed: application.consumed,
            is_expired: application.is_expired,
            certificate_url: application.certificate_url,
            second_certificate_url: application.second_certificate_url,
            created_at: application.created_at,
            created_at_local: zone.format(application.created_at),
        }
    }
}
