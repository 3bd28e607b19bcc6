//! Emisión de certificados
//!
//! Arma el mapa de campos del PDF, lo genera con la plantilla del resultado, lo sube a
//! una ruta determinística y registra el resultado en el trámite con una sola escritura.
//! Si la subida funcionó pero la escritura falla, devuelve `PartialSuccess` con la URL.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::clients::{ObjectStorage, PdfRenderer};
use crate::config::EnvironmentConfig;
use crate::models::application::{Application, InspectionResult};
use crate::models::person::Person;
use crate::models::sticker::Sticker;
use crate::models::vehicle::Vehicle;
use crate::models::workshop::Workshop;
use crate::repositories::ApplicationRepository;
use crate::utils::errors::{AppError, AppResult};

/// Certificado de la inspección principal o de la reinspección
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    Primary,
    Second,
}

impl CertificateKind {
    pub fn storage_path(&self, application_id: Uuid) -> String {
        match self {
            CertificateKind::Primary => format!("certificates/{}/certificado.pdf", application_id),
            CertificateKind::Second => {
                format!("certificates/{}/certificado-segunda.pdf", application_id)
            }
        }
    }
}

/// Todo lo que se imprime en el certificado
#[derive(Debug, Clone)]
pub struct CertificateData {
    pub application: Application,
    pub workshop: Workshop,
    pub owner: Option<Person>,
    pub driver: Option<Person>,
    pub vehicle: Option<Vehicle>,
    pub sticker: Option<Sticker>,
    pub global_observations: Option<String>,
}

/// Escritura final del resultado en el trámite.
/// `Ok(false)` indica que el trámite ya no admite ese resultado.
#[async_trait]
pub trait CertificateRecorder: Send + Sync {
    async fn record(
        &self,
        application_id: Uuid,
        kind: CertificateKind,
        result: InspectionResult,
        certificate_url: &str,
    ) -> AppResult<bool>;
}

pub struct PgCertificateRecorder {
    pool: PgPool,
}

impl PgCertificateRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CertificateRecorder for PgCertificateRecorder {
    async fn record(
        &self,
        application_id: Uuid,
        kind: CertificateKind,
        result: InspectionResult,
        certificate_url: &str,
    ) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await?;
        match kind {
            CertificateKind::Primary => {
                ApplicationRepository::mark_completed(
                    &mut *conn,
                    application_id,
                    result.into(),
                    certificate_url,
                )
                .await
            }
            CertificateKind::Second => {
                ApplicationRepository::mark_second_result(
                    &mut *conn,
                    application_id,
                    result.into(),
                    certificate_url,
                )
                .await
            }
        }
    }
}

pub struct CertificateIssuer {
    storage: Arc<dyn ObjectStorage>,
    renderer: Arc<dyn PdfRenderer>,
    config: EnvironmentConfig,
}

impl CertificateIssuer {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        renderer: Arc<dyn PdfRenderer>,
        config: EnvironmentConfig,
    ) -> Self {
        Self {
            storage,
            renderer,
            config,
        }
    }

    /// Texto del QR: URL pública de verificación con el número de oblea.
    /// Apto y Condicional exigen oblea; Rechazado no lleva QR.
    pub fn qr_text(&self, data: &CertificateData, result: InspectionResult) -> AppResult<String> {
        match (result, data.sticker.as_ref()) {
            (InspectionResult::Rejected, _) => Ok(String::new()),
            (_, Some(sticker)) => Ok(format!(
                "{}/{}",
                self.config.qr_base_url.trim_end_matches('/'),
                urlencoding::encode(&sticker.sticker_number)
            )),
            (_, None) => Err(AppError::BadRequest(
                "El vehículo no tiene oblea asignada".to_string(),
            )),
        }
    }

    /// Campos planos del PDF
    pub fn field_mapping(
        &self,
        data: &CertificateData,
        result: InspectionResult,
        issued_at: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        let zone = &self.config.display_zone;
        let mut fields = BTreeMap::new();
        let mut put = |key: &str, value: Option<String>| {
            fields.insert(key.to_string(), value.unwrap_or_default());
        };

        put("tramite", Some(data.application.id.to_string()));
        put("resultado", Some(result.label().to_uppercase()));
        put("fecha_emision", Some(zone.format(issued_at)));
        put("fecha_tramite", Some(zone.format(data.application.created_at)));
        if result == InspectionResult::Conditional {
            let deadline = issued_at + Duration::days(self.config.conditional_grace_days);
            put("reinspeccion_hasta", Some(zone.today(deadline).format("%d/%m/%Y").to_string()));
        }

        put("taller", Some(data.workshop.name.clone()));
        put("taller_razon_social", data.workshop.razon_social.clone());
        put("taller_cuit", data.workshop.cuit.clone());
        put("taller_planta", data.workshop.plant_number.map(|n| n.to_string()));
        put("taller_direccion", data.workshop.address.clone());
        put("taller_localidad", data.workshop.city.clone());
        put("taller_provincia", data.workshop.province.clone());

        for (prefix, person) in [("titular", &data.owner), ("conductor", &data.driver)] {
            put(&format!("{}_nombre", prefix), person.as_ref().map(Person::full_name));
            put(&format!("{}_dni", prefix), person.as_ref().map(|p| p.dni.clone()));
            put(
                &format!("{}_domicilio", prefix),
                person.as_ref().and_then(|p| p.street.clone()),
            );
            put(
                &format!("{}_localidad", prefix),
                person.as_ref().and_then(|p| p.city.clone()),
            );
        }

        let vehicle = data.vehicle.as_ref();
        put("dominio", vehicle.map(|v| v.license_plate.clone()));
        put("marca", vehicle.and_then(|v| v.brand.clone()));
        put("modelo", vehicle.and_then(|v| v.model.clone()));
        put("anio", vehicle.and_then(|v| v.manufacture_year).map(|y| y.to_string()));
        put("tipo", vehicle.and_then(|v| v.vehicle_type.clone()));
        put("uso", vehicle.and_then(|v| v.usage_type.clone()));
        put("combustible", vehicle.and_then(|v| v.fuel_type.clone()));
        put("motor", vehicle.and_then(|v| v.engine_number.clone()));
        put("chasis", vehicle.and_then(|v| v.chassis_number.clone()));

        put("oblea", data.sticker.as_ref().map(|s| s.sticker_number.clone()));
        put("observaciones", data.global_observations.clone());

        fields
    }

    /// Genera, sube y registra el certificado. Devuelve la URL pública.
    pub async fn issue(
        &self,
        data: &CertificateData,
        result: InspectionResult,
        kind: CertificateKind,
        recorder: &dyn CertificateRecorder,
    ) -> AppResult<String> {
        let application_id = data.application.id;
        let qr_text = self.qr_text(data, result)?;
        let mapping = self.field_mapping(data, result, Utc::now());

        let template = self
            .storage
            .download(
                &self.config.buckets.templates,
                self.config.certificate_templates.for_result(result),
            )
            .await?;
        let pdf = self.renderer.render(&template, &mapping, &qr_text).await?;

        let public_url = self
            .storage
            .put(
                &self.config.buckets.certificates,
                &kind.storage_path(application_id),
                pdf,
                "application/pdf",
            )
            .await?;

        match recorder.record(application_id, kind, result, &public_url).await {
            Ok(true) => {
                info!(
                    "📄 Certificado {:?} del trámite {} emitido: {}",
                    kind,
                    application_id,
                    result.label()
                );
                Ok(public_url)
            }
            Ok(false) => Err(AppError::Conflict(format!(
                "El trámite {} cambió de estado durante la emisión del certificado",
                application_id
            ))),
            Err(e) => {
                error!(
                    "❌ Certificado del trámite {} subido pero no registrado: {}",
                    application_id, e
                );
                Err(AppError::PartialSuccess {
                    application_id,
                    public_url,
                })
            }
        }
    }
}
