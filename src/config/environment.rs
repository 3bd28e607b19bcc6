//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;

use anyhow::{anyhow, Context, Result};

use crate::models::application::InspectionResult;
use crate::utils::time::DisplayZone;

/// Buckets de object storage usados por el sistema
#[derive(Debug, Clone)]
pub struct StorageBuckets {
    pub certificates: String,
    pub documents: String,
    pub receipts: String,
    pub templates: String,
}

/// Plantillas de certificado por resultado
#[derive(Debug, Clone)]
pub struct CertificateTemplates {
    pub apt: String,
    pub conditional: String,
    pub rejected: String,
}

impl CertificateTemplates {
    /// Misma plantilla para todos los resultados
    pub fn single(path: &str) -> Self {
        Self {
            apt: path.to_string(),
            conditional: path.to_string(),
            rejected: path.to_string(),
        }
    }

    pub fn for_result(&self, result: InspectionResult) -> &str {
        match result {
            InspectionResult::Apt => &self.apt,
            InspectionResult::Conditional => &self.conditional,
            InspectionResult::Rejected => &self.rejected,
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub session_secret: String,
    pub session_cookie_name: String,
    pub cron_api_key: String,
    pub cors_origins: Vec<String>,
    pub storage_url: String,
    pub storage_api_key: String,
    pub buckets: StorageBuckets,
    pub pdf_renderer_url: String,
    pub mailer_url: String,
    pub mailer_api_key: String,
    pub admin_notification_email: Option<String>,
    pub qr_base_url: String,
    pub display_zone: DisplayZone,
    pub conditional_grace_days: i64,
    pub allow_consume_in_progress: bool,
    pub certificate_templates: CertificateTemplates,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "si" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(anyhow!("invalid boolean value '{}'", other)),
    }
}

impl EnvironmentConfig {
    /// Cargar configuración desde variables de entorno
    pub fn from_env() -> Result<Self> {
        let port = optional("PORT", "3000")
            .parse()
            .context("PORT must be a valid number")?;

        let offset_minutes: i32 = optional("DISPLAY_UTC_OFFSET_MINUTES", "-180")
            .parse()
            .context("DISPLAY_UTC_OFFSET_MINUTES must be a valid number")?;
        let display_zone = DisplayZone::from_offset_minutes(offset_minutes)
            .ok_or_else(|| anyhow!("DISPLAY_UTC_OFFSET_MINUTES out of range"))?;

        let conditional_grace_days = optional("CONDITIONAL_GRACE_DAYS", "60")
            .parse()
            .context("CONDITIONAL_GRACE_DAYS must be a valid number")?;

        let allow_consume_in_progress = parse_bool(&optional("ALLOW_CONSUME_IN_PROGRESS", "true"))
            .context("ALLOW_CONSUME_IN_PROGRESS")?;

        let default_template = required("CERTIFICATE_TEMPLATE")?;
        let certificate_templates = CertificateTemplates {
            apt: optional("CERTIFICATE_TEMPLATE_APT", &default_template),
            conditional: optional("CERTIFICATE_TEMPLATE_CONDITIONAL", &default_template),
            rejected: optional("CERTIFICATE_TEMPLATE_REJECTED", &default_template),
        };

        Ok(Self {
            environment: optional("ENVIRONMENT", "development"),
            port,
            host: optional("HOST", "0.0.0.0"),
            session_secret: required("SESSION_SECRET")?,
            session_cookie_name: optional("SESSION_COOKIE_NAME", "session"),
            cron_api_key: required("CRON_API_KEY")?,
            cors_origins: optional("CORS_ORIGINS", "")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            storage_url: required("STORAGE_URL")?,
            storage_api_key: required("STORAGE_API_KEY")?,
            buckets: StorageBuckets {
                certificates: optional("CERTIFICATES_BUCKET", "certificados"),
                documents: optional("DOCUMENTS_BUCKET", "documentos"),
                receipts: optional("RECEIPTS_BUCKET", "comprobantes"),
                templates: optional("TEMPLATES_BUCKET", "plantillas"),
            },
            pdf_renderer_url: required("PDF_RENDERER_URL")?,
            mailer_url: required("MAILER_URL")?,
            mailer_api_key: required("MAILER_API_KEY")?,
            admin_notification_email: env::var("ADMIN_NOTIFICATION_EMAIL").ok(),
            qr_base_url: required("QR_BASE_URL")?,
            display_zone,
            conditional_grace_days,
            allow_consume_in_progress,
            certificate_templates,
        })
    }

    /// Configuración mínima para tests
    pub fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            port: 0,
            host: "127.0.0.1".to_string(),
            session_secret: "test-session-secret".to_string(),
            session_cookie_name: "session".to_string(),
            cron_api_key: "test-cron-key".to_string(),
            cors_origins: Vec::new(),
            storage_url: "http://storage.local".to_string(),
            storage_api_key: "storage-key".to_string(),
            buckets: StorageBuckets {
                certificates: "certificados".to_string(),
                documents: "documentos".to_string(),
                receipts: "comprobantes".to_string(),
                templates: "plantillas".to_string(),
            },
            pdf_renderer_url: "http://pdf.local".to_string(),
            mailer_url: "http://mail.local".to_string(),
            mailer_api_key: "mail-key".to_string(),
            admin_notification_email: Some("admin@rto.local".to_string()),
            qr_base_url: "https://rto.local/qr".to_string(),
            display_zone: DisplayZone::default(),
            conditional_grace_days: 60,
            allow_consume_in_progress: true,
            certificate_templates: CertificateTemplates::single("certificado.pdf"),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
