//! Cliente del servicio de PDF
//!
//! Completa los campos de una plantilla PDF y estampa el QR. El servicio recibe la
//! plantilla en base64 junto con el mapa plano de campos.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(
        &self,
        template: &[u8],
        mapping: &BTreeMap<String, String>,
        qr_text: &str,
    ) -> AppResult<Vec<u8>>;
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    template: String,
    fields: &'a BTreeMap<String, String>,
    qr_text: &'a str,
}

pub struct HttpPdfRenderer {
    url: String,
    client: Client,
}

impl HttpPdfRenderer {
    pub fn new(url: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(format!("Error creando cliente HTTP: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(
        &self,
        template: &[u8],
        mapping: &BTreeMap<String, String>,
        qr_text: &str,
    ) -> AppResult<Vec<u8>> {
        use base64::Engine as _;

        info!("🧾 Generando PDF ({} campos)", mapping.len());

        let request = RenderRequest {
            template: base64::engine::general_purpose::STANDARD.encode(template),
            fields: mapping,
            qr_text,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("PDF renderer: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ PDF renderer respondió {}: {}", status, body);
            return Err(AppError::ExternalService(format!(
                "PDF renderer respondió {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::ExternalService(format!("PDF renderer: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
