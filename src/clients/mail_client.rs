//! Cliente del proveedor de email transaccional

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        template_id: &str,
        to: &str,
        vars: &BTreeMap<String, String>,
    ) -> AppResult<()>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    template_id: &'a str,
    to: &'a str,
    variables: &'a BTreeMap<String, String>,
}

pub struct HttpMailer {
    url: String,
    api_key: String,
    client: Client,
}

impl HttpMailer {
    pub fn new(url: &str, api_key: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::Internal(format!("Error creando cliente HTTP: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(
        &self,
        template_id: &str,
        to: &str,
        vars: &BTreeMap<String, String>,
    ) -> AppResult<()> {
        debug!("✉️ Enviando '{}' a {}", template_id, to);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                template_id,
                to,
                variables: vars,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Mailer: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Mailer respondió {}",
                response.status()
            )));
        }
        Ok(())
    }
}
