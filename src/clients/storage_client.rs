//! Cliente de object storage
//!
//! API estilo Supabase Storage: `POST /object/{bucket}/{path}` con `x-upsert: true`,
//! URL pública en `/object/public/{bucket}/{path}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Sube (o reemplaza) el objeto y devuelve su URL pública
    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<String>;

    async fn delete(&self, bucket: &str, path: &str) -> AppResult<()>;

    async fn download(&self, bucket: &str, path: &str) -> AppResult<Vec<u8>>;
}

pub struct HttpObjectStorage {
    base_url: String,
    api_key: String,
    client: Client,
}

impl HttpObjectStorage {
    pub fn new(base_url: &str, api_key: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Error creando cliente HTTP: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, bucket, encode_path(path))
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, bucket, encode_path(path))
    }
}

/// Codifica cada segmento del path conservando las barras
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn storage_error(action: &str, err: impl std::fmt::Display) -> AppError {
    error!("❌ Storage {}: {}", action, err);
    AppError::ExternalService(format!("Object storage ({}): {}", action, err))
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<String> {
        debug!("📤 Subiendo {}/{} ({} bytes)", bucket, path, bytes.len());

        let response = self
            .client
            .post(self.object_url(bucket, path))
            .bearer_auth(&self.api_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| storage_error("put", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error("put", format!("{} {}", status, body)));
        }

        Ok(self.public_url(bucket, path))
    }

    async fn delete(&self, bucket: &str, path: &str) -> AppResult<()> {
        let response = self
            .client
            .delete(self.object_url(bucket, path))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| storage_error("delete", e))?;

        let status = response.status();
        // borrar algo que ya no existe no es un error
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(storage_error("delete", status));
        }
        Ok(())
    }

    async fn download(&self, bucket: &str, path: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get(self.object_url(bucket, path))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| storage_error("download", e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Objeto {}/{} inexistente", bucket, path)));
        }
        if !status.is_success() {
            return Err(storage_error("download", status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| storage_error("download", e))?;
        Ok(bytes.to_vec())
    }
}
