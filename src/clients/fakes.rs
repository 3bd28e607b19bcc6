//! Implementaciones en memoria de los colaboradores, para tests

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Mailer, ObjectStorage, PdfRenderer};
use crate::utils::errors::{AppError, AppResult};

#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub puts: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn with_object(bucket: &str, path: &str, bytes: &[u8]) -> Self {
        let storage = Self::default();
        storage
            .objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), path.to_string()), bytes.to_vec());
        storage
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> AppResult<String> {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), path.to_string()), bytes);
        self.puts.lock().unwrap().push(format!("{}/{}", bucket, path));
        Ok(format!("memory://{}/{}", bucket, path))
    }

    async fn delete(&self, bucket: &str, path: &str) -> AppResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), path.to_string()));
        Ok(())
    }

    async fn download(&self, bucket: &str, path: &str) -> AppResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", bucket, path)))
    }
}

/// Devuelve la plantilla seguida del texto del QR
#[derive(Default)]
pub struct EchoRenderer {
    pub calls: Mutex<Vec<(BTreeMap<String, String>, String)>>,
}

#[async_trait]
impl PdfRenderer for EchoRenderer {
    async fn render(
        &self,
        template: &[u8],
        mapping: &BTreeMap<String, String>,
        qr_text: &str,
    ) -> AppResult<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .push((mapping.clone(), qr_text.to_string()));
        let mut bytes = template.to_vec();
        bytes.extend_from_slice(qr_text.as_bytes());
        Ok(bytes)
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        template_id: &str,
        to: &str,
        _vars: &BTreeMap<String, String>,
    ) -> AppResult<()> {
        if self.fail {
            return Err(AppError::ExternalService("mailer caído".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((template_id.to_string(), to.to_string()));
        Ok(())
    }
}
