//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use sqlx::PgPool;

use crate::clients::{ObjectStorage, PdfRenderer};
use crate::config::environment::EnvironmentConfig;
use crate::services::notifications::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub storage: Arc<dyn ObjectStorage>,
    pub renderer: Arc<dyn PdfRenderer>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: EnvironmentConfig,
        storage: Arc<dyn ObjectStorage>,
        renderer: Arc<dyn PdfRenderer>,
        notifier: Notifier,
    ) -> Self {
        Self {
            pool,
            config,
            storage,
            renderer,
            notifier,
        }
    }
}
