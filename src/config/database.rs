//! Configuración de base de datos
//!
//! Este módulo maneja la conexión y configuración de PostgreSQL con SQLx.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;

/// Configuración de la base de datos
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Límite de espera de cualquier sentencia, incluida la espera por un lock de fila
    pub statement_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
            statement_timeout: Duration::from_millis(5000),
        }
    }

    pub fn from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set in environment variables")?;
        let mut config = Self::new(url);

        if let Ok(value) = std::env::var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = value
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?;
        }
        if let Ok(value) = std::env::var("DATABASE_STATEMENT_TIMEOUT_MS") {
            let millis: u64 = value
                .parse()
                .context("DATABASE_STATEMENT_TIMEOUT_MS must be a valid number")?;
            config.statement_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }

    fn pool_options(&self) -> PgPoolOptions {
        let statement_timeout = self.statement_timeout.as_millis();
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(format!("SET statement_timeout = {}", statement_timeout).as_str())
                        .await?;
                    Ok(())
                })
            })
    }

    /// Crear un nuevo pool de conexiones
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        self.pool_options().connect(&self.url).await
    }

    /// Crear un pool que no abre conexiones hasta el primer uso
    pub fn create_lazy_pool(&self) -> Result<PgPool, sqlx::Error> {
        self.pool_options().connect_lazy(&self.url)
    }
}
