//! Configuración de conexión a PostgreSQL
//!
//! Este módulo maneja la conexión a la base de datos y las migraciones embebidas.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;

/// Crear un pool de conexiones a la base de datos y verificarlo
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    info!("🔗 Conectando a PostgreSQL: {}", mask_database_url(&config.url));
    let pool = config.create_pool().await?;
    test_connection(&pool).await?;
    Ok(pool)
}

/// Verificar que la conexión funciona
pub async fn test_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Ejecutar migraciones de la base de datos
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Función helper para enmascarar la URL de la base de datos en logs
pub fn mask_database_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if url[..at_pos].rfind(':').is_some() {
            let protocol = &url[..url.find("://").map(|p| p + 3).unwrap_or(0)];
            let host = &url[at_pos + 1..];
            format!("{}***:***@{}", protocol, host)
        } else {
            url.to_string()
        }
    } else {
        url.to_string()
    }
}
