//! Módulo de base de datos
//!
//! Maneja la conexión y migraciones de PostgreSQL

pub mod connection;

pub use connection::{create_pool, mask_database_url, run_migrations, test_connection};
