//! Backend de la red de talleres de Revisión Técnica Obligatoria
//!
//! Trámites, cupos de inspección, obleas, inspecciones, certificados y verificación
//! pública por QR.

pub mod clients;
pub mod config;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
