//! Middleware de la API

pub mod auth;
pub mod cors;

pub use auth::{cron_api_key, session_auth, AuthenticatedUser};
pub use cors::cors_layer;
