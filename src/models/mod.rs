//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL.

pub mod application;
pub mod document;
pub mod inspection;
pub mod payment;
pub mod person;
pub mod sticker;
pub mod user;
pub mod vehicle;
pub mod workshop;
