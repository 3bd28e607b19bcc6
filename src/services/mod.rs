//! Servicios
//!
//! Lógica de negocio sobre los repositorios. Cada operación recibe explícitamente el
//! `RequestContext` de quien la invoca.

pub mod access;
pub mod application_service;
pub mod certificate_service;
pub mod expiration_sweeper;
pub mod inspection_service;
pub mod notifications;
pub mod payment_service;
pub mod qr_service;
pub mod slot_ledger;
pub mod sticker_service;
pub mod vehicle_service;

pub use application_service::ApplicationService;
pub use certificate_service::CertificateIssuer;
pub use expiration_sweeper::ExpirationSweeper;
pub use inspection_service::InspectionService;
pub use notifications::Notifier;
pub use payment_service::PaymentService;
pub use qr_service::QrService;
pub use slot_ledger::SlotLedger;
pub use sticker_service::{StickerManager, StickerService};
pub use vehicle_service::VehicleService;
