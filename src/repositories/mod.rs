//! Repositorios
//!
//! Acceso a PostgreSQL. Cada función recibe la conexión (o transacción) sobre la que
//! opera, de modo que el servicio decide el alcance transaccional.

pub mod application_repository;
pub mod document_repository;
pub mod inspection_repository;
pub mod payment_repository;
pub mod person_repository;
pub mod sticker_repository;
pub mod user_repository;
pub mod vehicle_repository;
pub mod workshop_repository;

pub use application_repository::ApplicationRepository;
pub use document_repository::DocumentRepository;
pub use inspection_repository::InspectionRepository;
pub use payment_repository::PaymentRepository;
pub use person_repository::PersonRepository;
pub use sticker_repository::StickerRepository;
pub use user_repository::UserRepository;
pub use vehicle_repository::VehicleRepository;
pub use workshop_repository::WorkshopRepository;
