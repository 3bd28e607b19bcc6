//! Clients - colaboradores externos
//!
//! Object storage, generación de PDF y envío de emails. El core solo conoce los traits;
//! las implementaciones HTTP se eligen al armar el `AppState`.

pub mod mail_client;
pub mod pdf_client;
pub mod storage_client;

#[cfg(test)]
pub mod fakes;

pub use mail_client::{HttpMailer, Mailer};
pub use pdf_client::{HttpPdfRenderer, PdfRenderer};
pub use storage_client::{HttpObjectStorage, ObjectStorage};
