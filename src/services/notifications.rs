//! Cola de notificaciones post-commit
//!
//! Los servicios encolan emails después de confirmar la transacción. Un worker los
//! entrega sin reintentos; un fallo solo queda en el log.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clients::Mailer;

pub const TEMPLATE_CERTIFICATE_ISSUED: &str = "certificate-issued";
pub const TEMPLATE_RECEIPT_UPLOADED: &str = "payment-receipt-uploaded";
pub const TEMPLATE_PAYMENT_APPROVED: &str = "payment-approved";
pub const TEMPLATE_PAYMENT_REJECTED: &str = "payment-rejected";

#[derive(Debug, Clone, PartialEq)]
pub struct EmailJob {
    pub template_id: String,
    pub to: String,
    pub vars: BTreeMap<String, String>,
}

impl EmailJob {
    pub fn new(template_id: &str, to: &str) -> Self {
        Self {
            template_id: template_id.to_string(),
            to: to.to_string(),
            vars: BTreeMap::new(),
        }
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::UnboundedSender<EmailJob>,
}

impl Notifier {
    /// Crea la cola y lanza el worker que la vacía
    pub fn spawn(mailer: Arc<dyn Mailer>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<EmailJob>();

        let handle = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                match mailer.send(&job.template_id, &job.to, &job.vars).await {
                    Ok(()) => debug!("✉️ Email '{}' enviado a {}", job.template_id, job.to),
                    Err(e) => warn!(
                        "⚠️ No se pudo enviar '{}' a {}: {}",
                        job.template_id, job.to, e
                    ),
                }
            }
            info!("📭 Cola de notificaciones cerrada");
        });

        (Self { sender }, handle)
    }

    /// Notifier sin worker; los emails se descartan
    pub fn disabled() -> Self {
        let (sender, _receiver) = mpsc::unbounded_channel();
        Self { sender }
    }

    pub fn enqueue(&self, job: EmailJob) {
        if let Err(e) = self.sender.send(job) {
            warn!("⚠️ Notificación descartada para {}", e.0.to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fakes::RecordingMailer;

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let mailer = Arc::new(RecordingMailer::default());
        let (notifier, handle) = Notifier::spawn(mailer.clone());

        notifier.enqueue(EmailJob::new(TEMPLATE_PAYMENT_APPROVED, "a@taller.com"));
        notifier.enqueue(EmailJob::new(TEMPLATE_PAYMENT_REJECTED, "b@taller.com").var("motivo", "x"));
        drop(notifier);
        handle.await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, "a@taller.com");
        assert_eq!(sent[1].0, TEMPLATE_PAYMENT_REJECTED);
    }

    #[tokio::test]
    async fn test_mailer_failure_is_swallowed() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let (notifier, handle) = Notifier::spawn(mailer);
        notifier.enqueue(EmailJob::new(TEMPLATE_CERTIFICATE_ISSUED, "x@y.com"));
        drop(notifier);
        assert!(handle.await.is_ok());
    }

    #[test]
    fn test_disabled_notifier_never_panics() {
        Notifier::disabled().enqueue(EmailJob::new(TEMPLATE_CERTIFICATE_ISSUED, "x@y.com"));
    }
}
