use async_trait::async_trait;
use lettre::{transport::smtp::authentication::Credentials, Message, SmtpTransport, Transport};
use serde::Serialize;

use crate::config::SmtpConfig;

/// Delivery outcome reported back to the booking caller. Best effort only;
/// a `false` never fails the request that triggered the send.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EmailStatus {
    pub user_notified: bool,
    pub admin_notified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    Address(String),
    #[error("Failed to build message: {0}")]
    Message(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from: lettre::message::Mailbox,
}

impl SmtpNotifier {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, NotifyError> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let mailer = SmtpTransport::relay(&cfg.host)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .port(cfg.port)
            .credentials(creds)
            .build();
        let from = cfg
            .from
            .parse()
            .map_err(|e| NotifyError::Address(format!("{}: {e}", cfg.from)))?;
        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|e| NotifyError::Address(format!("{to}: {e}")))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        let mailer = self.mailer.clone();
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        Ok(())
    }
}
