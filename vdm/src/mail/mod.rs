//! Outbound mail collaborator.
//!
//! The core only hands a destination address and a reset link to a
//! [`Mailer`]; composing and delivering the message is the collaborator's job.

use async_trait::async_trait;
use thiserror::Error;

/// Mail delivery errors
#[derive(Debug, Error)]
pub enum MailError {
    /// Collaborator refused or failed to deliver
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivers password-reset links out of band
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send `link` (which embeds the raw reset secret) to `to`
    async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), MailError>;
}

/// Mailer that only records the delivery in the log.
///
/// The link itself is never logged because it carries a live secret.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, _link: &str) -> Result<(), MailError> {
        log::info!("Password reset link issued for {to}");
        Ok(())
    }
}
