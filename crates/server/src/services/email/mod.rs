//! Transactional email delivery.
//!
//! [`Mailer`] is the seam to the provider. Production uses
//! [`ResendMailer`] (HTTP API) or [`SmtpMailer`] (lettre); tests use
//! [`MemoryMailer`]. Message content comes from [`Notifier`], which renders
//! the Askama templates under `templates/email/`.

pub mod memory;
pub mod notifier;
pub mod resend;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::{EmailConfig, EmailProvider};

pub use memory::MemoryMailer;
pub use notifier::Notifier;
pub use resend::ResendMailer;
pub use smtp::SmtpMailer;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message has no recipients.
    #[error("No recipients")]
    NoRecipients,

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Failed to parse provider response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A rendered message ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Provider acknowledgement of a sent message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    /// Provider message ID, when the provider returns one.
    pub id: Option<String>,
}

/// Result of a provider health probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Number of verified sending domains, when the provider reports them.
    pub domains: Option<usize>,
}

/// A transactional email provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Short provider name for diagnostics, e.g. `"Resend"`.
    fn service_name(&self) -> &'static str;

    /// Deliver one message.
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, EmailError>;

    /// Check that credentials work and the provider is reachable.
    async fn status(&self) -> Result<ProviderStatus, EmailError>;
}

/// Build the configured provider.
///
/// # Errors
///
/// Returns error if the HTTP client or SMTP transport cannot be built.
pub fn build_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>, EmailError> {
    let mailer: Arc<dyn Mailer> = match &config.provider {
        EmailProvider::Resend { api_key } => Arc::new(ResendMailer::new(api_key)?),
        EmailProvider::Smtp(smtp) => Arc::new(SmtpMailer::new(smtp)?),
    };
    tracing::info!(service = mailer.service_name(), "Email provider configured");
    Ok(mailer)
}
