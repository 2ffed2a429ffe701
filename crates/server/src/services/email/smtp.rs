//! SMTP delivery via lettre.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;

use super::{EmailError, Mailer, OutgoingEmail, ProviderStatus, SendReceipt};
use crate::config::SmtpConfig;

/// SMTP relay mailer.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self { mailer })
    }
}

/// Build a lettre message, multipart when an HTML body is present.
fn build_message(email: &OutgoingEmail) -> Result<Message, EmailError> {
    if email.to.is_empty() {
        return Err(EmailError::NoRecipients);
    }

    let from: Mailbox = email
        .from
        .parse()
        .map_err(|_| EmailError::InvalidAddress(email.from.clone()))?;
    let mut builder = Message::builder().from(from).subject(&email.subject);
    for to in &email.to {
        let mailbox: Mailbox = to
            .parse()
            .map_err(|_| EmailError::InvalidAddress(to.clone()))?;
        builder = builder.to(mailbox);
    }

    let message = match &email.html {
        Some(html) => builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html.clone()),
                ),
        )?,
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.text.clone())?,
    };
    Ok(message)
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn service_name(&self) -> &'static str {
        "SMTP"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, EmailError> {
        let message = build_message(email)?;
        let response = self.mailer.send(message).await?;

        let id = response.message().next().map(str::to_owned);
        tracing::info!(to = ?email.to, subject = %email.subject, "Email sent via SMTP");
        Ok(SendReceipt { id })
    }

    async fn status(&self) -> Result<ProviderStatus, EmailError> {
        if self.mailer.test_connection().await? {
            Ok(ProviderStatus { domains: None })
        } else {
            Err(EmailError::Api {
                status: 0,
                message: "SMTP server did not accept the connection".to_string(),
            })
        }
    }
}
