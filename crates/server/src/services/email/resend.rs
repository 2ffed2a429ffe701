//! Resend HTTP API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{EmailError, Mailer, OutgoingEmail, ProviderStatus, SendReceipt};

/// Resend API base URL.
const BASE_URL: &str = "https://api.resend.com";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Resend API client.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DomainsResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

impl ResendMailer {
    /// Create a new Resend client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(api_key: &SecretString) -> Result<Self, EmailError> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a client against a different API host.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn with_base_url(api_key: &SecretString, base_url: &str) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", api_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| EmailError::Parse(format!("Invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    async fn error_from(response: reqwest::Response) -> EmailError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        EmailError::Api { status, message }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    fn service_name(&self) -> &'static str {
        "Resend"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, EmailError> {
        if email.to.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        let body = SendEmailRequest {
            from: &email.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
            html: email.html.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let parsed: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| EmailError::Parse(e.to_string()))?;

        tracing::info!(
            to = ?email.to,
            subject = %email.subject,
            email_id = parsed.id.as_deref().unwrap_or(""),
            "Email sent via Resend"
        );
        Ok(SendReceipt { id: parsed.id })
    }

    async fn status(&self) -> Result<ProviderStatus, EmailError> {
        let response = self
            .client
            .get(format!("{}/domains", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let parsed: DomainsResponse = response
            .json()
            .await
            .map_err(|e| EmailError::Parse(e.to_string()))?;

        Ok(ProviderStatus {
            domains: Some(parsed.data.len()),
        })
    }
}
