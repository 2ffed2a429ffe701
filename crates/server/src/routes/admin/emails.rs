//! Admin email diagnostics.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gift_registry_core::Email;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAdmin;
use crate::services::email::SendReceipt;
use crate::state::AppState;

/// Diagnostic request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailActionBody {
    pub action: Option<String>,
    pub email: Option<String>,
    pub item_name: Option<String>,
}

/// Diagnostic result. Provider failures are reported here with
/// `success: false` rather than as an HTTP error.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run an email diagnostic: `test` sends a marked donor confirmation,
/// `status` probes the provider.
#[instrument(skip_all)]
pub async fn email_action(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EmailActionBody>,
) -> Result<Json<EmailActionResponse>> {
    match body.action.as_deref() {
        Some("test") => send_test(&state, &body).await.map(Json),
        Some("status") => Ok(Json(provider_status(&state).await)),
        _ => Err(AppError::BadRequest("Invalid action".to_string())),
    }
}

async fn send_test(state: &AppState, body: &EmailActionBody) -> Result<EmailActionResponse> {
    let (Some(raw_email), Some(item_name)) = (body.email.as_deref(), body.item_name.as_deref())
    else {
        return Err(AppError::BadRequest(
            "Email and itemName are required".to_string(),
        ));
    };
    let to = Email::parse(raw_email)?;

    let notifier = state.notifier();
    let result = match notifier.test_confirmation(&to, item_name) {
        Ok(email) => notifier.send(&email).await,
        Err(e) => Err(e),
    };

    Ok(match result {
        Ok(receipt) => {
            tracing::info!(to = %to, "Test email sent");
            EmailActionResponse {
                success: true,
                message: Some(format!("Test email sent to {to}")),
                email_id: receipt.id,
                ..EmailActionResponse::default()
            }
        }
        Err(e) => {
            tracing::warn!(to = %to, error = %e, "Test email failed");
            EmailActionResponse {
                success: false,
                error: Some(e.to_string()),
                ..EmailActionResponse::default()
            }
        }
    })
}

async fn provider_status(state: &AppState) -> EmailActionResponse {
    let mailer = state.notifier().mailer();
    let service = Some(mailer.service_name());
    match mailer.status().await {
        Ok(status) => EmailActionResponse {
            success: true,
            service,
            domains: status.domains,
            api_key_valid: Some(true),
            ..EmailActionResponse::default()
        },
        Err(e) => {
            tracing::warn!(error = %e, "Email provider status check failed");
            EmailActionResponse {
                success: false,
                service,
                api_key_valid: Some(false),
                error: Some(e.to_string()),
                ..EmailActionResponse::default()
            }
        }
    }
}

/// Query for the direct test message.
#[derive(Debug, Deserialize)]
pub struct DebugEmailQuery {
    pub to: Option<String>,
}

/// Send a plain test message and return the provider receipt.
#[instrument(skip_all)]
pub async fn debug_email(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<DebugEmailQuery>,
) -> Result<Json<SendReceipt>> {
    let to = Email::parse(query.to.as_deref().unwrap_or_default())?;
    let notifier = state.notifier();
    let receipt = notifier.send(&notifier.direct_test(&to)).await?;
    tracing::info!(to = %to, "Debug email sent");
    Ok(Json(receipt))
}
