//! Admin API. Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin).

pub mod config;
pub mod emails;
pub mod items;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

/// Admin routes, mounted under `/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/items",
            post(items::create_item).delete(items::delete_item),
        )
        .route("/config", post(config::save_recipients))
        .route("/emails", post(emails::email_action))
        .route("/debug-email", get(emails::debug_email))
}
