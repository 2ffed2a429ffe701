//! HTTP route handlers for the registry.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                    - Registry page
//! GET    /health              - Liveness check
//! GET    /health/ready        - Readiness check (store ping)
//!
//! # Public API
//! GET    /items               - All items, newest first
//! GET    /items/stream        - SSE: `items` event on connect and on every change
//! GET    /config/recipients   - Owner recipient list
//! POST   /claim               - Claim an item (rate limited)
//!
//! # Admin API (x-admin-code header)
//! POST   /admin/items         - Create item
//! DELETE /admin/items         - Delete item
//! POST   /admin/config        - Set owner recipients
//! POST   /admin/emails        - Email diagnostics (test | status)
//! GET    /admin/debug-email   - Send a plain test message
//! ```

pub mod admin;
pub mod claim;
pub mod home;
pub mod items;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::middleware::{claim_rate_limiter, rate_limited_response};
use crate::state::AppState;

/// Public pages and read API.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/items", get(items::list_items))
        .route("/items/stream", get(items::stream_items))
        .route("/config/recipients", get(items::recipients))
}

/// The claim endpoint, optionally behind the per-IP rate limiter.
///
/// Proxy IP headers only key the limiter when `trust_proxy_headers` is set.
pub fn claim_routes(rate_limited: bool, trust_proxy_headers: bool) -> Router<AppState> {
    let router = Router::new().route("/claim", post(claim::claim));
    if rate_limited {
        router
            .route_layer(claim_rate_limiter(trust_proxy_headers))
            .route_layer(axum_middleware::map_response(rate_limited_response))
    } else {
        router
    }
}
