//! Integration test harness for the gift registry.
//!
//! Builds the real router from [`gift_registry_server::app`] over the
//! in-memory store and mailer, and drives it with `tower::ServiceExt::oneshot`.
//! No database or network is needed except for the tests in
//! `tests/postgres_store.rs`, which are ignored unless run explicitly:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/registry_test \
//!     cargo test -p gift-registry-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use gift_registry_core::{Item, NewItem, RecipientList};
use gift_registry_server::config::{EmailConfig, EmailProvider, LogFormat, RegistryConfig};
use gift_registry_server::db::{MemoryStore, RegistryStore};
use gift_registry_server::middleware::ADMIN_CODE_HEADER;
use gift_registry_server::services::email::MemoryMailer;
use gift_registry_server::state::AppState;

/// Admin code accepted by the test app.
pub const ADMIN_CODE: &str = "Gift-Admin-2026";

/// Fallback owner recipient used unless a test overrides it.
pub const FALLBACK_OWNER: &str = "owner@home.ch";

/// Configuration for tests. The email provider entry is never used because
/// the mailer is injected.
#[must_use]
pub fn test_config(fallback_recipients: &str, claim_rate_limit: bool) -> RegistryConfig {
    RegistryConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        admin_code: SecretString::from(ADMIN_CODE),
        registry_name: "Baby in Need".to_string(),
        email: EmailConfig {
            from_address: "Baby in Need <noreply@registry.ch>".to_string(),
            fallback_recipients: RecipientList::parse(fallback_recipients),
            provider: EmailProvider::Resend {
                api_key: SecretString::from("re_unused"),
            },
        },
        claim_rate_limit,
        trust_proxy_headers: false,
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The app under test with handles on its fakes.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    router: Router,
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    /// JSON body, or the raw text as a JSON string if it is not JSON.
    pub body: Value,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// App with [`FALLBACK_OWNER`] as the fallback recipient and no rate limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config(FALLBACK_OWNER, false))
    }

    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let state = AppState::new(config, store.clone(), mailer.clone());
        Self {
            store,
            mailer,
            router: gift_registry_server::app(state),
        }
    }

    /// Insert an open item directly into the store.
    pub async fn seed_item(&self, name: &str) -> Item {
        self.store
            .insert_item(&NewItem::new(name).unwrap())
            .await
            .unwrap()
    }

    /// Re-read an item from the store.
    pub async fn item(&self, item: &Item) -> Option<Item> {
        self.store.get_item(item.id).await.unwrap()
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(json_request(Method::GET, uri, None, None)).await
    }

    pub async fn post(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(json_request(Method::POST, uri, Some(body), None))
            .await
    }

    /// Request with the correct admin code.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<&Value>) -> TestResponse {
        self.send(json_request(method, uri, body, Some(ADMIN_CODE)))
            .await
    }

    /// Request with an arbitrary admin code header value.
    pub async fn admin_with_code(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
        code: Option<&str>,
    ) -> TestResponse {
        self.send(json_request(method, uri, body, code)).await
    }

    /// The router itself, for streaming responses.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build a request with an optional JSON body and admin code.
#[must_use]
pub fn json_request(
    method: Method,
    uri: &str,
    body: Option<&Value>,
    admin_code: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(code) = admin_code {
        builder = builder.header(ADMIN_CODE_HEADER, code);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
