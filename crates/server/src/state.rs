//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::db::RegistryStore;
use crate::services::email::{Mailer, Notifier};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds no per-user or admin state; admin
/// access is decided per request from the `x-admin-code` header.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RegistryConfig,
    store: Arc<dyn RegistryStore>,
    notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Registry configuration
    /// * `store` - Item and config storage
    /// * `mailer` - Transactional email provider
    #[must_use]
    pub fn new(
        config: RegistryConfig,
        store: Arc<dyn RegistryStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let notifier = Notifier::new(mailer, &config.email.from_address, &config.registry_name);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                notifier,
            }),
        }
    }

    /// Get a reference to the registry configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Get a reference to the registry store.
    #[must_use]
    pub fn store(&self) -> &dyn RegistryStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the email notifier.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
