//! Recording mailer for tests and local runs without a provider.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use super::{EmailError, Mailer, OutgoingEmail, ProviderStatus, SendReceipt};

/// Mailer that keeps every message in memory.
///
/// Sends can be made to fail for specific recipients, which is how tests
/// exercise the donor-confirmation rollback and best-effort owner notices.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing_recipients: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    next_id: AtomicU64,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any message addressed to `address`.
    pub fn fail_for(&self, address: &str) {
        if let Ok(mut failing) = self.failing_recipients.lock() {
            failing.insert(address.to_owned());
        }
    }

    /// Fail every send and status probe.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Messages delivered so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages delivered to `address`.
    #[must_use]
    pub fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to.iter().any(|to| to == address))
            .collect()
    }

    fn should_fail(&self, email: &OutgoingEmail) -> bool {
        if self.fail_all.load(Ordering::SeqCst) {
            return true;
        }
        self.failing_recipients
            .lock()
            .map(|failing| email.to.iter().any(|to| failing.contains(to)))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    fn service_name(&self) -> &'static str {
        "Memory"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, EmailError> {
        if email.to.is_empty() {
            return Err(EmailError::NoRecipients);
        }
        if self.should_fail(email) {
            return Err(EmailError::Api {
                status: 503,
                message: "simulated delivery failure".to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(SendReceipt {
            id: Some(format!("mem-{id}")),
        })
    }

    async fn status(&self) -> Result<ProviderStatus, EmailError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(EmailError::Api {
                status: 401,
                message: "simulated invalid API key".to_string(),
            });
        }
        Ok(ProviderStatus { domains: Some(1) })
    }
}
