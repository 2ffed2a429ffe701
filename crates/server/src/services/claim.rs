//! Claim saga: reserve an item, confirm to the donor, notify the owners.
//!
//! Steps run in order. A step that mutates the store records its
//! compensation in a journal; if a later mandatory step fails the journal is
//! unwound in reverse before the error is returned.
//!
//! | Step                | Mandatory | Compensation   |
//! |---------------------|-----------|----------------|
//! | `Reserve`           | yes       | `ReleaseClaim` |
//! | `ResolveRecipients` | no        | none           |
//! | `ConfirmDonor`      | yes       | none           |
//! | `NotifyOwners`      | no        | none           |

use core::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;

use gift_registry_core::{Email, Item, ItemId, RecipientList};

use crate::db::config::load_recipients;
use crate::db::{RegistryStore, RepositoryError};
use crate::services::email::{EmailError, Notifier};

/// Named steps of the claim saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStep {
    Reserve,
    ResolveRecipients,
    ConfirmDonor,
    NotifyOwners,
}

impl fmt::Display for ClaimStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reserve => "reserve",
            Self::ResolveRecipients => "resolve_recipients",
            Self::ConfirmDonor => "confirm_donor",
            Self::NotifyOwners => "notify_owners",
        };
        f.write_str(name)
    }
}

/// Errors that end a claim.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The item does not exist or someone else claimed it first.
    #[error("item already claimed")]
    AlreadyClaimed,

    /// The store failed during a mandatory step.
    #[error("store error during {step}: {source}")]
    Store {
        step: ClaimStep,
        #[source]
        source: RepositoryError,
    },

    /// The donor confirmation could not be sent.
    #[error("donor confirmation failed (rolled back: {rolled_back}): {source}")]
    ConfirmationFailed {
        #[source]
        source: EmailError,
        rolled_back: bool,
    },
}

/// A validated claim request.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub item_id: ItemId,
    pub donor: Email,
}

/// Result of a successful claim.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    /// The claimed row.
    pub item: Item,
    /// Whether the donor confirmation was delivered.
    pub email_sent: bool,
    /// Whether the owner notification was delivered.
    pub owners_notified: bool,
}

/// Undo action for a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compensation {
    /// Reopen the item, but only if `claimed_at` is still ours.
    ReleaseClaim {
        id: ItemId,
        claimed_at: DateTime<Utc>,
    },
}

/// Journal of compensations for the steps completed so far.
struct Saga<'a> {
    store: &'a dyn RegistryStore,
    journal: Vec<Compensation>,
}

impl<'a> Saga<'a> {
    const fn new(store: &'a dyn RegistryStore) -> Self {
        Self {
            store,
            journal: Vec::new(),
        }
    }

    fn record(&mut self, compensation: Compensation) {
        self.journal.push(compensation);
    }

    /// Run every recorded compensation, newest first.
    ///
    /// Returns true only if all of them succeeded.
    async fn unwind(self) -> bool {
        let mut all_ok = true;
        for compensation in self.journal.into_iter().rev() {
            match compensation {
                Compensation::ReleaseClaim { id, claimed_at } => {
                    match self.store.release_claim(id, claimed_at).await {
                        Ok(true) => {
                            tracing::info!(item_id = %id, "Claim released");
                        }
                        Ok(false) => {
                            tracing::error!(
                                item_id = %id,
                                "Claim release matched no row; item left as is"
                            );
                            all_ok = false;
                        }
                        Err(e) => {
                            tracing::error!(item_id = %id, error = %e, "Claim release failed");
                            all_ok = false;
                        }
                    }
                }
            }
        }
        all_ok
    }
}

/// Claim an item for a donor.
///
/// `fallback_recipients` is used when no owner list is configured in the
/// store or it cannot be read.
///
/// # Errors
///
/// - `ClaimError::AlreadyClaimed` if the conditional update matched no row
/// - `ClaimError::Store` if the reserve step fails in the store
/// - `ClaimError::ConfirmationFailed` if the donor email could not be sent;
///   the claim has been released when `rolled_back` is true
#[tracing::instrument(skip_all, fields(item_id = %request.item_id))]
pub async fn claim_item(
    store: &dyn RegistryStore,
    notifier: &Notifier,
    fallback_recipients: &RecipientList,
    request: ClaimRequest,
) -> Result<ClaimOutcome, ClaimError> {
    let mut saga = Saga::new(store);

    // Postgres keeps microseconds; the release guard compares exactly.
    tracing::debug!(step = %ClaimStep::Reserve, "Claim step");
    let now = Utc::now().trunc_subsecs(6);
    let item = store
        .claim_item(request.item_id, now)
        .await
        .map_err(|source| ClaimError::Store {
            step: ClaimStep::Reserve,
            source,
        })?
        .ok_or(ClaimError::AlreadyClaimed)?;
    let claimed_at = item.claimed_at.unwrap_or(now);
    saga.record(Compensation::ReleaseClaim {
        id: item.id,
        claimed_at,
    });

    tracing::debug!(step = %ClaimStep::ResolveRecipients, "Claim step");
    let recipients = match load_recipients(store).await {
        Ok(list) => list.or_fallback(fallback_recipients),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read recipients; using fallback list");
            fallback_recipients.clone()
        }
    };

    tracing::debug!(step = %ClaimStep::ConfirmDonor, "Claim step");
    let confirmation = match notifier.donor_confirmation(&request.donor, &item.name) {
        Ok(email) => notifier.send(&email).await,
        Err(e) => Err(e),
    };
    if let Err(source) = confirmation {
        tracing::error!(error = %source, "Donor confirmation failed; releasing claim");
        let rolled_back = saga.unwind().await;
        return Err(ClaimError::ConfirmationFailed {
            source,
            rolled_back,
        });
    }

    tracing::debug!(step = %ClaimStep::NotifyOwners, "Claim step");
    let owners_notified = if recipients.is_empty() {
        tracing::info!("No owner recipients configured; skipping notification");
        false
    } else {
        let notification = match notifier.owner_notification(&recipients, &item.name, claimed_at)
        {
            Ok(email) => notifier.send(&email).await,
            Err(e) => Err(e),
        };
        match notification {
            Ok(_) => true,
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::warn!(
                    error = %e,
                    sentry_event_id = %event_id,
                    "Owner notification failed"
                );
                false
            }
        }
    };

    tracing::info!(item = %item.name, owners_notified, "Item claimed");
    Ok(ClaimOutcome {
        item,
        email_sent: true,
        owners_notified,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use gift_registry_core::NewItem;

    use super::*;
    use crate::db::MemoryStore;
    use crate::db::config::save_recipients;
    use crate::services::email::MemoryMailer;

    const DONOR: &str = "donor@mail.ch";

    struct Fixture {
        store: MemoryStore,
        mailer: Arc<MemoryMailer>,
        notifier: Notifier,
        item: Item,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let item = store
            .insert_item(&NewItem::new("Stroller").unwrap())
            .await
            .unwrap();
        let mailer = Arc::new(MemoryMailer::new());
        let notifier = Notifier::new(mailer.clone(), "noreply@registry.ch", "Baby in Need");
        Fixture {
            store,
            mailer,
            notifier,
            item,
        }
    }

    fn request(id: ItemId) -> ClaimRequest {
        ClaimRequest {
            item_id: id,
            donor: Email::parse(DONOR).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_claim_sends_both_emails() {
        let f = fixture().await;
        let fallback = RecipientList::parse("owner@home.ch");

        let outcome = claim_item(&f.store, &f.notifier, &fallback, request(f.item.id))
            .await
            .unwrap();

        assert_eq!(outcome.item.name, "Stroller");
        assert!(outcome.email_sent);
        assert!(outcome.owners_notified);
        assert_eq!(f.mailer.sent_to(DONOR).len(), 1);
        assert_eq!(f.mailer.sent_to("owner@home.ch").len(), 1);
    }

    #[tokio::test]
    async fn test_second_claim_conflicts() {
        let f = fixture().await;
        let fallback = RecipientList::default();
        claim_item(&f.store, &f.notifier, &fallback, request(f.item.id))
            .await
            .unwrap();

        let second = claim_item(&f.store, &f.notifier, &fallback, request(f.item.id)).await;
        assert!(matches!(second, Err(ClaimError::AlreadyClaimed)));
        assert_eq!(f.mailer.sent_to(DONOR).len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_item_conflicts() {
        let f = fixture().await;
        let result = claim_item(
            &f.store,
            &f.notifier,
            &RecipientList::default(),
            request(ItemId::new(999)),
        )
        .await;
        assert!(matches!(result, Err(ClaimError::AlreadyClaimed)));
    }

    #[tokio::test]
    async fn test_donor_failure_releases_claim() {
        let f = fixture().await;
        f.mailer.fail_for(DONOR);

        let result = claim_item(
            &f.store,
            &f.notifier,
            &RecipientList::parse("owner@home.ch"),
            request(f.item.id),
        )
        .await;

        assert!(matches!(
            result,
            Err(ClaimError::ConfirmationFailed {
                rolled_back: true,
                ..
            })
        ));
        let item = f.store.get_item(f.item.id).await.unwrap().unwrap();
        assert!(item.is_open());
        assert!(f.mailer.sent_to("owner@home.ch").is_empty());
    }

    #[tokio::test]
    async fn test_failed_release_is_reported() {
        let f = fixture().await;
        f.mailer.fail_for(DONOR);
        f.store.set_fail_releases(true);

        let result = claim_item(
            &f.store,
            &f.notifier,
            &RecipientList::default(),
            request(f.item.id),
        )
        .await;

        assert!(matches!(
            result,
            Err(ClaimError::ConfirmationFailed {
                rolled_back: false,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_owner_failure_is_best_effort() {
        let f = fixture().await;
        f.mailer.fail_for("owner@home.ch");

        let outcome = claim_item(
            &f.store,
            &f.notifier,
            &RecipientList::parse("owner@home.ch"),
            request(f.item.id),
        )
        .await
        .unwrap();

        assert!(outcome.email_sent);
        assert!(!outcome.owners_notified);
        let item = f.store.get_item(f.item.id).await.unwrap().unwrap();
        assert!(!item.is_open());
    }

    #[tokio::test]
    async fn test_configured_recipients_override_fallback() {
        let f = fixture().await;
        save_recipients(&f.store, &RecipientList::parse("mum@home.ch, dad@home.ch"))
            .await
            .unwrap();

        claim_item(
            &f.store,
            &f.notifier,
            &RecipientList::parse("env@home.ch"),
            request(f.item.id),
        )
        .await
        .unwrap();

        assert_eq!(f.mailer.sent_to("mum@home.ch").len(), 1);
        assert!(f.mailer.sent_to("env@home.ch").is_empty());
    }

    #[tokio::test]
    async fn test_no_recipients_skips_owner_notification() {
        let f = fixture().await;
        let outcome = claim_item(
            &f.store,
            &f.notifier,
            &RecipientList::default(),
            request(f.item.id),
        )
        .await
        .unwrap();

        assert!(!outcome.owners_notified);
        assert_eq!(f.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_on_reserve() {
        let f = fixture().await;
        f.store.set_unavailable(true);

        let result = claim_item(
            &f.store,
            &f.notifier,
            &RecipientList::default(),
            request(f.item.id),
        )
        .await;

        assert!(matches!(
            result,
            Err(ClaimError::Store {
                step: ClaimStep::Reserve,
                ..
            })
        ));
        assert!(f.mailer.sent().is_empty());
    }
}
