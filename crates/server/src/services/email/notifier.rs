//! Registry email content.
//!
//! Builds donor confirmations and owner notifications from Askama templates
//! (HTML and plain text) and hands them to the configured [`Mailer`].

use std::sync::Arc;

use askama::Template;
use chrono::{DateTime, Utc};

use gift_registry_core::{Email, RecipientList};

use super::{EmailError, Mailer, OutgoingEmail, SendReceipt};

/// HTML template for the donor confirmation.
#[derive(Template)]
#[template(path = "email/donor_confirmation.html")]
struct DonorConfirmationHtml<'a> {
    registry_name: &'a str,
    item_name: &'a str,
    test: bool,
}

/// Plain text template for the donor confirmation.
#[derive(Template)]
#[template(path = "email/donor_confirmation.txt")]
struct DonorConfirmationText<'a> {
    registry_name: &'a str,
    item_name: &'a str,
    test: bool,
}

/// HTML template for the owner notification.
#[derive(Template)]
#[template(path = "email/owner_notification.html")]
struct OwnerNotificationHtml<'a> {
    registry_name: &'a str,
    item_name: &'a str,
    claimed_at: &'a str,
}

/// Plain text template for the owner notification.
#[derive(Template)]
#[template(path = "email/owner_notification.txt")]
struct OwnerNotificationText<'a> {
    registry_name: &'a str,
    item_name: &'a str,
    claimed_at: &'a str,
}

/// Renders and sends registry emails.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from_address: String,
    registry_name: String,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, from_address: &str, registry_name: &str) -> Self {
        Self {
            mailer,
            from_address: from_address.to_owned(),
            registry_name: registry_name.to_owned(),
        }
    }

    /// The provider behind this notifier.
    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    /// Confirmation sent to the donor who reserved `item_name`.
    ///
    /// # Errors
    ///
    /// Returns error if a template fails to render.
    pub fn donor_confirmation(
        &self,
        donor: &Email,
        item_name: &str,
    ) -> Result<OutgoingEmail, EmailError> {
        self.render_donor_confirmation(donor, item_name, false)
    }

    /// Donor confirmation marked as a test, for admin diagnostics.
    ///
    /// # Errors
    ///
    /// Returns error if a template fails to render.
    pub fn test_confirmation(
        &self,
        to: &Email,
        item_name: &str,
    ) -> Result<OutgoingEmail, EmailError> {
        self.render_donor_confirmation(to, item_name, true)
    }

    fn render_donor_confirmation(
        &self,
        to: &Email,
        item_name: &str,
        test: bool,
    ) -> Result<OutgoingEmail, EmailError> {
        let registry_name = self.registry_name.as_str();
        let html = DonorConfirmationHtml {
            registry_name,
            item_name,
            test,
        }
        .render()?;
        let text = DonorConfirmationText {
            registry_name,
            item_name,
            test,
        }
        .render()?;

        let subject = format!("Reservation confirmed – {registry_name}");
        Ok(OutgoingEmail {
            from: self.from_address.clone(),
            to: vec![to.as_str().to_owned()],
            subject: if test {
                format!("TEST: {subject}")
            } else {
                subject
            },
            text,
            html: Some(html),
        })
    }

    /// Notification to the registry owners that `item_name` was reserved.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::NoRecipients` if the list is empty, or an error
    /// if a template fails to render.
    pub fn owner_notification(
        &self,
        recipients: &RecipientList,
        item_name: &str,
        claimed_at: DateTime<Utc>,
    ) -> Result<OutgoingEmail, EmailError> {
        if recipients.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        let registry_name = self.registry_name.as_str();
        let claimed_at = claimed_at.format("%d.%m.%Y %H:%M UTC").to_string();
        let html = OwnerNotificationHtml {
            registry_name,
            item_name,
            claimed_at: &claimed_at,
        }
        .render()?;
        let text = OwnerNotificationText {
            registry_name,
            item_name,
            claimed_at: &claimed_at,
        }
        .render()?;

        Ok(OutgoingEmail {
            from: self.from_address.clone(),
            to: recipients.as_slice().to_vec(),
            subject: format!("New gift reserved – {registry_name}"),
            text,
            html: Some(html),
        })
    }

    /// Minimal plain-text message for checking delivery end to end.
    #[must_use]
    pub fn direct_test(&self, to: &Email) -> OutgoingEmail {
        OutgoingEmail {
            from: self.from_address.clone(),
            to: vec![to.as_str().to_owned()],
            subject: format!("Test – {}", self.registry_name),
            text: "Direct test from the registry server.".to_string(),
            html: None,
        }
    }

    /// Deliver a rendered message.
    ///
    /// # Errors
    ///
    /// Returns whatever the provider reports.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, EmailError> {
        self.mailer.send(email).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::email::MemoryMailer;

    fn notifier() -> Notifier {
        Notifier::new(
            Arc::new(MemoryMailer::new()),
            "Baby in Need <noreply@registry.ch>",
            "Baby in Need",
        )
    }

    #[test]
    fn test_donor_confirmation_mentions_item() {
        let donor = Email::parse("donor@mail.ch").unwrap();
        let email = notifier().donor_confirmation(&donor, "Stroller").unwrap();
        assert_eq!(email.to, ["donor@mail.ch"]);
        assert_eq!(email.subject, "Reservation confirmed – Baby in Need");
        assert!(email.text.contains("\"Stroller\""));
        assert!(email.html.unwrap().contains("Stroller"));
    }

    #[test]
    fn test_donor_confirmation_escapes_html() {
        let donor = Email::parse("donor@mail.ch").unwrap();
        let email = notifier()
            .donor_confirmation(&donor, "<script>alert(1)</script>")
            .unwrap();
        assert!(!email.html.unwrap().contains("<script>"));
    }

    #[test]
    fn test_test_confirmation_is_marked() {
        let to = Email::parse("admin@mail.ch").unwrap();
        let email = notifier().test_confirmation(&to, "Crib").unwrap();
        assert!(email.subject.starts_with("TEST: "));
        assert!(email.text.starts_with("TEST E-MAIL"));
    }

    #[test]
    fn test_owner_notification_goes_to_all_recipients() {
        let recipients = RecipientList::parse("mum@home.ch, dad@home.ch");
        let email = notifier()
            .owner_notification(&recipients, "Crib", Utc::now())
            .unwrap();
        assert_eq!(email.to, ["mum@home.ch", "dad@home.ch"]);
        assert_eq!(email.subject, "New gift reserved – Baby in Need");
        assert!(email.text.contains("\"Crib\""));
    }

    #[test]
    fn test_owner_notification_requires_recipients() {
        let result = notifier().owner_notification(&RecipientList::default(), "Crib", Utc::now());
        assert!(matches!(result, Err(EmailError::NoRecipients)));
    }
}
