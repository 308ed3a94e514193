//! Newsletter signup
//!
//! An address can subscribe once. Repeating a signup fails validation even
//! when the earlier subscription was deactivated; reactivation is left to an
//! administrator.

use std::sync::Arc;
use tera::Context as TeraContext;

use crate::db::is_unique_violation;
use crate::db::repositories::SubscriberRepository;
use crate::models::NewsletterSubscriber;
use crate::services::notification::{DeliveryOutcome, NotificationDispatcher, WELCOME_NEWSLETTER_TEMPLATE};
use crate::services::submission::{SubmissionError, SubmissionReceipt};
use crate::services::validation::{NewsletterForm, ValidationErrors, DUPLICATE_SUBSCRIBER_MESSAGE};

pub const NEWSLETTER_SUCCESS_MESSAGE: &str =
    "Thanks for subscribing! Check your email for a confirmation.";
pub const NEWSLETTER_DEGRADED_MESSAGE: &str =
    "Subscribed successfully, but failed to send welcome email.";
pub const NEWSLETTER_INVALID_MESSAGE: &str = "Invalid email or already subscribed.";
pub const WELCOME_SUBJECT: &str = "[Newsletter] Welcome!";

pub struct NewsletterService {
    repo: Arc<dyn SubscriberRepository>,
    notifier: Arc<NotificationDispatcher>,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn SubscriberRepository>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { repo, notifier }
    }

    pub async fn subscribe(
        &self,
        form: &NewsletterForm,
    ) -> Result<SubmissionReceipt<NewsletterSubscriber>, SubmissionError> {
        let email = form.validate()?;

        if self.repo.find_by_email(&email).await?.is_some() {
            tracing::debug!("Newsletter signup rejected: already subscribed");
            return Err(duplicate().into());
        }

        // A concurrent signup for the same address can still win the race.
        let subscriber = match self.repo.create(&email).await {
            Ok(subscriber) => subscriber,
            Err(e) if is_unique_violation(&e) => return Err(duplicate().into()),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(id = subscriber.id, "Newsletter subscriber added");

        let mut context = TeraContext::new();
        context.insert("email", &subscriber.email);
        let outcome = self
            .notifier
            .send(
                WELCOME_NEWSLETTER_TEMPLATE,
                &context,
                std::slice::from_ref(&subscriber.email),
                WELCOME_SUBJECT,
            )
            .await;

        let message = match outcome {
            DeliveryOutcome::Sent => NEWSLETTER_SUCCESS_MESSAGE,
            DeliveryOutcome::Failed(_) => NEWSLETTER_DEGRADED_MESSAGE,
        };
        Ok(SubmissionReceipt::new(subscriber, message).with_notification(outcome))
    }

    pub async fn list(&self) -> Result<Vec<NewsletterSubscriber>, SubmissionError> {
        Ok(self.repo.list().await?)
    }

    /// Returns false when no subscriber has this id
    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<bool, SubmissionError> {
        Ok(self.repo.set_active(id, is_active).await?)
    }
}

fn duplicate() -> ValidationErrors {
    ValidationErrors::single("email", DUPLICATE_SUBSCRIBER_MESSAGE)
}
