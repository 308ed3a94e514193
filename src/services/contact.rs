//! Contact form handling

use std::sync::Arc;
use tera::Context as TeraContext;

use crate::db::repositories::ContactMessageRepository;
use crate::models::ContactMessage;
use crate::services::notification::{NotificationDispatcher, CONTACT_RECEIVED_TEMPLATE};
use crate::services::submission::{SubmissionError, SubmissionReceipt};
use crate::services::validation::ContactForm;

pub const CONTACT_SUCCESS_MESSAGE: &str = "Your message has been sent successfully!";
pub const CONTACT_INVALID_MESSAGE: &str = "Please correct the errors in the contact form.";
pub const CONTACT_CONFIRMATION_SUBJECT: &str = "[Contact] We received your message";

pub struct ContactService {
    repo: Arc<dyn ContactMessageRepository>,
    notifier: Arc<NotificationDispatcher>,
}

impl ContactService {
    pub fn new(repo: Arc<dyn ContactMessageRepository>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { repo, notifier }
    }

    /// Validate and store the message, then mail a confirmation to the
    /// sender. The confirmation outcome never changes the reply.
    pub async fn submit(&self, form: &ContactForm) -> Result<SubmissionReceipt<ContactMessage>, SubmissionError> {
        let input = form.validate().map_err(|errors| {
            tracing::debug!(fields = %errors, "Contact form rejected");
            errors
        })?;

        let message = self.repo.create(&input).await?;
        tracing::info!(id = message.id, "Contact message stored");

        let mut context = TeraContext::new();
        context.insert("name", &message.name);
        context.insert("subject", &message.subject);
        context.insert("date", &message.created_at.format("%Y-%m-%d").to_string());
        context.insert("reference", &message.reference());

        let outcome = self
            .notifier
            .send(
                CONTACT_RECEIVED_TEMPLATE,
                &context,
                std::slice::from_ref(&message.email),
                CONTACT_CONFIRMATION_SUBJECT,
            )
            .await;

        Ok(SubmissionReceipt::new(message, CONTACT_SUCCESS_MESSAGE).with_notification(outcome))
    }

    pub async fn list(&self) -> Result<Vec<ContactMessage>, SubmissionError> {
        Ok(self.repo.list().await?)
    }
}
