//! Shared result types for visitor submissions (contact, newsletter, comment)

use crate::services::notification::DeliveryOutcome;
use crate::services::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Field-level problems; nothing was stored
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The submission targets something that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for SubmissionError {
    fn from(errors: ValidationErrors) -> Self {
        SubmissionError::Validation(errors)
    }
}

/// What the visitor is told after a stored submission
#[derive(Debug, Clone)]
pub struct SubmissionReceipt<T> {
    pub record: T,
    pub message: String,
    /// Outcome of the email sent alongside, when there is one
    pub notification: Option<DeliveryOutcome>,
}

impl<T> SubmissionReceipt<T> {
    pub fn new(record: T, message: impl Into<String>) -> Self {
        Self {
            record,
            message: message.into(),
            notification: None,
        }
    }

    pub fn with_notification(mut self, outcome: DeliveryOutcome) -> Self {
        self.notification = Some(outcome);
        self
    }

    /// Stored, but the accompanying email could not be sent
    pub fn is_degraded(&self) -> bool {
        matches!(self.notification, Some(DeliveryOutcome::Failed(_)))
    }
}
