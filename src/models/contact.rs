//! Visitor submissions: contact messages and newsletter subscribers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message sent through the contact form. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    /// Reference quoted back to the sender, e.g. `CM-42`
    pub fn reference(&self) -> String {
        format!("CM-{}", self.id)
    }
}

/// Validated fields of a new contact message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Newsletter subscription. The email is unique; only an administrator
/// toggles `is_active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsletterSubscriber {
    pub id: i64,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_uses_id() {
        let message = ContactMessage {
            id: 42,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            subject: "Hi".into(),
            message: "Hello".into(),
            created_at: Utc::now(),
        };
        assert_eq!(message.reference(), "CM-42");
    }
}
