//! Outgoing mail transports
//!
//! [`MailTransport`] is the seam between notifications and delivery. The
//! configured backend picks the implementation: SMTP through lettre, the
//! log, or an in-process outbox.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{MailBackend, MailConfig, MailSecurity};

const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

/// A fully rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    pub text_body: String,
    pub html_body: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to send message: {0}")]
    Transport(String),
}

/// Something that can deliver an [`OutgoingEmail`]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Build the transport selected by `config.backend`
pub fn build_transport(config: &MailConfig) -> Result<Arc<dyn MailTransport>, MailError> {
    Ok(match config.backend {
        MailBackend::Smtp => Arc::new(SmtpMailer::from_config(config)?),
        MailBackend::Console => Arc::new(ConsoleMailer),
        MailBackend::Memory => Arc::new(MemoryMailer::new()),
    })
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Convert into a lettre message, multipart when an HTML body is present
pub fn to_message(email: &OutgoingEmail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .subject(email.subject.clone());
    for recipient in &email.to {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    let message = match &email.html_body {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.text_body.clone()),
    };
    message.map_err(|e| MailError::Build(e.to_string()))
}

/// SMTP relay delivery
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let builder = match config.security {
            MailSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
            }
            MailSecurity::Ssl => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            MailSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let mut builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));
        if !config.username.trim().is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = to_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Writes each message to the log
pub struct ConsoleMailer;

#[async_trait]
impl MailTransport for ConsoleMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = to_message(email)?;
        tracing::info!(
            to = %email.to.join(", "),
            subject = %email.subject,
            "Outgoing email\n{}",
            String::from_utf8_lossy(&message.formatted())
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Keeps every message in memory
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub fn outbox(&self) -> Vec<OutgoingEmail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.clear();
        }
    }
}

#[async_trait]
impl MailTransport for MemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        to_message(email)?;
        self.outbox
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?
            .push(email.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
