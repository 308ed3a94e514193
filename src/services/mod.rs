//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - Validating visitor submissions
//! - Sending notification emails (best effort)
//! - Publishing domain events and reacting to them

pub mod blog;
pub mod broadcast;
pub mod comment;
pub mod contact;
pub mod events;
pub mod mail;
pub mod newsletter;
pub mod notification;
pub mod portfolio;
pub mod site_config;
pub mod submission;
pub mod validation;

pub use blog::{generate_slug, BlogService, BlogServiceError, PostDetail};
pub use broadcast::{BroadcastReport, NewArticleBroadcaster};
pub use comment::CommentService;
pub use contact::ContactService;
pub use events::{DomainEvent, EventBus, EventListener};
pub use mail::{build_transport, MailError, MailTransport, MemoryMailer, OutgoingEmail};
pub use newsletter::NewsletterService;
pub use notification::{DeliveryOutcome, NotificationDispatcher};
pub use portfolio::{PortfolioOverview, PortfolioSeed, PortfolioService, PortfolioServiceError};
pub use site_config::{SiteConfigError, SiteConfigService};
pub use submission::{SubmissionError, SubmissionReceipt};
pub use validation::{CommentForm, ContactForm, NewsletterForm, ValidationErrors};
