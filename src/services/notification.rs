//! Notification dispatcher
//!
//! Renders an email template, derives the plain-text part and hands the
//! message to the mail transport. Delivery is best effort: every failure is
//! logged and reported back as a [`DeliveryOutcome`], never as an error, so
//! the action that triggered the email is not affected.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::services::mail::{MailTransport, OutgoingEmail};
use crate::services::site_config::SiteConfigService;
use crate::templates::TemplateEngine;

/// `site_url` used when no absolute URL is configured
pub const FALLBACK_SITE_URL: &str = "#";

pub const CONTACT_RECEIVED_TEMPLATE: &str = "portfolio/email/contact_received.html";
pub const WELCOME_NEWSLETTER_TEMPLATE: &str = "portfolio/email/welcome_newsletter.html";
pub const NEW_ARTICLE_TEMPLATE: &str = "portfolio/email/new_article_notify.html";

/// Result of one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }
}

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

static HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(head|style|script)\b.*?</(head|style|script)\s*>")
        .expect("head pattern is valid")
});

/// Plain-text rendering of an HTML body: markup removed, common entities
/// decoded, blank lines collapsed
pub fn html_to_text(html: &str) -> String {
    let without_head = HEAD.replace_all(html, "");
    let stripped = TAG.replace_all(&without_head, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&#x2F;", "/")
        .replace("&middot;", "·")
        .replace("&amp;", "&");

    let mut lines: Vec<&str> = Vec::new();
    for line in decoded.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Renders and sends templated emails
pub struct NotificationDispatcher {
    templates: Arc<TemplateEngine>,
    mailer: Arc<dyn MailTransport>,
    site_config: Arc<SiteConfigService>,
    site_url: Option<String>,
    from: String,
}

impl NotificationDispatcher {
    pub fn new(
        templates: Arc<TemplateEngine>,
        mailer: Arc<dyn MailTransport>,
        site_config: Arc<SiteConfigService>,
        site_url: Option<String>,
        from: String,
    ) -> Self {
        let site_url = site_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Self {
            templates,
            mailer,
            site_config,
            site_url,
            from,
        }
    }

    /// Absolute URL for a site-relative path, or the path itself when no
    /// site URL is configured
    pub fn absolute_url(&self, path: &str) -> String {
        match &self.site_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }

    /// `site_name` and `site_url`, with their fallbacks
    pub async fn site_context(&self) -> TeraContext {
        let mut ctx = TeraContext::new();
        ctx.insert("site_name", &self.site_config.site_name().await);
        ctx.insert(
            "site_url",
            self.site_url.as_deref().unwrap_or(FALLBACK_SITE_URL),
        );
        ctx
    }

    /// Render `template` with the site context plus `context` and send it to
    /// each of `recipients` in one message
    pub async fn send(
        &self,
        template: &str,
        context: &TeraContext,
        recipients: &[String],
        subject: &str,
    ) -> DeliveryOutcome {
        let mut full_context = self.site_context().await;
        full_context.extend(context.clone());
        self.send_rendered(template, &full_context, recipients, subject)
            .await
    }

    /// Like [`send`](Self::send) but with a context that already carries the
    /// site fields, so a broadcast loads them once
    pub async fn send_rendered(
        &self,
        template: &str,
        context: &TeraContext,
        recipients: &[String],
        subject: &str,
    ) -> DeliveryOutcome {
        let html = match self.templates.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(template, error = %e, "Failed to render email");
                return DeliveryOutcome::Failed(e.to_string());
            }
        };

        let email = OutgoingEmail {
            subject: subject.to_string(),
            from: self.from.clone(),
            to: recipients.to_vec(),
            text_body: html_to_text(&html),
            html_body: Some(html),
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                tracing::debug!(
                    to = %recipients.join(", "),
                    subject,
                    transport = self.mailer.name(),
                    "Email sent"
                );
                DeliveryOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(
                    to = %recipients.join(", "),
                    subject,
                    error = %e,
                    "Email delivery failed"
                );
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSiteConfigRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::services::mail::testing::FailingMailer;
    use crate::services::mail::MemoryMailer;

    async fn site_config() -> Arc<SiteConfigService> {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        Arc::new(SiteConfigService::new(SqlxSiteConfigRepository::boxed(pool)))
    }

    fn dispatcher(
        mailer: Arc<dyn MailTransport>,
        site_config: Arc<SiteConfigService>,
        site_url: Option<&str>,
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(
            Arc::new(TemplateEngine::builtin().unwrap()),
            mailer,
            site_config,
            site_url.map(str::to_string),
            "noreply@example.com".to_string(),
        )
    }

    #[test]
    fn test_html_to_text() {
        let html = "<html><head><title>x</title><style>p{}</style></head><body>\n<p>Hi Ada &amp; co,</p>\n\n\n<p>It&#x27;s <b>here</b>.</p>\n</body></html>";
        assert_eq!(html_to_text(html), "Hi Ada & co,\n\nIt's here.");
    }

    #[tokio::test]
    async fn test_send_merges_site_context() {
        let outbox = Arc::new(MemoryMailer::new());
        let dispatcher = dispatcher(outbox.clone(), site_config().await, None);

        let mut ctx = TeraContext::new();
        ctx.insert("email", "ada@example.com");
        let outcome = dispatcher
            .send(
                WELCOME_NEWSLETTER_TEMPLATE,
                &ctx,
                &["ada@example.com".to_string()],
                "[Newsletter] Welcome!",
            )
            .await;

        assert!(outcome.is_sent());
        let sent = outbox.outbox();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ada@example.com"]);
        assert_eq!(sent[0].from, "noreply@example.com");
        assert!(sent[0].text_body.contains("Shekhar's Portfolio"));
        assert!(sent[0].html_body.as_deref().unwrap().contains("href=\"#\""));
        assert!(!sent[0].text_body.contains('<'));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported_not_raised() {
        let failing = Arc::new(FailingMailer::new(
            Arc::new(MemoryMailer::new()),
            &["ada@example.com"],
        ));
        let dispatcher = dispatcher(failing.clone(), site_config().await, None);

        let outcome = dispatcher
            .send(
                WELCOME_NEWSLETTER_TEMPLATE,
                &TeraContext::from_serialize(serde_json::json!({"email": "ada@example.com"})).unwrap(),
                &["ada@example.com".to_string()],
                "[Newsletter] Welcome!",
            )
            .await;

        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
        assert_eq!(failing.attempts(), vec!["ada@example.com"]);
    }

    #[tokio::test]
    async fn test_render_failure_is_reported() {
        let outbox = Arc::new(MemoryMailer::new());
        let dispatcher = dispatcher(outbox.clone(), site_config().await, None);

        let outcome = dispatcher
            .send("portfolio/email/missing.html", &TeraContext::new(), &["a@example.com".into()], "x")
            .await;

        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
        assert!(outbox.outbox().is_empty());
    }

    #[tokio::test]
    async fn test_absolute_url() {
        let outbox = Arc::new(MemoryMailer::new());
        let with_base = dispatcher(outbox.clone(), site_config().await, Some("https://example.com/"));
        assert_eq!(with_base.absolute_url("/blog/a/"), "https://example.com/blog/a/");

        let without = dispatcher(outbox, site_config().await, Some("  "));
        assert_eq!(without.absolute_url("/blog/a/"), "/blog/a/");
        assert_eq!(
            without.site_context().await.get("site_url"),
            Some(&serde_json::json!("#"))
        );
    }
}
