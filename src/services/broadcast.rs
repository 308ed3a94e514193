//! New-article broadcast
//!
//! Listens for [`DomainEvent::PostCreated`] and mails every active newsletter
//! subscriber when the new post is published. Recipients are handled one at a
//! time; a failed send is logged and the loop moves on.

use async_trait::async_trait;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::db::repositories::SubscriberRepository;
use crate::models::BlogPost;
use crate::services::events::{DomainEvent, EventListener};
use crate::services::notification::{NotificationDispatcher, NEW_ARTICLE_TEMPLATE};

/// Excerpt length in the notification, in characters
pub const EXCERPT_CHARS: usize = 200;

/// Summary of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
}

pub struct NewArticleBroadcaster {
    subscribers: Arc<dyn SubscriberRepository>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl NewArticleBroadcaster {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            subscribers,
            dispatcher,
        }
    }

    pub fn subject_for(post: &BlogPost) -> String {
        format!("[Blog] New article: {}", post.title)
    }

    /// Send the new-article email for `post` to each active subscriber.
    /// Unpublished posts are skipped.
    pub async fn broadcast(&self, post: &BlogPost) -> anyhow::Result<BroadcastReport> {
        if !post.is_published {
            tracing::debug!(post_id = post.id, "Post not published, no broadcast");
            return Ok(BroadcastReport::default());
        }

        let subscribers = self.subscribers.list_active().await?;
        if subscribers.is_empty() {
            return Ok(BroadcastReport::default());
        }

        let mut context = self.dispatcher.site_context().await;
        context.extend(article_context(
            post,
            &self.dispatcher.absolute_url(&post.absolute_path()),
        ));
        let subject = Self::subject_for(post);

        let mut report = BroadcastReport::default();
        for subscriber in &subscribers {
            report.attempted += 1;
            let outcome = self
                .dispatcher
                .send_rendered(
                    NEW_ARTICLE_TEMPLATE,
                    &context,
                    std::slice::from_ref(&subscriber.email),
                    &subject,
                )
                .await;
            if outcome.is_sent() {
                report.delivered += 1;
            }
        }

        tracing::info!(
            post_id = post.id,
            attempted = report.attempted,
            delivered = report.delivered,
            "New article broadcast finished"
        );
        Ok(report)
    }
}

fn article_context(post: &BlogPost, post_url: &str) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("post_title", &post.title);
    context.insert("post_excerpt", &truncate_chars(&post.excerpt, EXCERPT_CHARS));
    context.insert("post_url", post_url);
    context
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[async_trait]
impl EventListener for NewArticleBroadcaster {
    fn name(&self) -> &'static str {
        "new_article_broadcast"
    }

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        match event {
            DomainEvent::PostCreated { post } => {
                self.broadcast(post).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSiteConfigRepository, SqlxSubscriberRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::services::mail::testing::FailingMailer;
    use crate::services::mail::{MailTransport, MemoryMailer};
    use crate::services::site_config::SiteConfigService;
    use crate::templates::TemplateEngine;
    use chrono::Utc;

    async fn pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    fn broadcaster(pool: &DynDatabasePool, mailer: Arc<dyn MailTransport>) -> NewArticleBroadcaster {
        let dispatcher = NotificationDispatcher::new(
            Arc::new(TemplateEngine::builtin().unwrap()),
            mailer,
            Arc::new(SiteConfigService::new(SqlxSiteConfigRepository::boxed(pool.clone()))),
            Some("https://example.com".to_string()),
            "noreply@example.com".to_string(),
        );
        NewArticleBroadcaster::new(SqlxSubscriberRepository::boxed(pool.clone()), Arc::new(dispatcher))
    }

    fn post(is_published: bool) -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: 7,
            title: "Scaling Celery".into(),
            slug: "scaling-celery".into(),
            excerpt: "x".repeat(250),
            content: "<p>Body</p>".into(),
            cover_image: None,
            category_id: None,
            is_published,
            meta_title: String::new(),
            meta_description: String::new(),
            meta_keywords: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_other_recipients() {
        let pool = pool().await;
        let subscribers = SqlxSubscriberRepository::new(pool.clone());
        subscribers.create("bad@example.com").await.unwrap();
        subscribers.create("good@example.com").await.unwrap();

        let outbox = Arc::new(MemoryMailer::new());
        let failing = Arc::new(FailingMailer::new(outbox.clone(), &["bad@example.com"]));
        let report = broadcaster(&pool, failing.clone()).broadcast(&post(true)).await.unwrap();

        assert_eq!(report, BroadcastReport { attempted: 2, delivered: 1 });
        assert_eq!(failing.attempts().len(), 2);
        let sent = outbox.outbox();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["good@example.com"]);
        assert_eq!(sent[0].subject, "[Blog] New article: Scaling Celery");
        let html = sent[0].html_body.as_deref().unwrap();
        assert!(html.contains("https://example.com/blog/scaling-celery/"));
        assert!(html.contains(&"x".repeat(EXCERPT_CHARS)));
        assert!(!html.contains(&"x".repeat(EXCERPT_CHARS + 1)));
    }

    #[tokio::test]
    async fn test_inactive_subscribers_and_drafts_are_skipped() {
        let pool = pool().await;
        let subscribers = SqlxSubscriberRepository::new(pool.clone());
        let off = subscribers.create("off@example.com").await.unwrap();
        subscribers.set_active(off.id, false).await.unwrap();

        let outbox = Arc::new(MemoryMailer::new());
        let broadcaster = broadcaster(&pool, outbox.clone());

        let report = broadcaster.broadcast(&post(true)).await.unwrap();
        assert_eq!(report.attempted, 0);

        subscribers.create("on@example.com").await.unwrap();
        let report = broadcaster.broadcast(&post(false)).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert!(outbox.outbox().is_empty());
    }
}
