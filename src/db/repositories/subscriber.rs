//! Newsletter subscriber repository
//!
//! Email uniqueness is enforced by the schema without regard to case, so a
//! racing duplicate insert fails with a unique violation rather than
//! creating a second row.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::NewsletterSubscriber;
use crate::on_pool;

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Insert an active subscriber. Fails on a duplicate email.
    async fn create(&self, email: &str) -> Result<NewsletterSubscriber>;

    /// Case-insensitive lookup, active or not
    async fn find_by_email(&self, email: &str) -> Result<Option<NewsletterSubscriber>>;

    async fn list_active(&self) -> Result<Vec<NewsletterSubscriber>>;

    /// Everyone, newest first
    async fn list(&self) -> Result<Vec<NewsletterSubscriber>>;

    /// Returns `false` when no such subscriber exists
    async fn set_active(&self, id: i64, is_active: bool) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxSubscriberRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriberRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriberRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriberRepository for SqlxSubscriberRepository {
    async fn create(&self, email: &str) -> Result<NewsletterSubscriber> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                "INSERT INTO newsletter_subscribers (email, subscribed_at, is_active) VALUES (?, ?, ?)",
            )
            .bind(email)
            .bind(now)
            .bind(true)
            .execute(p)
            .await?
            .inserted_id()
        });

        Ok(NewsletterSubscriber {
            id,
            email: email.to_string(),
            subscribed_at: now,
            is_active: true,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<NewsletterSubscriber>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, NewsletterSubscriber>(
                "SELECT * FROM newsletter_subscribers WHERE LOWER(email) = LOWER(?)",
            )
            .bind(email)
            .fetch_optional(p)
            .await?
        }))
    }

    async fn list_active(&self) -> Result<Vec<NewsletterSubscriber>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, NewsletterSubscriber>(
                "SELECT * FROM newsletter_subscribers WHERE is_active = ? ORDER BY id",
            )
            .bind(true)
            .fetch_all(p)
            .await?
        }))
    }

    async fn list(&self) -> Result<Vec<NewsletterSubscriber>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, NewsletterSubscriber>(
                "SELECT * FROM newsletter_subscribers ORDER BY subscribed_at DESC, id DESC",
            )
            .fetch_all(p)
            .await?
        }))
    }

    async fn set_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("UPDATE newsletter_subscribers SET is_active = ? WHERE id = ?")
                .bind(is_active)
                .bind(id)
                .execute(p)
                .await?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM newsletter_subscribers")
                .fetch_one(p)
                .await?
        }))
    }
}
