//! Contact message repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{ContactMessage, NewContactMessage};
use crate::on_pool;

#[async_trait]
pub trait ContactMessageRepository: Send + Sync {
    async fn create(&self, input: &NewContactMessage) -> Result<ContactMessage>;

    /// Newest first
    async fn list(&self) -> Result<Vec<ContactMessage>>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxContactMessageRepository {
    pool: DynDatabasePool,
}

impl SqlxContactMessageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactMessageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactMessageRepository for SqlxContactMessageRepository {
    async fn create(&self, input: &NewContactMessage) -> Result<ContactMessage> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"INSERT INTO contact_messages (name, email, subject, message, created_at)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.subject)
            .bind(&input.message)
            .bind(now)
            .execute(p)
            .await?
            .inserted_id()
        });

        Ok(ContactMessage {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            subject: input.subject.clone(),
            message: input.message.clone(),
            created_at: now,
        })
    }

    async fn list(&self) -> Result<Vec<ContactMessage>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, ContactMessage>(
                "SELECT * FROM contact_messages ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(p)
            .await?
        }))
    }

    async fn count(&self) -> Result<i64> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contact_messages")
                .fetch_one(p)
                .await?
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_create_and_list() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let repo = SqlxContactMessageRepository::new(pool);

        let created = repo
            .create(&NewContactMessage {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                subject: "Hi".into(),
                message: "Hello".into(),
            })
            .await
            .unwrap();

        assert!(created.id > 0);
        assert_eq!(repo.count().await.unwrap(), 1);
        let listed = repo.list().await.unwrap();
        assert_eq!(listed[0].subject, "Hi");
        assert_eq!(listed[0].id, created.id);
    }
}
