//! Comment repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{Comment, NewComment};
use crate::on_pool;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert an active comment
    async fn create(&self, input: &NewComment) -> Result<Comment>;

    async fn get(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments of a post in creation order
    async fn list_for_post(&self, post_id: i64, active_only: bool) -> Result<Vec<Comment>>;

    /// Returns `false` when no such comment exists
    async fn set_active(&self, id: i64, is_active: bool) -> Result<bool>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &NewComment) -> Result<Comment> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |p| {
            sqlx::query(
                r#"INSERT INTO comments (post_id, name, email, content, created_at, is_active)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
            )
            .bind(input.post_id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.content)
            .bind(now)
            .bind(true)
            .execute(p)
            .await?
            .inserted_id()
        });

        Ok(Comment {
            id,
            post_id: input.post_id,
            name: input.name.clone(),
            email: input.email.clone(),
            content: input.content.clone(),
            created_at: now,
            is_active: true,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Comment>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
                .bind(id)
                .fetch_optional(p)
                .await?
        }))
    }

    async fn list_for_post(&self, post_id: i64, active_only: bool) -> Result<Vec<Comment>> {
        let sql = if active_only {
            "SELECT * FROM comments WHERE post_id = ? AND is_active = 1 ORDER BY created_at, id"
        } else {
            "SELECT * FROM comments WHERE post_id = ? ORDER BY created_at, id"
        };
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Comment>(sql)
                .bind(post_id)
                .fetch_all(p)
                .await?
        }))
    }

    async fn set_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("UPDATE comments SET is_active = ? WHERE id = ?")
                .bind(is_active)
                .bind(id)
                .execute(p)
                .await?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{BlogRepository, SqlxBlogRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreatePostInput;

    #[tokio::test]
    async fn test_moderation_hides_comment() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let posts = SqlxBlogRepository::new(pool.clone());
        let repo = SqlxCommentRepository::new(pool);

        let post = posts
            .create_post(&CreatePostInput::new("T", "E", "C"), "t")
            .await
            .unwrap();
        let first = repo
            .create(&NewComment {
                post_id: post.id,
                name: "Ada".into(),
                email: "ada@example.com".into(),
                content: "First".into(),
            })
            .await
            .unwrap();
        repo.create(&NewComment {
            post_id: post.id,
            name: "Grace".into(),
            email: "grace@example.com".into(),
            content: "Second".into(),
        })
        .await
        .unwrap();

        assert!(first.is_active);
        assert!(repo.set_active(first.id, false).await.unwrap());

        let visible = repo.list_for_post(post.id, true).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].content, "Second");

        let all = repo.list_for_post(post.id, false).await.unwrap();
        assert_eq!(all[0].content, "First");
        assert!(!repo.get(first.id).await.unwrap().unwrap().is_active);
    }
}
