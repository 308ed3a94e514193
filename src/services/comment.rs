//! Comment service
//!
//! Visitor comments on published posts. New comments are visible right away;
//! moderation can hide them later.

use std::sync::Arc;

use crate::db::repositories::{BlogRepository, CommentRepository};
use crate::models::{BlogPost, Comment};
use crate::services::submission::{SubmissionError, SubmissionReceipt};
use crate::services::validation::CommentForm;

pub const COMMENT_SUCCESS_MESSAGE: &str = "Your comment has been posted successfully.";
pub const COMMENT_INVALID_MESSAGE: &str = "Please correct the errors in the comment form.";

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn BlogRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn BlogRepository>) -> Self {
        Self { comments, posts }
    }

    /// Add a comment to the published post with `slug`
    pub async fn submit(
        &self,
        slug: &str,
        form: &CommentForm,
    ) -> Result<SubmissionReceipt<Comment>, SubmissionError> {
        let post = self.published_post(slug).await?;
        let input = form.validate(post.id).map_err(|errors| {
            tracing::debug!(post_id = post.id, fields = %errors, "Comment rejected");
            errors
        })?;

        let comment = self.comments.create(&input).await?;
        tracing::info!(post_id = post.id, comment_id = comment.id, "Comment added");
        Ok(SubmissionReceipt::new(comment, COMMENT_SUCCESS_MESSAGE))
    }

    /// Visible comments of a post, oldest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, SubmissionError> {
        Ok(self.comments.list_for_post(post_id, true).await?)
    }

    /// Returns false when no comment has this id
    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<bool, SubmissionError> {
        let updated = self.comments.set_active(id, is_active).await?;
        if updated {
            tracing::info!(comment_id = id, is_active, "Comment moderated");
        }
        Ok(updated)
    }

    async fn published_post(&self, slug: &str) -> Result<BlogPost, SubmissionError> {
        match self.posts.get_post_by_slug(slug).await? {
            Some(post) if post.is_published => Ok(post),
            _ => Err(SubmissionError::NotFound(format!("Post '{}' not found", slug))),
        }
    }
}
