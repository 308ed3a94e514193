//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A visitor comment on a blog post. Deleted together with its post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Visible on the post; moderation can switch it off
    pub is_active: bool,
}

/// Validated fields of a new comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub content: String,
}
