//! Database repositories
//!
//! One repository per aggregate. Each exposes an `async_trait` so services
//! can be tested against any implementation, and an `Sqlx*` implementation
//! over [`DynDatabasePool`](crate::db::DynDatabasePool).

pub mod blog;
pub mod comment;
pub mod contact;
pub mod portfolio;
pub mod site_config;
pub mod subscriber;

pub use blog::{BlogRepository, SqlxBlogRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use contact::{ContactMessageRepository, SqlxContactMessageRepository};
pub use portfolio::{PortfolioKind, PortfolioRepository, SqlxPortfolioRepository};
pub use site_config::{SiteConfigRepository, SqlxSiteConfigRepository};
pub use subscriber::{SqlxSubscriberRepository, SubscriberRepository};
