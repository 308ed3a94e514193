//! Blog service
//!
//! Post, category and tag management plus the public listing and detail
//! lookups. Creating a post publishes [`DomainEvent::PostCreated`] once the
//! row exists; updates publish nothing.

use std::collections::HashSet;
use std::sync::Arc;

use crate::db::is_unique_violation;
use crate::db::repositories::BlogRepository;
use crate::models::{
    BlogPost, Category, CreatePostInput, ListParams, PagedResult, PostFilter, Tag, TaxonomyInput,
    UpdatePostInput,
};
use crate::services::events::{DomainEvent, EventBus};

/// Posts shown in the index page's "recent" section
pub const RECENT_POSTS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum BlogServiceError {
    #[error("Post not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slug already in use: {0}")]
    SlugConflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A published post with what its detail page shows next to it
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: BlogPost,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl PostDetail {
    pub fn seo_keywords(&self) -> String {
        self.post.seo_keywords(self.category.as_ref(), &self.tags)
    }
}

pub struct BlogService {
    repo: Arc<dyn BlogRepository>,
    events: Arc<EventBus>,
}

impl BlogService {
    pub fn new(repo: Arc<dyn BlogRepository>, events: Arc<EventBus>) -> Self {
        Self { repo, events }
    }

    /// Create a post. A missing slug is derived from the title and made
    /// unique with a numeric suffix; an explicit slug must be free.
    pub async fn create_post(&self, input: CreatePostInput) -> Result<BlogPost, BlogServiceError> {
        if input.title.trim().is_empty() {
            return Err(BlogServiceError::ValidationError("Title cannot be empty".to_string()));
        }

        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => {
                let slug = generate_slug(explicit);
                if slug.is_empty() {
                    return Err(BlogServiceError::ValidationError("Invalid slug".to_string()));
                }
                if self.repo.slug_exists(&slug).await? {
                    return Err(BlogServiceError::SlugConflict(slug));
                }
                slug
            }
            None => self.unique_slug(&input.title).await?,
        };
        self.check_references(input.category_id, &input.tag_ids).await?;

        let post = self
            .repo
            .create_post(&input, &slug)
            .await
            .map_err(|e| slug_error(e, &slug))?;
        tracing::info!(post_id = post.id, slug = %post.slug, published = post.is_published, "Post created");

        self.events
            .publish(DomainEvent::PostCreated { post: post.clone() })
            .await;
        Ok(post)
    }

    pub async fn update_post(&self, id: i64, input: UpdatePostInput) -> Result<BlogPost, BlogServiceError> {
        let mut post = self.repo.get_post(id).await?.ok_or(BlogServiceError::NotFound)?;

        let mut input = input;
        if let Some(slug) = input.slug.take() {
            let slug = generate_slug(&slug);
            if slug.is_empty() {
                return Err(BlogServiceError::ValidationError("Invalid slug".to_string()));
            }
            if slug != post.slug && self.repo.slug_exists(&slug).await? {
                return Err(BlogServiceError::SlugConflict(slug));
            }
            input.slug = Some(slug);
        }
        if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(BlogServiceError::ValidationError("Title cannot be empty".to_string()));
        }

        let new_category = input.category_id.flatten();
        self.check_references(new_category, input.tag_ids.as_deref().unwrap_or_default())
            .await?;

        input.apply_to(&mut post);
        let updated = self
            .repo
            .update_post(&post, input.tag_ids.as_deref())
            .await
            .map_err(|e| slug_error(e, &post.slug))?;
        tracing::info!(post_id = id, "Post updated");
        Ok(updated)
    }

    /// Delete a post and, through the foreign key, its comments
    pub async fn delete_post(&self, id: i64) -> Result<(), BlogServiceError> {
        if !self.repo.delete_post(id).await? {
            return Err(BlogServiceError::NotFound);
        }
        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }

    /// Published post by slug; drafts are reported as not found
    pub async fn published_detail(&self, slug: &str) -> Result<PostDetail, BlogServiceError> {
        let post = self
            .repo
            .get_post_by_slug(slug)
            .await?
            .filter(|p| p.is_published)
            .ok_or(BlogServiceError::NotFound)?;

        let category = match post.category_id {
            Some(id) => self.repo.get_category(id).await?,
            None => None,
        };
        let tags = self.repo.tags_for_post(post.id).await?;
        Ok(PostDetail { post, category, tags })
    }

    pub async fn list_published(
        &self,
        filter: PostFilter,
        params: ListParams,
    ) -> Result<PagedResult<BlogPost>, BlogServiceError> {
        Ok(self.repo.list_published(&filter.normalized(), &params).await?)
    }

    pub async fn recent_posts(&self) -> Result<Vec<BlogPost>, BlogServiceError> {
        let page = self
            .repo
            .list_published(&PostFilter::default(), &ListParams::new(1, RECENT_POSTS))
            .await?;
        Ok(page.items)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, BlogServiceError> {
        Ok(self.repo.list_categories().await?)
    }

    /// Tags attached to at least one published post
    pub async fn list_tags_in_use(&self) -> Result<Vec<Tag>, BlogServiceError> {
        Ok(self.repo.list_tags_in_use().await?)
    }

    pub async fn create_category(&self, input: TaxonomyInput) -> Result<Category, BlogServiceError> {
        let (name, slug) = taxonomy_fields(&input)?;
        self.repo
            .create_category(&name, &slug)
            .await
            .map_err(|e| slug_error(e, &slug))
    }

    /// Delete a category; its posts stay, without a category
    pub async fn delete_category(&self, id: i64) -> Result<(), BlogServiceError> {
        if !self.repo.delete_category(id).await? {
            return Err(BlogServiceError::NotFound);
        }
        Ok(())
    }

    pub async fn create_tag(&self, input: TaxonomyInput) -> Result<Tag, BlogServiceError> {
        let (name, slug) = taxonomy_fields(&input)?;
        self.repo
            .create_tag(&name, &slug)
            .await
            .map_err(|e| slug_error(e, &slug))
    }

    /// Reject a category or tag id that does not exist before anything is written
    async fn check_references(&self, category_id: Option<i64>, tag_ids: &[i64]) -> Result<(), BlogServiceError> {
        if let Some(id) = category_id {
            if self.repo.get_category(id).await?.is_none() {
                return Err(BlogServiceError::ValidationError(format!("Unknown category: {}", id)));
            }
        }
        if !tag_ids.is_empty() {
            let known: HashSet<i64> = self.repo.list_tags().await?.into_iter().map(|t| t.id).collect();
            if let Some(missing) = tag_ids.iter().find(|id| !known.contains(*id)) {
                return Err(BlogServiceError::ValidationError(format!("Unknown tag: {}", missing)));
            }
        }
        Ok(())
    }

    async fn unique_slug(&self, title: &str) -> Result<String, BlogServiceError> {
        let base = match generate_slug(title) {
            s if s.is_empty() => "post".to_string(),
            s => s,
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.repo.slug_exists(&candidate).await? {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }
}

fn taxonomy_fields(input: &TaxonomyInput) -> Result<(String, String), BlogServiceError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(BlogServiceError::ValidationError("Name cannot be empty".to_string()));
    }
    let slug = generate_slug(input.slug.as_deref().unwrap_or(name));
    if slug.is_empty() {
        return Err(BlogServiceError::ValidationError("Invalid slug".to_string()));
    }
    Ok((name.to_string(), slug))
}

fn slug_error(e: anyhow::Error, slug: &str) -> BlogServiceError {
    if is_unique_violation(&e) {
        BlogServiceError::SlugConflict(slug.to_string())
    } else {
        BlogServiceError::InternalError(e)
    }
}

/// URL slug from free text: lowercase ASCII letters and digits, everything
/// else collapsed into single hyphens
pub fn generate_slug(text: &str) -> String {
    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen && !result.is_empty() {
            result.push('-');
            prev_hyphen = true;
        }
    }

    result.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxBlogRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::services::events::EventListener;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CreatedPosts(Mutex<Vec<String>>);

    #[async_trait]
    impl EventListener for CreatedPosts {
        fn name(&self) -> &'static str {
            "created_posts"
        }

        async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
            let DomainEvent::PostCreated { post } = event;
            self.0.lock().unwrap().push(post.slug.clone());
            Ok(())
        }
    }

    async fn setup() -> (BlogService, Arc<CreatedPosts>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let recorder = Arc::new(CreatedPosts::default());
        let mut bus = EventBus::new();
        bus.subscribe(recorder.clone());
        (BlogService::new(SqlxBlogRepository::boxed(pool), Arc::new(bus)), recorder)
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  RPA: bots & Python 3!  "), "rpa-bots-python-3");
        assert_eq!(generate_slug("Café au lait"), "caf-au-lait");
        assert_eq!(generate_slug("---"), "");
    }

    #[tokio::test]
    async fn test_generated_slugs_are_unique() {
        let (service, _) = setup().await;
        let a = service.create_post(CreatePostInput::new("Hello World", "", "")).await.unwrap();
        let b = service.create_post(CreatePostInput::new("Hello, world!", "", "")).await.unwrap();
        let c = service.create_post(CreatePostInput::new("!!!", "", "")).await.unwrap();
        assert_eq!(a.slug, "hello-world");
        assert_eq!(b.slug, "hello-world-2");
        assert_eq!(c.slug, "post");
    }

    #[tokio::test]
    async fn test_explicit_slug_conflict() {
        let (service, _) = setup().await;
        service
            .create_post(CreatePostInput::new("One", "", "").with_slug("my-post"))
            .await
            .unwrap();
        let err = service
            .create_post(CreatePostInput::new("Two", "", "").with_slug("my-post"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlogServiceError::SlugConflict(_)));
    }

    #[tokio::test]
    async fn test_created_event_fires_once_and_never_on_update() {
        let (service, created) = setup().await;
        let draft = service
            .create_post(CreatePostInput::new("Draft", "", "").published(false))
            .await
            .unwrap();
        service
            .update_post(draft.id, UpdatePostInput::published(true))
            .await
            .unwrap();

        assert_eq!(*created.0.lock().unwrap(), vec!["draft"]);
    }

    #[tokio::test]
    async fn test_published_detail_hides_drafts() {
        let (service, _) = setup().await;
        let category = service
            .create_category(TaxonomyInput { name: "Backend".into(), slug: None })
            .await
            .unwrap();
        let tag = service
            .create_tag(TaxonomyInput { name: "Python".into(), slug: None })
            .await
            .unwrap();
        let mut input = CreatePostInput::new("Scaling Celery", "Queues", "<p>Body</p>");
        input.category_id = Some(category.id);
        input.tag_ids = vec![tag.id];
        service.create_post(input).await.unwrap();
        service
            .create_post(CreatePostInput::new("Hidden", "", "").published(false))
            .await
            .unwrap();

        let detail = service.published_detail("scaling-celery").await.unwrap();
        assert_eq!(detail.category.unwrap().slug, "backend");
        assert_eq!(detail.tags.len(), 1);
        assert!(matches!(
            service.published_detail("hidden").await,
            Err(BlogServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_changes_tags_and_slug() {
        let (service, _) = setup().await;
        let tag = service
            .create_tag(TaxonomyInput { name: "Rust".into(), slug: None })
            .await
            .unwrap();
        let post = service.create_post(CreatePostInput::new("Old", "", "")).await.unwrap();

        let update = UpdatePostInput {
            slug: Some("New Slug".into()),
            tag_ids: Some(vec![tag.id]),
            ..Default::default()
        };
        let updated = service.update_post(post.id, update).await.unwrap();
        assert_eq!(updated.slug, "new-slug");
        let detail = service.published_detail("new-slug").await.unwrap();
        assert_eq!(detail.tags[0].name, "Rust");

        assert!(matches!(
            service.update_post(9999, UpdatePostInput::default()).await,
            Err(BlogServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_recent_posts_limited() {
        let (service, _) = setup().await;
        for i in 0..5 {
            service
                .create_post(CreatePostInput::new(format!("Post {}", i), "", ""))
                .await
                .unwrap();
        }
        assert_eq!(service.recent_posts().await.unwrap().len(), RECENT_POSTS as usize);
    }

    #[tokio::test]
    async fn test_unknown_tag_stores_nothing_and_fires_nothing() {
        let (service, created) = setup().await;
        let mut input = CreatePostInput::new("Launch", "We are live", "");
        input.tag_ids = vec![999];

        let err = service.create_post(input).await.unwrap_err();
        assert!(matches!(err, BlogServiceError::ValidationError(_)));
        assert!(matches!(
            service.published_detail("launch").await,
            Err(BlogServiceError::NotFound)
        ));
        assert!(created.0.lock().unwrap().is_empty());

        let mut input = CreatePostInput::new("Launch", "", "");
        input.category_id = Some(42);
        assert!(matches!(
            service.create_post(input).await,
            Err(BlogServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_with_unknown_tag_changes_nothing() {
        let (service, _) = setup().await;
        let post = service.create_post(CreatePostInput::new("Old", "", "")).await.unwrap();

        let update = UpdatePostInput {
            title: Some("New".into()),
            tag_ids: Some(vec![999]),
            ..Default::default()
        };
        assert!(matches!(
            service.update_post(post.id, update).await,
            Err(BlogServiceError::ValidationError(_))
        ));
        assert_eq!(service.published_detail("old").await.unwrap().post.title, "Old");
    }
}
