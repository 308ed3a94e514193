//! Blog models
//!
//! This module provides:
//! - `BlogPost` with its SEO fallbacks
//! - `Category` and `Tag`
//! - Input types for creating and updating posts
//! - `PostFilter`, `ListParams` and `PagedResult` for the public listing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Posts per page on the public listing
pub const POSTS_PER_PAGE: u32 = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Name plus optional slug; the slug is derived from the name when missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Blog post entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    /// Unique, URL-friendly identifier
    pub slug: String,
    /// Short description for the card view
    pub excerpt: String,
    /// Rich HTML content
    pub content: String,
    pub cover_image: Option<String>,
    /// Cleared when the category is deleted
    pub category_id: Option<i64>,
    pub is_published: bool,
    /// SEO override, blank means "use the title"
    pub meta_title: String,
    /// SEO override, blank means "use the excerpt"
    pub meta_description: String,
    /// SEO override, blank means "category and tag names"
    pub meta_keywords: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    /// Site-relative URL of the detail page
    pub fn absolute_path(&self) -> String {
        post_path(&self.slug)
    }

    pub fn seo_title(&self) -> &str {
        non_blank(&self.meta_title).unwrap_or(&self.title)
    }

    pub fn seo_description(&self) -> &str {
        non_blank(&self.meta_description).unwrap_or(&self.excerpt)
    }

    /// `meta_keywords`, or the category name followed by tag names
    pub fn seo_keywords(&self, category: Option<&Category>, tags: &[Tag]) -> String {
        if let Some(keywords) = non_blank(&self.meta_keywords) {
            return keywords.to_string();
        }
        category
            .map(|c| c.name.as_str())
            .into_iter()
            .chain(tags.iter().map(|t| t.name.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Site-relative URL of a post
pub fn post_path(slug: &str) -> String {
    format!("/blog/{}/", slug)
}

fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn default_published() -> bool {
    true
}

/// Fields for a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    #[serde(default)]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub meta_keywords: String,
}

impl CreatePostInput {
    pub fn new(title: impl Into<String>, excerpt: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: None,
            excerpt: excerpt.into(),
            content: content.into(),
            cover_image: None,
            category_id: None,
            tag_ids: Vec::new(),
            is_published: true,
            meta_title: String::new(),
            meta_description: String::new(),
            meta_keywords: String::new(),
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn published(mut self, is_published: bool) -> Self {
        self.is_published = is_published;
        self
    }
}

/// Partial update; `None` leaves a field untouched.
///
/// `category_id: Some(None)` clears the category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    #[serde(default, with = "double_option")]
    pub cover_image: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub category_id: Option<Option<i64>>,
    pub tag_ids: Option<Vec<i64>>,
    pub is_published: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
}

impl UpdatePostInput {
    pub fn published(is_published: bool) -> Self {
        Self {
            is_published: Some(is_published),
            ..Default::default()
        }
    }

    /// Apply the present fields onto `post`
    pub fn apply_to(&self, post: &mut BlogPost) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            post.slug = slug.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            post.excerpt = excerpt.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(cover_image) = &self.cover_image {
            post.cover_image = cover_image.clone();
        }
        if let Some(category_id) = self.category_id {
            post.category_id = category_id;
        }
        if let Some(is_published) = self.is_published {
            post.is_published = is_published;
        }
        if let Some(meta_title) = &self.meta_title {
            post.meta_title = meta_title.clone();
        }
        if let Some(meta_description) = &self.meta_description {
            post.meta_description = meta_description.clone();
        }
        if let Some(meta_keywords) = &self.meta_keywords {
            post.meta_keywords = meta_keywords.clone();
        }
    }
}

/// Distinguishes an absent field from an explicit `null`
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(
        value: &Option<Option<T>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<T>>, D::Error> {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Public listing filters, as they arrive in the query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostFilter {
    /// Case-insensitive substring of title, excerpt or content
    pub q: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Tag slug
    pub tag: Option<String>,
}

impl PostFilter {
    /// Drop blank values so `?q=` behaves like no filter
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            q: clean(self.q),
            category: clean(self.category),
            tag: clean(self.tag),
        }
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: POSTS_PER_PAGE,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let total = self.total as u64;
        let per_page = self.per_page as u64;
        total.div_ceil(per_page) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: 1,
            title: "Scaling Celery".into(),
            slug: "scaling-celery".into(),
            excerpt: "Queues at work".into(),
            content: "<p>Body</p>".into(),
            cover_image: None,
            category_id: Some(1),
            is_published: true,
            meta_title: String::new(),
            meta_description: "  ".into(),
            meta_keywords: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_seo_fallbacks() {
        let post = post();
        let category = Category {
            id: 1,
            name: "Backend".into(),
            slug: "backend".into(),
        };
        let tags = vec![
            Tag { id: 1, name: "Python".into(), slug: "python".into() },
            Tag { id: 2, name: "Celery".into(), slug: "celery".into() },
        ];

        assert_eq!(post.seo_title(), "Scaling Celery");
        assert_eq!(post.seo_description(), "Queues at work");
        assert_eq!(post.seo_keywords(Some(&category), &tags), "Backend, Python, Celery");
        assert_eq!(post.seo_keywords(None, &[]), "");
    }

    #[test]
    fn test_seo_overrides_win() {
        let mut post = post();
        post.meta_title = "Custom".into();
        post.meta_keywords = "a, b".into();
        assert_eq!(post.seo_title(), "Custom");
        assert_eq!(post.seo_keywords(None, &[]), "a, b");
    }

    #[test]
    fn test_absolute_path() {
        assert_eq!(post().absolute_path(), "/blog/scaling-celery/");
    }

    #[test]
    fn test_update_input_clears_category_on_explicit_null() {
        let input: UpdatePostInput = serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        let mut post = post();
        input.apply_to(&mut post);
        assert_eq!(post.category_id, None);

        let input: UpdatePostInput = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        let mut post = self::post();
        input.apply_to(&mut post);
        assert_eq!(post.category_id, Some(1));
        assert_eq!(post.title, "New");
    }

    #[test]
    fn test_filter_normalization() {
        let filter = PostFilter {
            q: Some("  ".into()),
            category: Some(" backend ".into()),
            tag: None,
        }
        .normalized();
        assert_eq!(filter.q, None);
        assert_eq!(filter.category.as_deref(), Some("backend"));
    }

    #[test]
    fn test_paged_result_pages() {
        let params = ListParams::new(2, POSTS_PER_PAGE);
        let page: PagedResult<i32> = PagedResult::new(vec![], 19, &params);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());
        assert_eq!(params.offset(), 9);
    }
}
