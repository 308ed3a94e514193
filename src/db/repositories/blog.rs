//! Blog repository
//!
//! Posts, categories, tags and the post/tag association.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{BlogPost, Category, CreatePostInput, ListParams, PagedResult, PostFilter, Tag};
use crate::on_pool;

#[async_trait]
pub trait BlogRepository: Send + Sync {
    /// Insert a post with an already resolved slug together with its tags.
    /// Nothing is stored when any part fails.
    async fn create_post(&self, input: &CreatePostInput, slug: &str) -> Result<BlogPost>;

    /// Write every column of `post` back, bumping `updated_at`, and replace
    /// its tag set when `tag_ids` is given. Both happen or neither does.
    async fn update_post(&self, post: &BlogPost, tag_ids: Option<&[i64]>) -> Result<BlogPost>;

    async fn delete_post(&self, id: i64) -> Result<bool>;

    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>>;

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>>;

    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Published posts matching `filter`, newest first
    async fn list_published(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<PagedResult<BlogPost>>;

    async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>>;

    async fn create_category(&self, name: &str, slug: &str) -> Result<Category>;
    async fn get_category(&self, id: i64) -> Result<Option<Category>>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn delete_category(&self, id: i64) -> Result<bool>;

    async fn create_tag(&self, name: &str, slug: &str) -> Result<Tag>;
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Tags attached to at least one published post
    async fn list_tags_in_use(&self) -> Result<Vec<Tag>>;
}

pub struct SqlxBlogRepository {
    pool: DynDatabasePool,
}

impl SqlxBlogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BlogRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Attach `tag_ids` to `post_id` inside an open transaction
macro_rules! insert_post_tags {
    ($tx:ident, $post_id:expr, $tag_ids:expr) => {
        for tag_id in $tag_ids.iter() {
            sqlx::query("INSERT INTO blog_post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind($post_id)
                .bind(*tag_id)
                .execute(&mut *$tx)
                .await?;
        }
    };
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

/// WHERE clause and bind values for the public listing.
///
/// The needle is lowercased with ASCII rules to match SQLite's `LOWER()`, so
/// on SQLite non-ASCII letters only match in the same case.
fn published_filter_clause(filter: &PostFilter) -> (String, Vec<String>) {
    let mut clause = String::from("WHERE p.is_published = 1");
    let mut args = Vec::new();

    if let Some(q) = &filter.q {
        let needle = q.to_ascii_lowercase();
        clause.push_str(
            " AND (INSTR(LOWER(p.title), ?) > 0 OR INSTR(LOWER(p.excerpt), ?) > 0 \
             OR INSTR(LOWER(p.content), ?) > 0)",
        );
        args.extend([needle.clone(), needle.clone(), needle]);
    }
    if let Some(category) = &filter.category {
        clause.push_str(" AND p.category_id IN (SELECT c.id FROM categories c WHERE c.slug = ?)");
        args.push(category.clone());
    }
    if let Some(tag) = &filter.tag {
        clause.push_str(
            " AND p.id IN (SELECT pt.post_id FROM blog_post_tags pt \
             JOIN tags t ON t.id = pt.tag_id WHERE t.slug = ?)",
        );
        args.push(tag.clone());
    }

    (clause, args)
}

#[async_trait]
impl BlogRepository for SqlxBlogRepository {
    async fn create_post(&self, input: &CreatePostInput, slug: &str) -> Result<BlogPost> {
        let now = Utc::now();
        let tag_ids = unique_ids(&input.tag_ids);
        let id = on_pool!(self.pool, |p| {
            let mut tx = p.begin().await?;
            let id = sqlx::query(
                r#"INSERT INTO blog_posts (title, slug, excerpt, content, cover_image, category_id,
                   is_published, meta_title, meta_description, meta_keywords, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&input.title)
            .bind(slug)
            .bind(&input.excerpt)
            .bind(&input.content)
            .bind(&input.cover_image)
            .bind(input.category_id)
            .bind(input.is_published)
            .bind(&input.meta_title)
            .bind(&input.meta_description)
            .bind(&input.meta_keywords)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .inserted_id();
            insert_post_tags!(tx, id, &tag_ids);
            tx.commit().await?;
            id
        });

        Ok(BlogPost {
            id,
            title: input.title.clone(),
            slug: slug.to_string(),
            excerpt: input.excerpt.clone(),
            content: input.content.clone(),
            cover_image: input.cover_image.clone(),
            category_id: input.category_id,
            is_published: input.is_published,
            meta_title: input.meta_title.clone(),
            meta_description: input.meta_description.clone(),
            meta_keywords: input.meta_keywords.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_post(&self, post: &BlogPost, tag_ids: Option<&[i64]>) -> Result<BlogPost> {
        let now = Utc::now();
        let tag_ids = tag_ids.map(unique_ids);
        on_pool!(self.pool, |p| {
            let mut tx = p.begin().await?;
            sqlx::query(
                r#"UPDATE blog_posts SET title = ?, slug = ?, excerpt = ?, content = ?,
                   cover_image = ?, category_id = ?, is_published = ?, meta_title = ?,
                   meta_description = ?, meta_keywords = ?, updated_at = ? WHERE id = ?"#,
            )
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.cover_image)
            .bind(post.category_id)
            .bind(post.is_published)
            .bind(&post.meta_title)
            .bind(&post.meta_description)
            .bind(&post.meta_keywords)
            .bind(now)
            .bind(post.id)
            .execute(&mut *tx)
            .await?;
            if let Some(tag_ids) = &tag_ids {
                sqlx::query("DELETE FROM blog_post_tags WHERE post_id = ?")
                    .bind(post.id)
                    .execute(&mut *tx)
                    .await?;
                insert_post_tags!(tx, post.id, tag_ids);
            }
            tx.commit().await?;
        });

        Ok(BlogPost {
            updated_at: now,
            ..post.clone()
        })
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM blog_posts WHERE id = ?")
                .bind(id)
                .execute(p)
                .await?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = ?")
                .bind(id)
                .fetch_optional(p)
                .await?
        }))
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE slug = ?")
                .bind(slug)
                .fetch_optional(p)
                .await?
        }))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_posts WHERE slug = ?")
                .bind(slug)
                .fetch_one(p)
                .await?
        });
        Ok(count > 0)
    }

    async fn list_published(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<PagedResult<BlogPost>> {
        let (clause, args) = published_filter_clause(filter);
        let count_sql = format!("SELECT COUNT(*) FROM blog_posts p {}", clause);
        let list_sql = format!(
            "SELECT p.* FROM blog_posts p {} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            clause
        );

        let (total, items) = on_pool!(self.pool, |p| {
            let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
            for arg in &args {
                count_query = count_query.bind(arg);
            }
            let total = count_query.fetch_one(p).await?;

            let mut list_query = sqlx::query_as::<_, BlogPost>(&list_sql);
            for arg in &args {
                list_query = list_query.bind(arg);
            }
            let items = list_query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(p)
                .await?;
            (total, items)
        });

        Ok(PagedResult::new(items, total, params))
    }

    async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Tag>(
                r#"SELECT t.* FROM tags t
                   JOIN blog_post_tags pt ON pt.tag_id = t.id
                   WHERE pt.post_id = ? ORDER BY t.name"#,
            )
            .bind(post_id)
            .fetch_all(p)
            .await?
        }))
    }

    async fn create_category(&self, name: &str, slug: &str) -> Result<Category> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query("INSERT INTO categories (name, slug) VALUES (?, ?)")
                .bind(name)
                .bind(slug)
                .execute(p)
                .await?
                .inserted_id()
        });
        Ok(Category {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(p)
                .await?
        }))
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
                .fetch_all(p)
                .await?
        }))
    }

    async fn delete_category(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM categories WHERE id = ?")
                .bind(id)
                .execute(p)
                .await?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn create_tag(&self, name: &str, slug: &str) -> Result<Tag> {
        let id = on_pool!(self.pool, |p| {
            sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?)")
                .bind(name)
                .bind(slug)
                .execute(p)
                .await?
                .inserted_id()
        });
        Ok(Tag {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY name")
                .fetch_all(p)
                .await?
        }))
    }

    async fn list_tags_in_use(&self) -> Result<Vec<Tag>> {
        Ok(on_pool!(self.pool, |p| {
            sqlx::query_as::<_, Tag>(
                r#"SELECT DISTINCT t.id, t.name, t.slug FROM tags t
                   JOIN blog_post_tags pt ON pt.tag_id = t.id
                   JOIN blog_posts p ON p.id = pt.post_id
                   WHERE p.is_published = 1
                   ORDER BY t.name"#,
            )
            .fetch_all(p)
            .await?
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxBlogRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxBlogRepository::new(pool)
    }

    fn input(title: &str) -> CreatePostInput {
        CreatePostInput::new(title, format!("About {}", title), "<p>Body</p>")
    }

    #[tokio::test]
    async fn test_list_published_filters() {
        let repo = setup().await;
        let backend = repo.create_category("Backend", "backend").await.unwrap();
        let python = repo.create_tag("Python", "python").await.unwrap();

        let mut celery = input("Scaling Celery");
        celery.category_id = Some(backend.id);
        celery.tag_ids = vec![python.id];
        repo.create_post(&celery, "scaling-celery").await.unwrap();
        repo.create_post(&input("Robocorp tips"), "robocorp-tips").await.unwrap();
        repo.create_post(&input("Hidden draft").published(false), "hidden-draft")
            .await
            .unwrap();

        let params = ListParams::default();
        let all = repo.list_published(&PostFilter::default(), &params).await.unwrap();
        assert_eq!(all.total, 2);

        let by_query = PostFilter { q: Some("CELERY".into()), ..Default::default() };
        let found = repo.list_published(&by_query, &params).await.unwrap();
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].slug, "scaling-celery");

        let by_category = PostFilter { category: Some("backend".into()), ..Default::default() };
        assert_eq!(repo.list_published(&by_category, &params).await.unwrap().total, 1);

        let by_tag = PostFilter { tag: Some("python".into()), ..Default::default() };
        assert_eq!(repo.list_published(&by_tag, &params).await.unwrap().total, 1);

        let draft = PostFilter { q: Some("hidden".into()), ..Default::default() };
        assert_eq!(repo.list_published(&draft, &params).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_pagination() {
        let repo = setup().await;
        for i in 0..11 {
            repo.create_post(&input(&format!("Post {}", i)), &format!("post-{}", i))
                .await
                .unwrap();
        }

        let page2 = repo
            .list_published(&PostFilter::default(), &ListParams::new(2, 9))
            .await
            .unwrap();
        assert_eq!(page2.total, 11);
        assert_eq!(page2.items.len(), 2);
        assert!(!page2.has_next());
    }

    #[tokio::test]
    async fn test_deleting_category_keeps_posts() {
        let repo = setup().await;
        let category = repo.create_category("RPA", "rpa").await.unwrap();
        let mut post_input = input("Bots");
        post_input.category_id = Some(category.id);
        let post = repo.create_post(&post_input, "bots").await.unwrap();

        assert!(repo.delete_category(category.id).await.unwrap());

        let stored = repo.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(stored.category_id, None);
    }

    #[tokio::test]
    async fn test_tags_in_use_only_counts_published_posts() {
        let repo = setup().await;
        let live = repo.create_tag("Live", "live").await.unwrap();
        let draft = repo.create_tag("Draft", "draft").await.unwrap();
        repo.create_tag("Unused", "unused").await.unwrap();

        let mut a = input("A");
        a.tag_ids = vec![live.id, live.id];
        repo.create_post(&a, "a").await.unwrap();
        let mut b = input("B").published(false);
        b.tag_ids = vec![draft.id];
        repo.create_post(&b, "b").await.unwrap();

        let in_use = repo.list_tags_in_use().await.unwrap();
        assert_eq!(in_use, vec![live]);
        assert_eq!(repo.list_tags().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_post_and_slug_lookup() {
        let repo = setup().await;
        let mut post = repo.create_post(&input("Old"), "old").await.unwrap();
        assert!(repo.slug_exists("old").await.unwrap());

        post.title = "New".into();
        post.is_published = false;
        repo.update_post(&post, None).await.unwrap();

        let stored = repo.get_post_by_slug("old").await.unwrap().unwrap();
        assert_eq!(stored.title, "New");
        assert!(!stored.is_published);
    }

    #[tokio::test]
    async fn test_unknown_tag_rolls_back_create() {
        let repo = setup().await;
        let mut launch = input("Launch");
        launch.tag_ids = vec![999];

        assert!(repo.create_post(&launch, "launch").await.is_err());
        assert!(repo.get_post_by_slug("launch").await.unwrap().is_none());
        assert!(!repo.slug_exists("launch").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_tag_rolls_back_update() {
        let repo = setup().await;
        let rust = repo.create_tag("Rust", "rust").await.unwrap();
        let mut original = input("Old");
        original.tag_ids = vec![rust.id];
        let mut post = repo.create_post(&original, "old").await.unwrap();

        post.title = "New".into();
        assert!(repo.update_post(&post, Some(&[999][..])).await.is_err());

        let stored = repo.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Old");
        assert_eq!(repo.tags_for_post(post.id).await.unwrap(), vec![rust]);
    }

    #[tokio::test]
    async fn test_search_matches_non_ascii_title() {
        let repo = setup().await;
        repo.create_post(&input("Über Rust"), "uber-rust").await.unwrap();
        let params = ListParams::default();

        let search = |q: &str| PostFilter { q: Some(q.into()), ..Default::default() };
        assert_eq!(repo.list_published(&search("Über RUST"), &params).await.unwrap().total, 1);
    }
}
