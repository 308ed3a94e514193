//! API layer - HTTP handlers and routing
//!
//! It includes:
//! - Server-rendered pages (index, blog list, blog detail)
//! - AJAX submission endpoints (contact, newsletter, comments)
//! - Admin JSON API under /api/admin
//! - Static and media file serving

pub mod admin;
pub mod flash;
pub mod middleware;
pub mod pages;
pub mod submissions;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::db::repositories::{
    SqlxBlogRepository, SqlxCommentRepository, SqlxContactMessageRepository,
    SqlxPortfolioRepository, SqlxSiteConfigRepository, SqlxSubscriberRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    BlogService, CommentService, ContactService, EventBus, MailTransport, NewArticleBroadcaster,
    NewsletterService, NotificationDispatcher, PortfolioService, SiteConfigService,
};
use crate::templates::TemplateEngine;

pub use middleware::{ApiError, AppState};

/// Wire repositories, services and the event bus into an [`AppState`]
pub fn build_state(
    config: &Config,
    pool: DynDatabasePool,
    mailer: Arc<dyn MailTransport>,
) -> anyhow::Result<AppState> {
    let templates = Arc::new(TemplateEngine::new(config.templates.path.as_deref())?);
    let site_config = Arc::new(SiteConfigService::new(SqlxSiteConfigRepository::boxed(pool.clone())));
    let subscribers = SqlxSubscriberRepository::boxed(pool.clone());
    let blog_repo = SqlxBlogRepository::boxed(pool.clone());

    let notifier = Arc::new(NotificationDispatcher::new(
        templates.clone(),
        mailer,
        site_config.clone(),
        config.server.site_url.clone(),
        config.mail.sender(),
    ));

    let mut events = EventBus::new();
    events.subscribe(Arc::new(NewArticleBroadcaster::new(
        subscribers.clone(),
        notifier.clone(),
    )));

    Ok(AppState {
        templates,
        site_config,
        portfolio: Arc::new(PortfolioService::new(SqlxPortfolioRepository::boxed(pool.clone()))),
        blog: Arc::new(BlogService::new(blog_repo.clone(), Arc::new(events))),
        comments: Arc::new(CommentService::new(SqlxCommentRepository::boxed(pool.clone()), blog_repo)),
        contact: Arc::new(ContactService::new(
            SqlxContactMessageRepository::boxed(pool),
            notifier.clone(),
        )),
        newsletter: Arc::new(NewsletterService::new(subscribers, notifier)),
        site_url: config
            .server
            .site_url
            .clone()
            .filter(|u| !u.trim().is_empty()),
        admin_token: config.admin_token().map(str::to_string),
    })
}

/// Build the admin API router
pub fn build_admin_router(state: AppState) -> Router<AppState> {
    admin::router().route_layer(axum_middleware::from_fn_with_state(
        state,
        middleware::require_admin,
    ))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&config.server.allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    Router::new()
        .route("/", get(pages::index).post(pages::index_submit))
        .route("/blog/", get(pages::blog_list))
        .route(
            "/blog/{slug}/",
            get(pages::blog_detail).post(pages::blog_detail_submit),
        )
        .route("/blog/{slug}/comments/", post(submissions::comment_submit))
        .route("/blog/{slug}/comments", post(submissions::comment_submit))
        .route("/contact/submit/", post(submissions::contact_submit))
        .route("/contact/submit", post(submissions::contact_submit))
        .route("/newsletter/submit/", post(submissions::newsletter_submit))
        .route("/newsletter/submit", post(submissions::newsletter_submit))
        .nest("/api/admin", build_admin_router(state.clone()))
        .nest_service("/static", ServeDir::new(&config.media.static_root))
        .nest_service("/media", ServeDir::new(&config.media.media_root))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn allowed_origins(origins: &[String]) -> AllowOrigin {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid allowed origin");
                None
            }
        })
        .collect();
    AllowOrigin::list(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        BlogRepository, CommentRepository, ContactMessageRepository, SubscriberRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreatePostInput;
    use crate::services::mail::testing::FailingMailer;
    use crate::services::MemoryMailer;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    const TOKEN: &str = "s3cret";

    struct TestApp {
        server: TestServer,
        pool: DynDatabasePool,
        outbox: Arc<MemoryMailer>,
    }

    async fn app_with(mailer: impl FnOnce(Arc<MemoryMailer>) -> Arc<dyn MailTransport>) -> TestApp {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");

        let mut config = Config::default();
        config.server.site_url = Some("https://example.com".into());
        config.admin.api_token = Some(TOKEN.into());

        let outbox = Arc::new(MemoryMailer::new());
        let state = build_state(&config, pool.clone(), mailer(outbox.clone())).unwrap();
        let server = TestServer::new(build_router(state, &config)).unwrap();
        TestApp { server, pool, outbox }
    }

    async fn app() -> TestApp {
        app_with(|outbox| outbox as Arc<dyn MailTransport>).await
    }

    #[tokio::test]
    async fn test_contact_submit_end_to_end() {
        let app = app().await;
        let response = app
            .server
            .post("/contact/submit/")
            .json(&json!({"name": "Ada", "email": "ada@example.com", "subject": "Hi", "message": "Hello"}))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        assert!(body["message"].as_str().unwrap().contains("sent successfully"));
        assert!(body.get("errors").is_none());

        let messages = SqlxContactMessageRepository::new(app.pool.clone());
        assert_eq!(messages.count().await.unwrap(), 1);
        let sent = app.outbox.outbox();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ada@example.com"]);
    }

    #[tokio::test]
    async fn test_contact_submit_rejects_script() {
        let app = app().await;
        let response = app
            .server
            .post("/contact/submit/")
            .form(&[
                ("name", "Ada"),
                ("email", "ada@example.com"),
                ("subject", "Hi"),
                ("message", "<script>alert(1)</script>"),
            ])
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], json!(false));
        assert!(body["errors"]["message"].is_array());

        let messages = SqlxContactMessageRepository::new(app.pool.clone());
        assert_eq!(messages.count().await.unwrap(), 0);
        assert!(app.outbox.outbox().is_empty());
    }

    #[tokio::test]
    async fn test_newsletter_duplicate_is_rejected() {
        let app = app().await;
        let first = app
            .server
            .post("/newsletter/submit/")
            .json(&json!({"email": "ada@example.com"}))
            .await;
        assert_eq!(first.status_code(), StatusCode::OK);

        let second = app
            .server
            .post("/newsletter/submit/")
            .json(&json!({"email": "ada@example.com"}))
            .await;
        assert_eq!(second.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = second.json();
        assert_eq!(body["message"], json!("Invalid email or already subscribed."));

        let subscribers = SqlxSubscriberRepository::new(app.pool.clone());
        assert_eq!(subscribers.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_newsletter_post_redirects_with_flash() {
        let app = app().await;
        let response = app
            .server
            .post("/")
            .form(&[("email", "ada@example.com"), ("subscribe_newsletter", "")])
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/");
        let cookie = response.header("set-cookie");
        assert!(cookie.to_str().unwrap().starts_with("flash=success"));

        let subscribers = SqlxSubscriberRepository::new(app.pool.clone());
        assert_eq!(subscribers.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_contact_post_rerenders_on_error() {
        let app = app().await;
        let response = app
            .server
            .post("/")
            .form(&[("name", "Ada"), ("email", "not-an-email"), ("subject", "Hi"), ("message", "Hello")])
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let html = response.text();
        assert!(html.contains("Please correct the errors in the contact form."));
        assert!(html.contains("Enter a valid email address."));
    }

    #[tokio::test]
    async fn test_index_shows_flash_and_expires_it() {
        let app = app().await;
        let flash = crate::api::flash::Flash::success("Your message has been sent successfully!");
        let set_cookie = flash.to_cookie().unwrap();
        let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();

        let response = app
            .server
            .get("/")
            .add_header(header::COOKIE, HeaderValue::from_str(&pair).unwrap())
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("Your message has been sent successfully!"));
        assert!(response
            .header("set-cookie")
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_comment_flow_on_published_post() {
        let app = app().await;
        let posts = SqlxBlogRepository::new(app.pool.clone());
        let post = posts
            .create_post(&CreatePostInput::new("My post", "Intro", "<p>Body</p>"), "my-post")
            .await
            .unwrap();

        for name in ["Ada", "Grace"] {
            let response = app
                .server
                .post("/blog/my-post/comments/")
                .json(&json!({"name": name, "email": "reader@example.com", "content": "Nice"}))
                .await;
            assert_eq!(response.status_code(), StatusCode::OK);
        }

        let comments = SqlxCommentRepository::new(app.pool.clone());
        let listed = comments.list_for_post(post.id, true).await.unwrap();
        let names: Vec<_> = listed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Grace"]);
        assert!(listed.iter().all(|c| c.is_active));

        let page = app.server.get("/blog/my-post/").await;
        assert_eq!(page.status_code(), StatusCode::OK);
        let html = page.text();
        assert!(html.contains("Grace"));
        assert!(html.contains("https://example.com/blog/my-post/"));

        let missing = app
            .server
            .post("/blog/nope/comments/")
            .json(&json!({"name": "Ada", "email": "ada@example.com", "content": "Hi"}))
            .await;
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blog_list_filters_and_hides_drafts() {
        let app = app().await;
        let posts = SqlxBlogRepository::new(app.pool.clone());
        posts
            .create_post(&CreatePostInput::new("Scaling Celery", "Queues", ""), "scaling-celery")
            .await
            .unwrap();
        posts
            .create_post(&CreatePostInput::new("Secret draft", "", "").published(false), "secret-draft")
            .await
            .unwrap();

        let html = app.server.get("/blog/").await.text();
        assert!(html.contains("Scaling Celery"));
        assert!(!html.contains("Secret draft"));

        let html = app.server.get("/blog/?q=robots&page=abc").await.text();
        assert!(html.contains("No articles found."));

        let draft = app.server.get("/blog/secret-draft/").await;
        assert_eq!(draft.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_requires_token() {
        let app = app().await;
        let anonymous = app.server.get("/api/admin/site-config").await;
        assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .server
            .get("/api/admin/site-config")
            .authorization_bearer("nope")
            .await;
        assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

        let ok = app
            .server
            .get("/api/admin/site-config")
            .authorization_bearer(TOKEN)
            .await;
        assert_eq!(ok.status_code(), StatusCode::OK);
        assert_eq!(ok.json::<Value>()["id"], json!(1));
    }

    #[tokio::test]
    async fn test_admin_post_broadcasts_only_on_published_create() {
        let failing_app = app_with(|outbox| {
            Arc::new(FailingMailer::new(outbox, &["bad@example.com"])) as Arc<dyn MailTransport>
        })
        .await;
        let subscribers = SqlxSubscriberRepository::new(failing_app.pool.clone());
        subscribers.create("bad@example.com").await.unwrap();
        subscribers.create("good@example.com").await.unwrap();

        let draft = failing_app
            .server
            .post("/api/admin/posts")
            .authorization_bearer(TOKEN)
            .json(&json!({"title": "Draft", "excerpt": "x", "is_published": false}))
            .await;
        assert_eq!(draft.status_code(), StatusCode::CREATED);
        let draft_id = draft.json::<Value>()["id"].as_i64().unwrap();

        let flipped = failing_app
            .server
            .put(&format!("/api/admin/posts/{}", draft_id))
            .authorization_bearer(TOKEN)
            .json(&json!({"is_published": true}))
            .await;
        assert_eq!(flipped.status_code(), StatusCode::OK);
        assert!(failing_app.outbox.outbox().is_empty());

        let published = failing_app
            .server
            .post("/api/admin/posts")
            .authorization_bearer(TOKEN)
            .json(&json!({"title": "Launch", "excerpt": "We are live"}))
            .await;
        assert_eq!(published.status_code(), StatusCode::CREATED);

        let sent = failing_app.outbox.outbox();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["good@example.com"]);
        assert_eq!(sent[0].subject, "[Blog] New article: Launch");
    }

    #[tokio::test]
    async fn test_admin_deletes_and_moderation() {
        let app = app().await;
        let skill = app
            .server
            .post("/api/admin/skills")
            .authorization_bearer(TOKEN)
            .json(&json!({"name": "Python", "category": "Backend"}))
            .await;
        assert_eq!(skill.status_code(), StatusCode::CREATED);
        let skill_id = skill.json::<Value>()["id"].as_i64().unwrap();

        let deleted = app
            .server
            .delete(&format!("/api/admin/skills/{}", skill_id))
            .authorization_bearer(TOKEN)
            .await;
        assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

        let unknown = app
            .server
            .delete("/api/admin/widgets/1")
            .authorization_bearer(TOKEN)
            .await;
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);

        let sub = SqlxSubscriberRepository::new(app.pool.clone())
            .create("ada@example.com")
            .await
            .unwrap();
        let toggled = app
            .server
            .put(&format!("/api/admin/subscribers/{}/active", sub.id))
            .authorization_bearer(TOKEN)
            .json(&json!({"is_active": false}))
            .await;
        assert_eq!(toggled.status_code(), StatusCode::NO_CONTENT);
        let listed: Value = app
            .server
            .get("/api/admin/subscribers")
            .authorization_bearer(TOKEN)
            .await
            .json();
        assert_eq!(listed[0]["is_active"], json!(false));
    }

    #[tokio::test]
    async fn test_submit_routes_accept_both_slash_forms() {
        let app = app().await;
        for path in ["/contact/submit", "/contact/submit/"] {
            let response = app
                .server
                .post(path)
                .json(&json!({"name": "Ada", "email": "ada@example.com", "subject": "Hi", "message": "Hello"}))
                .await;
            assert_eq!(response.status_code(), StatusCode::OK, "{}", path);
        }

        let response = app
            .server
            .post("/newsletter/submit")
            .form(&[("email", "ada@example.com")])
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let messages = SqlxContactMessageRepository::new(app.pool.clone());
        assert_eq!(messages.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_admin_post_with_unknown_tag_is_rejected_whole() {
        let app = app().await;
        SqlxSubscriberRepository::new(app.pool.clone())
            .create("ada@example.com")
            .await
            .unwrap();

        let response = app
            .server
            .post("/api/admin/posts")
            .authorization_bearer(TOKEN)
            .json(&json!({"title": "Launch", "excerpt": "We are live", "tag_ids": [999]}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"]["code"], json!("VALIDATION_ERROR"));

        let posts = SqlxBlogRepository::new(app.pool.clone());
        assert!(posts.get_post_by_slug("launch").await.unwrap().is_none());
        assert!(app.outbox.outbox().is_empty());

        let retried = app
            .server
            .post("/api/admin/posts")
            .authorization_bearer(TOKEN)
            .json(&json!({"title": "Launch", "excerpt": "We are live"}))
            .await;
        assert_eq!(retried.status_code(), StatusCode::CREATED);
        assert_eq!(retried.json::<Value>()["slug"], json!("launch"));
        assert_eq!(app.outbox.outbox().len(), 1);
    }
}
