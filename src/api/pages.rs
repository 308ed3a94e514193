//! Server-rendered pages
//!
//! - GET/POST / - portfolio index with the contact and newsletter forms
//! - GET /blog/ - post listing with search, category and tag filters
//! - GET/POST /blog/{slug}/ - post detail with the comment form
//!
//! POST handlers are the full-page variant of the submission endpoints:
//! success redirects with a flash message, a validation failure re-renders
//! the page with field errors.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tera::Context as TeraContext;

use crate::api::flash::{self, Flash};
use crate::api::middleware::AppState;
use crate::models::{post_path, ListParams, PostFilter, SiteConfiguration, POSTS_PER_PAGE};
use crate::services::comment::COMMENT_INVALID_MESSAGE;
use crate::services::contact::CONTACT_INVALID_MESSAGE;
use crate::services::newsletter::NEWSLETTER_INVALID_MESSAGE;
use crate::services::{
    BlogServiceError, CommentForm, ContactForm, NewsletterForm, PortfolioServiceError,
    SubmissionError, ValidationErrors,
};

pub const LIST_META_TITLE: &str = "Blog | Articles & Insights";
pub const LIST_META_DESCRIPTION: &str =
    "Articles and insights on Python, RPA, backend development, and automation.";
pub const LIST_META_KEYWORDS: &str = "blog, articles, python, rpa, backend, django, automation";

/// Field marking a full-page POST to `/` as a newsletter signup
const NEWSLETTER_MARKER: &str = "subscribe_newsletter";

/// Failure while building a page; rendered through `error.html`
#[derive(Debug)]
pub struct PageError {
    status: StatusCode,
    message: String,
}

impl PageError {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "The page you are looking for does not exist.".to_string(),
        }
    }

    fn internal(e: impl std::fmt::Display) -> Self {
        tracing::error!("Page failed: {}", e);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something went wrong while loading this page.".to_string(),
        }
    }

    fn render(self, state: &AppState) -> Response {
        let mut context = TeraContext::new();
        context.insert("status", &self.status.as_u16());
        context.insert("error_message", &self.message);
        let html = state.templates.render_with_fallback("error.html", &context);
        (self.status, Html(html)).into_response()
    }
}

impl From<BlogServiceError> for PageError {
    fn from(e: BlogServiceError) -> Self {
        match e {
            BlogServiceError::NotFound => Self::not_found(),
            other => Self::internal(other),
        }
    }
}

impl From<PortfolioServiceError> for PageError {
    fn from(e: PortfolioServiceError) -> Self {
        Self::internal(e)
    }
}

impl From<SubmissionError> for PageError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::NotFound(_) => Self::not_found(),
            other => Self::internal(other),
        }
    }
}

/// Template context shared by every page: site configuration, current year
/// and pending flash messages
struct Page {
    context: TeraContext,
    messages: Vec<Flash>,
    consumed_flash: bool,
}

impl Page {
    async fn new(state: &AppState, headers: &HeaderMap) -> Self {
        let site_config = match state.site_config.load().await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Site configuration unavailable, rendering defaults: {}", e);
                SiteConfiguration::default()
            }
        };

        let mut context = TeraContext::new();
        context.insert("site_config", &site_config);
        context.insert("year", &chrono::Utc::now().year());

        let pending = Flash::from_headers(headers);
        Self {
            context,
            consumed_flash: pending.is_some(),
            messages: pending.into_iter().collect(),
        }
    }

    fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.context.insert(key, value);
    }

    fn flash(&mut self, message: Flash) {
        self.messages.push(message);
    }

    fn render(mut self, state: &AppState, template: &str) -> Response {
        self.context.insert("messages", &self.messages);
        let html = state.templates.render_with_fallback(template, &self.context);

        let mut response = Html(html).into_response();
        if self.consumed_flash {
            response
                .headers_mut()
                .append(header::SET_COOKIE, flash::clear_cookie());
        }
        response
    }
}

/// 303 to `location` carrying `message` for the next page
fn redirect_with_flash(location: &str, message: Flash) -> Response {
    let mut response = (StatusCode::SEE_OTHER, [(header::LOCATION, location.to_string())]).into_response();
    if let Some(cookie) = message.to_cookie() {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

// ============================================================================
// Index
// ============================================================================

/// Forms and errors shown on the index page
#[derive(Default)]
struct IndexForms {
    contact: ContactForm,
    contact_errors: ValidationErrors,
    newsletter: NewsletterForm,
    newsletter_errors: ValidationErrors,
}

/// GET /
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let page = Page::new(&state, &headers).await;
    render_index(&state, page, IndexForms::default())
        .await
        .unwrap_or_else(|e| e.render(&state))
}

/// POST / - full-page contact or newsletter submission
pub async fn index_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    match submit_index(&state, &headers, fields).await {
        Ok(response) => response,
        Err(e) => e.render(&state),
    }
}

async fn submit_index(
    state: &AppState,
    headers: &HeaderMap,
    mut fields: HashMap<String, String>,
) -> Result<Response, PageError> {
    // Only the marker's presence counts, its value is ignored.
    let is_newsletter = fields.contains_key(NEWSLETTER_MARKER);
    let mut field = |name: &str| fields.remove(name).unwrap_or_default();
    let mut forms = IndexForms::default();

    let flash = if is_newsletter {
        forms.newsletter = NewsletterForm { email: field("email") };
        match state.newsletter.subscribe(&forms.newsletter).await {
            Ok(receipt) => {
                let message = if receipt.is_degraded() {
                    Flash::warning(receipt.message)
                } else {
                    Flash::success(receipt.message)
                };
                return Ok(redirect_with_flash("/", message));
            }
            Err(SubmissionError::Validation(errors)) => {
                forms.newsletter_errors = errors;
                Flash::error(NEWSLETTER_INVALID_MESSAGE)
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        forms.contact = ContactForm {
            name: field("name"),
            email: field("email"),
            subject: field("subject"),
            message: field("message"),
        };
        match state.contact.submit(&forms.contact).await {
            Ok(receipt) => return Ok(redirect_with_flash("/", Flash::success(receipt.message))),
            Err(SubmissionError::Validation(errors)) => {
                forms.contact_errors = errors;
                Flash::error(CONTACT_INVALID_MESSAGE)
            }
            Err(e) => return Err(e.into()),
        }
    };

    let mut page = Page::new(state, headers).await;
    page.flash(flash);
    render_index(state, page, forms).await
}

async fn render_index(state: &AppState, mut page: Page, forms: IndexForms) -> Result<Response, PageError> {
    let overview = state.portfolio.overview().await?;
    let recent_posts = state.blog.recent_posts().await?;

    page.insert("profile", &overview.profile);
    page.insert("profile_first_name", &overview.first_name);
    page.insert("profile_last_name", &overview.last_name);
    page.insert("skills_by_category", &overview.skill_groups);
    page.insert("skills_list", &overview.skills);
    page.insert("projects", &overview.projects);
    page.insert("experiences", &overview.experiences);
    page.insert("education_list", &overview.education);
    page.insert("certifications", &overview.certifications);
    page.insert("recent_posts", &recent_posts);
    page.insert("contact_form", &forms.contact);
    page.insert("contact_errors", &forms.contact_errors);
    page.insert("newsletter_form", &forms.newsletter);
    page.insert("newsletter_errors", &forms.newsletter_errors);

    Ok(page.render(state, "portfolio/index.html"))
}

// ============================================================================
// Blog
// ============================================================================

/// Query string of the blog listing
#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    /// Kept as text so a malformed value falls back to the first page
    pub page: Option<String>,
}

/// Pagination state as the listing template reads it
#[derive(Debug, Serialize)]
struct PageObj {
    page: u32,
    total_pages: u32,
    has_next: bool,
    has_prev: bool,
}

/// GET /blog/
pub async fn blog_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BlogListQuery>,
) -> Response {
    match render_blog_list(&state, &headers, query).await {
        Ok(response) => response,
        Err(e) => e.render(&state),
    }
}

async fn render_blog_list(
    state: &AppState,
    headers: &HeaderMap,
    query: BlogListQuery,
) -> Result<Response, PageError> {
    let filter = PostFilter {
        q: query.q,
        category: query.category,
        tag: query.tag,
    }
    .normalized();
    let requested = query
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(1);

    let mut result = state
        .blog
        .list_published(filter.clone(), ListParams::new(requested, POSTS_PER_PAGE))
        .await?;
    // Past the end: show the last page instead of an empty one
    let last = result.total_pages();
    if last > 0 && result.page > last {
        result = state
            .blog
            .list_published(filter.clone(), ListParams::new(last, POSTS_PER_PAGE))
            .await?;
    }

    let page_obj = PageObj {
        page: result.page,
        total_pages: result.total_pages(),
        has_next: result.has_next(),
        has_prev: result.has_prev(),
    };

    let mut page = Page::new(state, headers).await;
    page.insert("posts", &result.items);
    page.insert("page_obj", &page_obj);
    page.insert("filter_query", &filter_query(&filter));
    page.insert("filter", &filter);
    page.insert("categories", &state.blog.list_categories().await?);
    page.insert("tags", &state.blog.list_tags_in_use().await?);
    page.insert("list_meta_title", LIST_META_TITLE);
    page.insert("list_meta_description", LIST_META_DESCRIPTION);
    page.insert("list_meta_keywords", LIST_META_KEYWORDS);

    Ok(page.render(state, "blog/blog_list.html"))
}

/// Active filters as `&key=value` pairs for pagination links
fn filter_query(filter: &PostFilter) -> String {
    [("q", &filter.q), ("category", &filter.category), ("tag", &filter.tag)]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(|v| format!("&{}={}", key, urlencoding::encode(v)))
        })
        .collect()
}

/// GET /blog/{slug}/
pub async fn blog_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    let page = Page::new(&state, &headers).await;
    match render_blog_detail(&state, page, &slug, CommentForm::default(), ValidationErrors::new()).await {
        Ok(response) => response,
        Err(e) => e.render(&state),
    }
}

/// POST /blog/{slug}/ - full-page comment submission
pub async fn blog_detail_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    match state.comments.submit(&slug, &form).await {
        Ok(receipt) => redirect_with_flash(&post_path(&slug), Flash::success(receipt.message)),
        Err(SubmissionError::Validation(errors)) => {
            let mut page = Page::new(&state, &headers).await;
            page.flash(Flash::error(COMMENT_INVALID_MESSAGE));
            render_blog_detail(&state, page, &slug, form, errors)
                .await
                .unwrap_or_else(|e| e.render(&state))
        }
        Err(e) => PageError::from(e).render(&state),
    }
}

async fn render_blog_detail(
    state: &AppState,
    mut page: Page,
    slug: &str,
    form: CommentForm,
    form_errors: ValidationErrors,
) -> Result<Response, PageError> {
    let detail = state.blog.published_detail(slug).await?;
    let comments = state.comments.list_for_post(detail.post.id).await?;

    let path = detail.post.absolute_path();
    let canonical_url = match state.site_url.as_deref() {
        Some(base) => format!("{}{}", base.trim_end_matches('/'), path),
        None => path,
    };

    page.insert("seo_title", detail.post.seo_title());
    page.insert("seo_description", detail.post.seo_description());
    page.insert("seo_keywords", &detail.seo_keywords());
    page.insert("canonical_url", &canonical_url);
    page.insert("post", &detail.post);
    page.insert("category", &detail.category);
    page.insert("tags", &detail.tags);
    page.insert("comments", &comments);
    page.insert("form", &form);
    page.insert("form_errors", &form_errors);

    Ok(page.render(state, "blog/blog_detail.html"))
}
