//! Admin API endpoints
//!
//! Handles HTTP requests under /api/admin (bearer token required):
//! - GET/PUT /site-config - the site configuration singleton
//! - GET/PUT /profile - the site owner's profile
//! - POST /skills, /projects, /experiences, /education, /certifications
//! - DELETE /{kind}/{id} - remove a portfolio item
//! - POST /posts, PUT/DELETE /posts/{id}
//! - POST /categories, DELETE /categories/{id}, POST /tags
//! - PUT /comments/{id}/active - moderation
//! - GET /subscribers, PUT /subscribers/{id}/active
//! - GET /messages - contact messages

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::db::repositories::PortfolioKind;
use crate::models::{
    BlogPost, Category, Certification, CertificationInput, ContactMessage, CreatePostInput,
    Education, EducationInput, Experience, ExperienceInput, NewsletterSubscriber, Profile,
    ProfileInput, Project, ProjectInput, SiteConfiguration, Skill, SkillInput, Tag, TaxonomyInput,
    UpdatePostInput,
};

/// Body of the activation toggles
#[derive(Debug, Deserialize)]
pub struct ActiveInput {
    pub is_active: bool,
}

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/site-config", get(get_site_config).put(update_site_config))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/skills", post(create_skill))
        .route("/projects", post(create_project))
        .route("/experiences", post(create_experience))
        .route("/education", post(create_education))
        .route("/certifications", post(create_certification))
        .route("/posts", post(create_post))
        .route("/posts/{id}", put(update_post).delete(delete_post))
        .route("/categories", post(create_category))
        .route("/categories/{id}", delete(delete_category))
        .route("/tags", post(create_tag))
        .route("/comments/{id}/active", put(set_comment_active))
        .route("/subscribers", get(list_subscribers))
        .route("/subscribers/{id}/active", put(set_subscriber_active))
        .route("/messages", get(list_messages))
        .route("/{kind}/{id}", delete(delete_portfolio_item))
}

// ============================================================================
// Site configuration and profile
// ============================================================================

/// GET /api/admin/site-config
async fn get_site_config(State(state): State<AppState>) -> Result<Json<SiteConfiguration>, ApiError> {
    Ok(Json(state.site_config.load().await?))
}

/// PUT /api/admin/site-config - always writes the singleton, whatever id is sent
async fn update_site_config(
    State(state): State<AppState>,
    Json(config): Json<SiteConfiguration>,
) -> Result<Json<SiteConfiguration>, ApiError> {
    let saved = state.site_config.save(config).await?;
    tracing::info!("Site configuration updated");
    Ok(Json(saved))
}

/// GET /api/admin/profile
async fn get_profile(State(state): State<AppState>) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.portfolio.profile().await?))
}

/// PUT /api/admin/profile
async fn update_profile(
    State(state): State<AppState>,
    Json(input): Json<ProfileInput>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.portfolio.save_profile(input).await?))
}

// ============================================================================
// Portfolio items
// ============================================================================

async fn create_skill(
    State(state): State<AppState>,
    Json(input): Json<SkillInput>,
) -> Result<(StatusCode, Json<Skill>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.portfolio.add_skill(input).await?)))
}

async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.portfolio.add_project(input).await?)))
}

async fn create_experience(
    State(state): State<AppState>,
    Json(input): Json<ExperienceInput>,
) -> Result<(StatusCode, Json<Experience>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.portfolio.add_experience(input).await?)))
}

async fn create_education(
    State(state): State<AppState>,
    Json(input): Json<EducationInput>,
) -> Result<(StatusCode, Json<Education>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.portfolio.add_education(input).await?)))
}

async fn create_certification(
    State(state): State<AppState>,
    Json(input): Json<CertificationInput>,
) -> Result<(StatusCode, Json<Certification>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.portfolio.add_certification(input).await?)))
}

/// DELETE /api/admin/{kind}/{id}
async fn delete_portfolio_item(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    let kind: PortfolioKind = kind.parse().map_err(ApiError::not_found)?;
    state.portfolio.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Blog
// ============================================================================

/// POST /api/admin/posts - a published post is broadcast to subscribers
async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.blog.create_post(input).await?)))
}

/// PUT /api/admin/posts/{id} - never broadcasts
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePostInput>,
) -> Result<Json<BlogPost>, ApiError> {
    Ok(Json(state.blog.update_post(id, input).await?))
}

/// DELETE /api/admin/posts/{id} - comments go with the post
async fn delete_post(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.blog.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<TaxonomyInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.blog.create_category(input).await?)))
}

/// DELETE /api/admin/categories/{id} - posts stay, uncategorised
async fn delete_category(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state
        .blog
        .delete_category(id)
        .await
        .map_err(|e| match e {
            crate::services::BlogServiceError::NotFound => ApiError::not_found("Category not found"),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_tag(
    State(state): State<AppState>,
    Json(input): Json<TaxonomyInput>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.blog.create_tag(input).await?)))
}

// ============================================================================
// Moderation
// ============================================================================

/// PUT /api/admin/comments/{id}/active
async fn set_comment_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ActiveInput>,
) -> Result<StatusCode, ApiError> {
    if !state.comments.set_active(id, input.is_active).await? {
        return Err(ApiError::not_found("Comment not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/subscribers
async fn list_subscribers(
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsletterSubscriber>>, ApiError> {
    Ok(Json(state.newsletter.list().await?))
}

/// PUT /api/admin/subscribers/{id}/active
async fn set_subscriber_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ActiveInput>,
) -> Result<StatusCode, ApiError> {
    if !state.newsletter.set_active(id, input.is_active).await? {
        return Err(ApiError::not_found("Subscriber not found"));
    }
    tracing::info!(subscriber_id = id, is_active = input.is_active, "Subscriber updated");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/messages - newest first
async fn list_messages(State(state): State<AppState>) -> Result<Json<Vec<ContactMessage>>, ApiError> {
    Ok(Json(state.contact.list().await?))
}
