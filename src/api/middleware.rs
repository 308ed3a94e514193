//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type used by every handler
//! - Admin authorization (static bearer token)

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::{
    BlogService, BlogServiceError, CommentService, ContactService, NewsletterService,
    PortfolioService, PortfolioServiceError, SiteConfigError, SiteConfigService, SubmissionError,
};
use crate::templates::TemplateEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<TemplateEngine>,
    pub site_config: Arc<SiteConfigService>,
    pub portfolio: Arc<PortfolioService>,
    pub blog: Arc<BlogService>,
    pub comments: Arc<CommentService>,
    pub contact: Arc<ContactService>,
    pub newsletter: Arc<NewsletterService>,
    /// Absolute site URL used for canonical links
    pub site_url: Option<String>,
    /// Bearer token for `/api/admin`; the admin API is closed when `None`
    pub admin_token: Option<String>,
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::Validation(errors) => ApiError::with_details(
                "VALIDATION_ERROR",
                "Invalid submission",
                serde_json::to_value(&errors).unwrap_or_default(),
            ),
            SubmissionError::NotFound(message) => ApiError::not_found(message),
            SubmissionError::Internal(e) => internal(e),
        }
    }
}

impl From<BlogServiceError> for ApiError {
    fn from(e: BlogServiceError) -> Self {
        match e {
            BlogServiceError::NotFound => ApiError::not_found("Post not found"),
            BlogServiceError::ValidationError(message) => ApiError::validation_error(message),
            BlogServiceError::SlugConflict(slug) => {
                ApiError::conflict(format!("Slug already in use: {}", slug))
            }
            BlogServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<PortfolioServiceError> for ApiError {
    fn from(e: PortfolioServiceError) -> Self {
        match e {
            PortfolioServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            PortfolioServiceError::ValidationError(message) => ApiError::validation_error(message),
            PortfolioServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<SiteConfigError> for ApiError {
    fn from(e: SiteConfigError) -> Self {
        match e {
            SiteConfigError::ValidationError(message) => ApiError::validation_error(message),
            SiteConfigError::InternalError(e) => internal(e),
        }
    }
}

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Request failed: {:#}", e);
    ApiError::internal_error("Internal server error")
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Admin authorization middleware
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state
        .admin_token
        .as_deref()
        .ok_or_else(|| ApiError::forbidden("Admin API is disabled"))?;

    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(ApiError::unauthorized("Invalid authentication token"));
    }

    Ok(next.run(request).await)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (ApiError::internal_error("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secrets"));
    }
}
