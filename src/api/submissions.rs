//! AJAX submission endpoints
//!
//! - POST /contact/submit/
//! - POST /newsletter/submit/
//! - POST /blog/{slug}/comments/
//!
//! Each path is also routed without its trailing slash.
//!
//! Each accepts a JSON or urlencoded body and answers
//! `{success, message, errors?}` with 200 on success and 400 on validation
//! failure.

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::services::comment::COMMENT_INVALID_MESSAGE;
use crate::services::contact::CONTACT_INVALID_MESSAGE;
use crate::services::newsletter::NEWSLETTER_INVALID_MESSAGE;
use crate::services::{CommentForm, ContactForm, NewsletterForm, SubmissionError, ValidationErrors};

/// Body parsed as JSON when the request says so, as a urlencoded form otherwise
pub struct JsonOrForm<T>(pub T);

impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let parsed = if is_json {
            Json::<T>::from_request(req, state).await.map(|Json(v)| v).map_err(|e| e.body_text())
        } else {
            Form::<T>::from_request(req, state).await.map(|Form(v)| v).map_err(|e| e.body_text())
        };

        parsed.map(JsonOrForm).map_err(|reason| {
            tracing::debug!(%reason, "Unreadable submission body");
            SubmissionResponse::failure("Invalid request body.", None).into_response()
        })
    }
}

/// Reply of every AJAX submission endpoint
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl SubmissionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: None,
        }
    }

    pub fn failure(message: impl Into<String>, errors: Option<ValidationErrors>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors,
        }
    }
}

impl IntoResponse for SubmissionResponse {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        (status, Json(self)).into_response()
    }
}

/// Validation failures become a 400 reply with `invalid_message`; anything
/// else is an [`ApiError`]
fn reply<T>(
    result: Result<crate::services::SubmissionReceipt<T>, SubmissionError>,
    invalid_message: &str,
) -> Result<SubmissionResponse, ApiError> {
    match result {
        Ok(receipt) => Ok(SubmissionResponse::ok(receipt.message)),
        Err(SubmissionError::Validation(errors)) => {
            Ok(SubmissionResponse::failure(invalid_message, Some(errors)))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /contact/submit/
pub async fn contact_submit(
    State(state): State<AppState>,
    JsonOrForm(form): JsonOrForm<ContactForm>,
) -> Result<SubmissionResponse, ApiError> {
    reply(state.contact.submit(&form).await, CONTACT_INVALID_MESSAGE)
}

/// POST /newsletter/submit/
pub async fn newsletter_submit(
    State(state): State<AppState>,
    JsonOrForm(form): JsonOrForm<NewsletterForm>,
) -> Result<SubmissionResponse, ApiError> {
    reply(state.newsletter.subscribe(&form).await, NEWSLETTER_INVALID_MESSAGE)
}

/// POST /blog/{slug}/comments/
pub async fn comment_submit(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonOrForm(form): JsonOrForm<CommentForm>,
) -> Result<SubmissionResponse, ApiError> {
    reply(state.comments.submit(&slug, &form).await, COMMENT_INVALID_MESSAGE)
}
