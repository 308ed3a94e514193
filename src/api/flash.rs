//! One-shot flash messages
//!
//! A redirecting handler stores a message in the `flash` cookie; the next
//! rendered page shows it and expires the cookie.

use axum::http::{header, HeaderMap, HeaderValue};
use serde::Serialize;

const FLASH_COOKIE: &str = "flash";
const FLASH_MAX_AGE_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

impl FlashLevel {
    fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(FlashLevel::Success),
            "warning" => Some(FlashLevel::Warning),
            "error" => Some(FlashLevel::Error),
            _ => None,
        }
    }
}

/// A message shown once on the next page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub text: String,
}

impl Flash {
    pub fn new(level: FlashLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Error, text)
    }

    /// `Set-Cookie` value carrying this message
    pub fn to_cookie(&self) -> Option<HeaderValue> {
        let value = urlencoding::encode(&format!("{}|{}", self.level.as_str(), self.text)).into_owned();
        HeaderValue::from_str(&format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            FLASH_COOKIE, value, FLASH_MAX_AGE_SECS
        ))
        .ok()
    }

    /// Read the pending message from the request cookies, if any
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .map(str::trim)
            .find_map(|cookie| cookie.strip_prefix("flash="))?;

        let decoded = urlencoding::decode(raw).ok()?;
        let (level, text) = decoded.split_once('|')?;
        Some(Self::new(FlashLevel::parse(level)?, text))
    }
}

/// `Set-Cookie` value that removes the flash cookie
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}
