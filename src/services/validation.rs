//! Submission validation
//!
//! Field checks for the three visitor-facing inputs: contact messages,
//! newsletter signups and blog comments. A field either passes unchanged
//! (apart from trimming) or the whole submission is rejected with a
//! per-field error map. Nothing is escaped or stripped here; rendering
//! escapes on output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{NewComment, NewContactMessage};

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_EMAIL_MESSAGE: &str = "Enter a valid email address.";
pub const UNSAFE_CONTENT_MESSAGE: &str = "Invalid characters or content not allowed.";
pub const DUPLICATE_SUBSCRIBER_MESSAGE: &str =
    "Newsletter subscriber with this Email already exists.";

pub const NAME_MAX_LEN: usize = 100;
pub const SUBJECT_MAX_LEN: usize = 200;
pub const EMAIL_MAX_LEN: usize = 254;

/// Markup and URI schemes that can execute script
static UNSAFE_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(<script|</script|javascript:|on\w+\s*=|\bexpression\s*\(|vbscript:|data\s*:)")
        .expect("unsafe content pattern is valid")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .expect("email pattern is valid")
});

/// Whether `value` contains script-injection-like content
pub fn contains_unsafe_content(value: &str) -> bool {
    UNSAFE_CONTENT.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= EMAIL_MAX_LEN && EMAIL.is_match(value)
}

/// Lowercase the domain part; the local part is left as typed
pub fn normalize_email(value: &str) -> String {
    match value.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => value.to_string(),
    }
}

/// Error messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors consisting of a single message on one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Accumulates errors while cleaning one submission
struct Cleaner {
    errors: ValidationErrors,
}

impl Cleaner {
    fn new() -> Self {
        Self {
            errors: ValidationErrors::new(),
        }
    }

    /// Required free text: trimmed, length-limited, free of unsafe content
    fn text(&mut self, field: &str, raw: &str, max_len: Option<usize>) -> String {
        let value = raw.trim();
        if value.is_empty() {
            self.errors.add(field, REQUIRED_MESSAGE);
            return String::new();
        }
        if let Some(max) = max_len {
            let len = value.chars().count();
            if len > max {
                self.errors.add(
                    field,
                    format!(
                        "Ensure this value has at most {} characters (it has {}).",
                        max, len
                    ),
                );
            }
        }
        if contains_unsafe_content(value) {
            self.errors.add(field, UNSAFE_CONTENT_MESSAGE);
        }
        value.to_string()
    }

    /// Required email: trimmed, syntax-checked, domain lowercased
    fn email(&mut self, field: &str, raw: &str) -> String {
        let value = raw.trim();
        if value.is_empty() {
            self.errors.add(field, REQUIRED_MESSAGE);
            return String::new();
        }
        if !is_valid_email(value) {
            self.errors.add(field, INVALID_EMAIL_MESSAGE);
            return value.to_string();
        }
        normalize_email(value)
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        self.errors.into_result(value)
    }
}

/// Raw contact form fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<NewContactMessage, ValidationErrors> {
        let mut cleaner = Cleaner::new();
        let name = cleaner.text("name", &self.name, Some(NAME_MAX_LEN));
        let email = cleaner.email("email", &self.email);
        let subject = cleaner.text("subject", &self.subject, Some(SUBJECT_MAX_LEN));
        let message = cleaner.text("message", &self.message, None);
        cleaner.finish(NewContactMessage {
            name,
            email,
            subject,
            message,
        })
    }
}

/// Raw newsletter signup fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsletterForm {
    pub email: String,
}

impl NewsletterForm {
    /// Syntax checks only; uniqueness is checked against storage by the caller
    pub fn validate(&self) -> Result<String, ValidationErrors> {
        let mut cleaner = Cleaner::new();
        let email = cleaner.email("email", &self.email);
        cleaner.finish(email)
    }
}

/// Raw comment fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub name: String,
    pub email: String,
    pub content: String,
}

impl CommentForm {
    pub fn validate(&self, post_id: i64) -> Result<NewComment, ValidationErrors> {
        let mut cleaner = Cleaner::new();
        let name = cleaner.text("name", &self.name, Some(NAME_MAX_LEN));
        let email = cleaner.email("email", &self.email);
        let content = cleaner.text("content", &self.content, None);
        cleaner.finish(NewComment {
            post_id,
            name,
            email,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn contact() -> ContactForm {
        ContactForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            subject: "Hi".into(),
            message: "Hello".into(),
        }
    }

    #[test]
    fn test_valid_contact_is_trimmed() {
        let form = ContactForm {
            name: "  Ada  ".into(),
            subject: "\tHi\n".into(),
            ..contact()
        };
        let cleaned = form.validate().unwrap();
        assert_eq!(cleaned.name, "Ada");
        assert_eq!(cleaned.subject, "Hi");
        assert_eq!(cleaned.message, "Hello");
    }

    #[test]
    fn test_whitespace_only_is_required_error() {
        let form = ContactForm {
            message: "   ".into(),
            ..contact()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("message").unwrap(), [REQUIRED_MESSAGE]);
        assert!(!errors.has("name"));
    }

    #[test]
    fn test_blocklist_patterns_rejected() {
        for bad in [
            "<script>alert(1)</script>",
            "</SCRIPT>",
            "click javascript:void(0)",
            "VBScript:msgbox",
            "data:text/html;base64,xx",
            "data :text",
            "<img src=x onerror=alert(1)>",
            "<div onclick = go()>",
            "width: expression(alert(1))",
        ] {
            assert!(contains_unsafe_content(bad), "should reject {:?}", bad);
            let form = ContactForm {
                message: bad.into(),
                ..contact()
            };
            let errors = form.validate().unwrap_err();
            assert_eq!(errors.get("message").unwrap(), [UNSAFE_CONTENT_MESSAGE]);
        }
    }

    #[test]
    fn test_ordinary_text_passes() {
        for ok in [
            "Looking for a backend engineer",
            "Let's talk about Django and Celery",
            "I can start on Monday",
        ] {
            assert!(!contains_unsafe_content(ok), "should accept {:?}", ok);
        }
    }

    #[test]
    fn test_length_limits() {
        let form = ContactForm {
            name: "x".repeat(101),
            subject: "y".repeat(200),
            ..contact()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("name").unwrap(),
            ["Ensure this value has at most 100 characters (it has 101)."]
        );
        assert!(!errors.has("subject"));
    }

    #[test]
    fn test_email_syntax() {
        for good in ["ada@example.com", "first.last+tag@mail.example.co.uk"] {
            assert!(is_valid_email(good), "{}", good);
        }
        for bad in ["ada", "ada@", "@example.com", "ada@example", "ada@@example.com", "a b@example.com", "ada@exa_mple.com"] {
            assert!(!is_valid_email(bad), "{}", bad);
        }
    }

    #[test]
    fn test_newsletter_normalizes_domain() {
        let form = NewsletterForm {
            email: "  Ada@Example.COM ".into(),
        };
        assert_eq!(form.validate().unwrap(), "Ada@example.com");

        let errors = NewsletterForm { email: "nope".into() }.validate().unwrap_err();
        assert_eq!(errors.get("email").unwrap(), [INVALID_EMAIL_MESSAGE]);
    }

    #[test]
    fn test_comment_collects_all_field_errors() {
        let form = CommentForm {
            name: String::new(),
            email: "bad".into(),
            content: "<script>x</script>".into(),
        };
        let errors = form.validate(7).unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, vec!["content", "email", "name"]);
    }

    #[test]
    fn test_errors_serialize_as_plain_map() {
        let errors = ValidationErrors::single("email", INVALID_EMAIL_MESSAGE);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"email": [INVALID_EMAIL_MESSAGE]})
        );
    }

    proptest! {
        #[test]
        fn prop_script_tag_anywhere_is_rejected(prefix in "[a-zA-Z0-9 .,]{0,40}", suffix in "[a-zA-Z0-9 .,]{0,40}") {
            let form = ContactForm {
                subject: format!("{}<script>alert(1)</script>{}", prefix, suffix),
                ..contact()
            };
            let errors = form.validate().unwrap_err();
            prop_assert!(errors.has("subject"));
        }

        #[test]
        fn prop_plain_words_are_trimmed_and_kept(words in "[a-zA-Z]{1,20}( [a-zA-Z]{1,20}){0,5}", pad in " {0,5}") {
            prop_assume!(!contains_unsafe_content(&words));
            let form = CommentForm {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                content: format!("{}{}{}", pad, words, pad),
            };
            let cleaned = form.validate(1).unwrap();
            prop_assert_eq!(cleaned.content, words);
        }
    }
}
