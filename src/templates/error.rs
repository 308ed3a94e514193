//! Template engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template registered under this name
    #[error("Template not found: {0}")]
    NotFound(String),

    /// A template failed to parse or register
    #[error("Failed to load templates: {0}")]
    Load(String),

    /// Rendering failed, with the tera cause chain flattened
    #[error("Template error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
