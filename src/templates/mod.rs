//! Template engine
//!
//! Page and email templates rendered with Tera.
//! - Built-in templates are compiled into the binary
//! - A configured directory can override any of them by relative name
//! - `skill_icon` filter maps a skill to a Font Awesome class

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera, Value};

mod error;

pub use error::TemplateError;

/// Templates shipped with the binary, keyed by their relative name
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("error.html", include_str!("../../templates/error.html")),
    ("portfolio/index.html", include_str!("../../templates/portfolio/index.html")),
    ("blog/blog_list.html", include_str!("../../templates/blog/blog_list.html")),
    ("blog/blog_detail.html", include_str!("../../templates/blog/blog_detail.html")),
    (
        "portfolio/email/base_email.html",
        include_str!("../../templates/portfolio/email/base_email.html"),
    ),
    (
        "portfolio/email/contact_received.html",
        include_str!("../../templates/portfolio/email/contact_received.html"),
    ),
    (
        "portfolio/email/welcome_newsletter.html",
        include_str!("../../templates/portfolio/email/welcome_newsletter.html"),
    ),
    (
        "portfolio/email/new_article_notify.html",
        include_str!("../../templates/portfolio/email/new_article_notify.html"),
    ),
];

/// Icon used when a skill has neither an explicit class nor a known name
pub const DEFAULT_SKILL_ICON: &str = "fa-solid fa-code";

static SKILL_ICONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("Python", "fa-brands fa-python");
    m.insert("Django", "fa-solid fa-server");
    m.insert("Django/DRF", "fa-solid fa-server");
    m.insert("DRF", "fa-solid fa-server");
    m.insert("Robocorp", "fa-solid fa-robot");
    m.insert("Docker", "fa-brands fa-docker");
    m.insert("FastAPI", "fa-solid fa-bolt");
    m.insert("PostgreSQL", "fa-solid fa-database");
    m.insert("Selenium", "fa-solid fa-spider");
    m.insert("CI/CD", "fa-solid fa-arrows-rotate");
    m.insert("Celery", "fa-solid fa-list-check");
    m.insert("RabbitMQ", "fa-solid fa-rabbit");
    m.insert("Laravel", "fa-brands fa-laravel");
    m.insert("Nginx", "fa-solid fa-server");
    m.insert("Paramiko", "fa-solid fa-terminal");
    m.insert("Grafana", "fa-solid fa-chart-line");
    m.insert("Redis", "fa-solid fa-database");
    m.insert("Git", "fa-brands fa-git-alt");
    m.insert("GitHub", "fa-brands fa-github");
    m.insert("Linux", "fa-brands fa-linux");
    m.insert("AWS", "fa-brands fa-aws");
    m.insert("JavaScript", "fa-brands fa-js");
    m.insert("React", "fa-brands fa-react");
    m.insert("HTML", "fa-brands fa-html5");
    m.insert("CSS", "fa-brands fa-css3-alt");
    m.insert("PHP", "fa-brands fa-php");
    m.insert("MySQL", "fa-solid fa-database");
    m.insert("MongoDB", "fa-solid fa-database");
    m.insert("RPA", "fa-solid fa-robot");
    m.insert("DevOps", "fa-solid fa-gears");
    m.insert("Backend", "fa-solid fa-code");
    m.insert("Frontend", "fa-solid fa-palette");
    m
});

/// Font Awesome class for a skill: its own class when it is one, else the
/// class known for its name, else [`DEFAULT_SKILL_ICON`].
pub fn skill_icon<'a>(name: &str, icon_class: &'a str) -> &'a str {
    if icon_class.contains("fa-") {
        return icon_class;
    }
    SKILL_ICONS.get(name).copied().unwrap_or(DEFAULT_SKILL_ICON)
}

fn skill_icon_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let (name, icon_class) = match value {
        Value::Object(skill) => (
            skill.get("name").and_then(Value::as_str).unwrap_or_default(),
            skill.get("icon_class").and_then(Value::as_str).unwrap_or_default(),
        ),
        Value::String(name) => (name.as_str(), ""),
        _ => return Ok(Value::String(DEFAULT_SKILL_ICON.to_string())),
    };

    Ok(Value::String(skill_icon(name, icon_class).to_string()))
}

/// Tera wrapper holding built-in and overriding templates
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Built-in templates only
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::new(None)
    }

    /// Built-in templates, with `.html` files under `override_dir` replacing
    /// (or adding to) them by relative path
    pub fn new(override_dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut templates: Vec<(String, String)> = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();

        if let Some(dir) = override_dir {
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            for (name, content) in overrides {
                tracing::debug!(template = %name, "Using template override");
                match templates.iter_mut().find(|(existing, _)| *existing == name) {
                    Some(entry) => entry.1 = content,
                    None => templates.push((name, content)),
                }
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| TemplateError::Load(flatten_error(&e)))?;
        tera.register_filter("skill_icon", skill_icon_filter);

        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, TemplateError> {
        if !self.has_template(template) {
            return Err(TemplateError::NotFound(template.to_string()));
        }
        self.tera
            .render(template, context)
            .map_err(|e| TemplateError::Render(format!("Failed to render '{}': {}", template, flatten_error(&e))))
    }

    /// Render `template`, falling back to `error.html` and then to a bare
    /// HTML page so a response body is always produced
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {}", template, e);

                let mut error_context = context.clone();
                error_context.insert("status", &500);
                error_context.insert("error_message", "Something went wrong while rendering this page.");

                self.render("error.html", &error_context).unwrap_or_else(|error_template_err| {
                    tracing::warn!("Failed to render error template: {}", error_template_err);
                    simple_error_page()
                })
            }
        }
    }
}

fn flatten_error(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), TemplateError> {
    if !current_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| TemplateError::Load(format!("Template outside base: {:?}", path)))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            templates.push((template_name, fs::read_to_string(&path)?));
        }
    }

    Ok(())
}

fn simple_error_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Server Error</title></head>
<body><h1>Server Error</h1><p>Something went wrong while rendering this page.</p></body>
</html>"#
        .to_string()
}
