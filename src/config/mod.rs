//! Configuration management
//!
//! Configuration is read from `config.yml` and then overridden by `EPORTFOLIO_*`
//! environment variables. Every value has a default, so a missing or empty file
//! yields a working local setup (SQLite database, console mail sink).
//!
//! The `environment` switch mirrors the two deployment profiles:
//! - `local`: permissive defaults, mail is printed instead of delivered
//! - `production`: [`Config::validate`] insists on explicit origins, a real mail
//!   backend and database credentials

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Deployment profile
    #[serde(default)]
    pub environment: Environment,
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Outbound mail configuration
    #[serde(default)]
    pub mail: MailConfig,
    /// Static and media storage roots
    #[serde(default)]
    pub media: MediaConfig,
    /// Template overrides
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Admin API access
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Deployment profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Production,
}

impl Environment {
    /// Parse a profile name, falling back to `Local` for anything unknown
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "production" => Self::Production,
            _ => Self::Local,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Absolute public URL of the site, used for links inside emails
    #[serde(default)]
    pub site_url: Option<String>,
    /// Origins allowed to call the site cross-origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            site_url: None,
            allowed_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/eportfolio.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (local default)
    #[default]
    Sqlite,
    /// MySQL (production)
    Mysql,
}

/// Which mail sink receives outgoing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    /// Write messages to the log instead of sending them
    #[default]
    Console,
    /// Deliver through an SMTP relay
    Smtp,
    /// Keep messages in an in-process outbox
    Memory,
}

/// Transport security for the SMTP backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailSecurity {
    /// Plain connection upgraded with STARTTLS
    #[default]
    Starttls,
    /// Implicit TLS from the first byte
    Ssl,
    /// No encryption (local relays only)
    None,
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub backend: MailBackend,
    #[serde(default = "default_mail_host")]
    pub host: String,
    #[serde(default = "default_mail_port")]
    pub port: u16,
    #[serde(default)]
    pub security: MailSecurity,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address; falls back to the username, then `noreply@localhost`
    #[serde(default)]
    pub from: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend: MailBackend::default(),
            host: default_mail_host(),
            port: default_mail_port(),
            security: MailSecurity::default(),
            username: String::new(),
            password: String::new(),
            from: None,
        }
    }
}

fn default_mail_host() -> String {
    "localhost".to_string()
}

fn default_mail_port() -> u16 {
    587
}

impl MailConfig {
    /// Address used in the `From` header of every outgoing message
    pub fn sender(&self) -> String {
        self.from
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .or_else(|| {
                let user = self.username.trim();
                (!user.is_empty()).then(|| user.to_string())
            })
            .unwrap_or_else(|| "noreply@localhost".to_string())
    }
}

/// Static and media storage roots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            static_root: default_static_root(),
            media_root: default_media_root(),
        }
    }
}

fn default_static_root() -> PathBuf {
    PathBuf::from("static")
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

/// Template overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory whose `.html` files replace the built-in templates of the same name
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Admin API access
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token for `/api/admin`; the admin API is disabled while empty
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is an error that
    /// carries the line and column of the problem.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file, apply environment overrides and validate
    /// the result against the selected profile.
    ///
    /// Recognised variables:
    /// - EPORTFOLIO_ENVIRONMENT
    /// - EPORTFOLIO_SERVER_HOST, EPORTFOLIO_SERVER_PORT, EPORTFOLIO_SITE_URL
    /// - EPORTFOLIO_ALLOWED_ORIGINS (comma separated)
    /// - EPORTFOLIO_DATABASE_DRIVER, EPORTFOLIO_DATABASE_URL
    /// - EPORTFOLIO_MAIL_BACKEND, EPORTFOLIO_MAIL_HOST, EPORTFOLIO_MAIL_PORT,
    ///   EPORTFOLIO_MAIL_SECURITY, EPORTFOLIO_MAIL_USERNAME, EPORTFOLIO_MAIL_PASSWORD,
    ///   EPORTFOLIO_MAIL_FROM
    /// - EPORTFOLIO_STATIC_ROOT, EPORTFOLIO_MEDIA_ROOT, EPORTFOLIO_TEMPLATES_PATH
    /// - EPORTFOLIO_ADMIN_TOKEN
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(env) = std::env::var("EPORTFOLIO_ENVIRONMENT") {
            self.environment = Environment::from_name(&env);
        }

        if let Ok(host) = std::env::var("EPORTFOLIO_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("EPORTFOLIO_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("EPORTFOLIO_SITE_URL") {
            self.server.site_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Ok(origins) = std::env::var("EPORTFOLIO_ALLOWED_ORIGINS") {
            self.server.allowed_origins = split_list(&origins);
        }

        if let Ok(driver) = std::env::var("EPORTFOLIO_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("EPORTFOLIO_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(backend) = std::env::var("EPORTFOLIO_MAIL_BACKEND") {
            match backend.to_lowercase().as_str() {
                "console" => self.mail.backend = MailBackend::Console,
                "smtp" => self.mail.backend = MailBackend::Smtp,
                "memory" => self.mail.backend = MailBackend::Memory,
                _ => {}
            }
        }
        if let Ok(host) = std::env::var("EPORTFOLIO_MAIL_HOST") {
            self.mail.host = host;
        }
        if let Ok(port) = std::env::var("EPORTFOLIO_MAIL_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.mail.port = port;
            }
        }
        if let Ok(security) = std::env::var("EPORTFOLIO_MAIL_SECURITY") {
            match security.to_lowercase().as_str() {
                "starttls" | "tls" => self.mail.security = MailSecurity::Starttls,
                "ssl" => self.mail.security = MailSecurity::Ssl,
                "none" => self.mail.security = MailSecurity::None,
                _ => {}
            }
        }
        if let Ok(user) = std::env::var("EPORTFOLIO_MAIL_USERNAME") {
            self.mail.username = user;
        }
        if let Ok(password) = std::env::var("EPORTFOLIO_MAIL_PASSWORD") {
            self.mail.password = password;
        }
        if let Ok(from) = std::env::var("EPORTFOLIO_MAIL_FROM") {
            self.mail.from = Some(from);
        }

        if let Ok(root) = std::env::var("EPORTFOLIO_STATIC_ROOT") {
            self.media.static_root = PathBuf::from(root);
        }
        if let Ok(root) = std::env::var("EPORTFOLIO_MEDIA_ROOT") {
            self.media.media_root = PathBuf::from(root);
        }
        if let Ok(path) = std::env::var("EPORTFOLIO_TEMPLATES_PATH") {
            self.templates.path = Some(PathBuf::from(path));
        }
        if let Ok(token) = std::env::var("EPORTFOLIO_ADMIN_TOKEN") {
            self.admin.api_token = Some(token);
        }
    }

    /// Check the configuration against the selected profile
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment != Environment::Production {
            return Ok(());
        }

        if self.server.allowed_origins.is_empty() {
            return Err(ConfigError::ValidationError(
                "production requires at least one allowed origin".to_string(),
            ));
        }
        if self.mail.backend != MailBackend::Smtp {
            return Err(ConfigError::ValidationError(
                "production requires the smtp mail backend".to_string(),
            ));
        }
        if self.database.driver == DatabaseDriver::Mysql && self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "production requires a database url".to_string(),
            ));
        }

        Ok(())
    }

    /// The admin token, if one is configured and non-blank
    pub fn admin_token(&self) -> Option<&str> {
        self.admin
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
