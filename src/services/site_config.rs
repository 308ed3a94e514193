//! Site configuration service
//!
//! Load-or-initialise and save for the singleton record. Deleting it is not
//! an operation this service offers.

use std::sync::Arc;

use crate::db::repositories::SiteConfigRepository;
use crate::models::SiteConfiguration;

/// Used wherever the configured site name is blank or cannot be read
pub const FALLBACK_SITE_NAME: &str = "Shekhar Dhakal";

#[derive(Debug, thiserror::Error)]
pub enum SiteConfigError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct SiteConfigService {
    repo: Arc<dyn SiteConfigRepository>,
}

impl SiteConfigService {
    pub fn new(repo: Arc<dyn SiteConfigRepository>) -> Self {
        Self { repo }
    }

    /// The singleton, created with defaults on first access
    pub async fn load(&self) -> Result<SiteConfiguration, SiteConfigError> {
        Ok(self.repo.load_or_init().await?)
    }

    /// Replace the stored settings. The id carried by `config` is ignored.
    pub async fn save(&self, config: SiteConfiguration) -> Result<SiteConfiguration, SiteConfigError> {
        if config.site_name.trim().is_empty() {
            return Err(SiteConfigError::ValidationError(
                "site_name cannot be empty".to_string(),
            ));
        }
        Ok(self.repo.save(&config).await?)
    }

    /// Configured site name, or [`FALLBACK_SITE_NAME`] when it is blank or
    /// the record cannot be read
    pub async fn site_name(&self) -> String {
        match self.load().await {
            Ok(config) if !config.site_name.trim().is_empty() => config.site_name,
            Ok(_) => FALLBACK_SITE_NAME.to_string(),
            Err(e) => {
                tracing::warn!("Site configuration unavailable, using fallback name: {}", e);
                FALLBACK_SITE_NAME.to_string()
            }
        }
    }
}
