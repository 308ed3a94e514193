//! Site configuration repository
//!
//! The table holds at most one row, keyed by [`SITE_CONFIG_ID`]. Reads go
//! through an insert-if-absent on that key so concurrent first reads cannot
//! create a second row, and saves always upsert the same key. There is no
//! delete.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{SiteConfiguration, SITE_CONFIG_ID};
use crate::on_pool;

const COLUMNS: &str = "id, site_name, meta_title, meta_description, meta_keywords, \
    about_section_title, skills_section_title, experience_section_title, \
    portfolio_section_title, contact_section_title, email, phone, address, location, \
    github_link, linkedin_link, twitter_link, facebook_link";

const PLACEHOLDERS: &str = "?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?";

/// Storage for the site configuration singleton
#[async_trait]
pub trait SiteConfigRepository: Send + Sync {
    /// Load the singleton, creating it from defaults when absent
    async fn load_or_init(&self) -> Result<SiteConfiguration>;

    /// Persist `config` under the singleton key, whatever id it carries
    async fn save(&self, config: &SiteConfiguration) -> Result<SiteConfiguration>;

    /// Number of stored rows. Anything other than 0 or 1 is a bug.
    async fn row_count(&self) -> Result<i64>;
}

pub struct SqlxSiteConfigRepository {
    pool: DynDatabasePool,
}

impl SqlxSiteConfigRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SiteConfigRepository> {
        Arc::new(Self::new(pool))
    }

    /// Write `config` under the singleton key. `replace` decides whether an
    /// existing row is overwritten or left alone.
    async fn write(&self, config: &SiteConfiguration, replace: bool) -> Result<()> {
        let sql = singleton_insert_sql(self.pool.driver(), replace);
        on_pool!(self.pool, |p| {
            sqlx::query(&sql)
                .bind(SITE_CONFIG_ID)
                .bind(&config.site_name)
                .bind(&config.meta_title)
                .bind(&config.meta_description)
                .bind(&config.meta_keywords)
                .bind(&config.about_section_title)
                .bind(&config.skills_section_title)
                .bind(&config.experience_section_title)
                .bind(&config.portfolio_section_title)
                .bind(&config.contact_section_title)
                .bind(&config.email)
                .bind(&config.phone)
                .bind(&config.address)
                .bind(&config.location)
                .bind(&config.github_link)
                .bind(&config.linkedin_link)
                .bind(&config.twitter_link)
                .bind(&config.facebook_link)
                .execute(p)
                .await?;
        });
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<SiteConfiguration>> {
        let row = on_pool!(self.pool, |p| {
            sqlx::query_as::<_, SiteConfiguration>(
                "SELECT * FROM site_configuration WHERE id = ?",
            )
            .bind(SITE_CONFIG_ID)
            .fetch_optional(p)
            .await?
        });
        Ok(row)
    }
}

fn singleton_insert_sql(driver: DatabaseDriver, replace: bool) -> String {
    let updates = COLUMNS
        .split(',')
        .map(str::trim)
        .filter(|c| *c != "id")
        .map(|c| match driver {
            DatabaseDriver::Sqlite => format!("{c} = excluded.{c}"),
            DatabaseDriver::Mysql => format!("{c} = VALUES({c})"),
        })
        .collect::<Vec<_>>()
        .join(", ");

    match (driver, replace) {
        (DatabaseDriver::Sqlite, false) => format!(
            "INSERT OR IGNORE INTO site_configuration ({COLUMNS}) VALUES ({PLACEHOLDERS})"
        ),
        (DatabaseDriver::Mysql, false) => format!(
            "INSERT IGNORE INTO site_configuration ({COLUMNS}) VALUES ({PLACEHOLDERS})"
        ),
        (DatabaseDriver::Sqlite, true) => format!(
            "INSERT INTO site_configuration ({COLUMNS}) VALUES ({PLACEHOLDERS}) \
             ON CONFLICT(id) DO UPDATE SET {updates}"
        ),
        (DatabaseDriver::Mysql, true) => format!(
            "INSERT INTO site_configuration ({COLUMNS}) VALUES ({PLACEHOLDERS}) \
             ON DUPLICATE KEY UPDATE {updates}"
        ),
    }
}

#[async_trait]
impl SiteConfigRepository for SqlxSiteConfigRepository {
    async fn load_or_init(&self) -> Result<SiteConfiguration> {
        if let Some(config) = self.fetch().await? {
            return Ok(config);
        }

        self.write(&SiteConfiguration::default(), false)
            .await
            .context("Failed to initialise site configuration")?;

        self.fetch()
            .await?
            .context("Site configuration missing after initialisation")
    }

    async fn save(&self, config: &SiteConfiguration) -> Result<SiteConfiguration> {
        self.write(config, true)
            .await
            .context("Failed to save site configuration")?;

        self.fetch()
            .await?
            .context("Site configuration missing after save")
    }

    async fn row_count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM site_configuration")
                .fetch_one(p)
                .await?
        });
        Ok(count)
    }
}
