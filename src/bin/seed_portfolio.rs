//! Load portfolio content from a YAML file into the database.
//!
//! Usage: `cargo run --bin seed-portfolio -- [portfolio.yml] [--clear]`
//!
//! `--clear` removes existing portfolio items first. The site configuration is
//! created with defaults when missing and is never cleared.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use eportfolio::{
    config::Config,
    db::{
        self,
        repositories::{SqlxPortfolioRepository, SqlxSiteConfigRepository},
    },
    services::{PortfolioSeed, PortfolioService, SiteConfigService},
};

const DEFAULT_SEED_FILE: &str = "portfolio.yml";

struct Args {
    seed_file: PathBuf,
    clear: bool,
}

fn parse_args() -> Result<Args> {
    let mut seed_file = None;
    let mut clear = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--clear" => clear = true,
            flag if flag.starts_with("--") => bail!("unknown option: {}", flag),
            path if seed_file.is_none() => seed_file = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument: {}", extra),
        }
    }

    Ok(Args {
        seed_file: seed_file.unwrap_or_else(|| PathBuf::from(DEFAULT_SEED_FILE)),
        clear,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eportfolio=info".into()),
        )
        .init();

    let args = parse_args()?;

    let content = std::fs::read_to_string(&args.seed_file)
        .with_context(|| format!("failed to read {}", args.seed_file.display()))?;
    let seed: PortfolioSeed = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid seed file {}", args.seed_file.display()))?;

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let site_config = SiteConfigService::new(SqlxSiteConfigRepository::boxed(pool.clone()));
    let site = site_config.load().await?;
    tracing::info!("Site configuration ready: {}", site.site_name);

    let portfolio = PortfolioService::new(SqlxPortfolioRepository::boxed(pool));
    if args.clear {
        portfolio.clear().await?;
    }

    let summary = portfolio.import(seed).await?;
    tracing::info!(
        profile = summary.profile,
        skills = summary.skills,
        projects = summary.projects,
        experiences = summary.experiences,
        education = summary.education,
        certifications = summary.certifications,
        "Portfolio seeded from {}",
        args.seed_file.display()
    );

    Ok(())
}
