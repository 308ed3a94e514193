//! Embedded schema migrations
//!
//! Each migration carries one SQL body per backend. Applied versions are
//! recorded in `_migrations`, so running the set again is a no-op.

use anyhow::{Context, Result};
use sqlx::Row;

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A schema change with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_site_configuration",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS site_configuration (
                id INTEGER PRIMARY KEY,
                site_name VARCHAR(255) NOT NULL,
                meta_title VARCHAR(255) NOT NULL,
                meta_description TEXT NOT NULL,
                meta_keywords VARCHAR(500) NOT NULL,
                about_section_title VARCHAR(100) NOT NULL,
                skills_section_title VARCHAR(100) NOT NULL,
                experience_section_title VARCHAR(100) NOT NULL,
                portfolio_section_title VARCHAR(100) NOT NULL,
                contact_section_title VARCHAR(100) NOT NULL,
                email VARCHAR(254) NOT NULL,
                phone VARCHAR(50) NOT NULL,
                address VARCHAR(255) NOT NULL DEFAULT '',
                location VARCHAR(255) NOT NULL DEFAULT '',
                github_link VARCHAR(200) NOT NULL DEFAULT '',
                linkedin_link VARCHAR(200) NOT NULL DEFAULT '',
                twitter_link VARCHAR(200) NOT NULL DEFAULT '',
                facebook_link VARCHAR(200) NOT NULL DEFAULT ''
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS site_configuration (
                id BIGINT PRIMARY KEY,
                site_name VARCHAR(255) NOT NULL,
                meta_title VARCHAR(255) NOT NULL,
                meta_description TEXT NOT NULL,
                meta_keywords VARCHAR(500) NOT NULL,
                about_section_title VARCHAR(100) NOT NULL,
                skills_section_title VARCHAR(100) NOT NULL,
                experience_section_title VARCHAR(100) NOT NULL,
                portfolio_section_title VARCHAR(100) NOT NULL,
                contact_section_title VARCHAR(100) NOT NULL,
                email VARCHAR(254) NOT NULL,
                phone VARCHAR(50) NOT NULL,
                address VARCHAR(255) NOT NULL DEFAULT '',
                location VARCHAR(255) NOT NULL DEFAULT '',
                github_link VARCHAR(200) NOT NULL DEFAULT '',
                linkedin_link VARCHAR(200) NOT NULL DEFAULT '',
                twitter_link VARCHAR(200) NOT NULL DEFAULT '',
                facebook_link VARCHAR(200) NOT NULL DEFAULT ''
            ) DEFAULT CHARSET = utf8mb4;
        "#,
    },
    Migration {
        version: 2,
        name: "create_portfolio_content",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                role VARCHAR(200) NOT NULL,
                bio TEXT NOT NULL,
                hero_title VARCHAR(200) NOT NULL DEFAULT '',
                hero_subtitle VARCHAR(300) NOT NULL DEFAULT '',
                avatar VARCHAR(255),
                current_company VARCHAR(200) NOT NULL DEFAULT '',
                current_role_location VARCHAR(200) NOT NULL DEFAULT '',
                about_bullet_1 TEXT NOT NULL DEFAULT '',
                about_bullet_2 TEXT NOT NULL DEFAULT '',
                about_bullet_3 TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS skills (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(50) NOT NULL,
                category VARCHAR(20) NOT NULL,
                icon_class VARCHAR(50) NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                image VARCHAR(255),
                tech_stack VARCHAR(200) NOT NULL,
                live_link VARCHAR(200) NOT NULL DEFAULT '',
                github_link VARCHAR(200) NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0,
                icon_name VARCHAR(50) NOT NULL DEFAULT '',
                accent_color VARCHAR(30) NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS experiences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company VARCHAR(200) NOT NULL,
                role VARCHAR(200) NOT NULL,
                duration VARCHAR(100) NOT NULL,
                description TEXT NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                is_primary BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS education (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                duration VARCHAR(100) NOT NULL,
                degree VARCHAR(200) NOT NULL,
                institution VARCHAR(255) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS certifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                issuer VARCHAR(200) NOT NULL,
                year VARCHAR(20) NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                role VARCHAR(200) NOT NULL,
                bio TEXT NOT NULL,
                hero_title VARCHAR(200) NOT NULL DEFAULT '',
                hero_subtitle VARCHAR(300) NOT NULL DEFAULT '',
                avatar VARCHAR(255),
                current_company VARCHAR(200) NOT NULL DEFAULT '',
                current_role_location VARCHAR(200) NOT NULL DEFAULT '',
                about_bullet_1 TEXT NOT NULL,
                about_bullet_2 TEXT NOT NULL,
                about_bullet_3 TEXT NOT NULL
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS skills (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(50) NOT NULL,
                category VARCHAR(20) NOT NULL,
                icon_class VARCHAR(50) NOT NULL DEFAULT '',
                sort_order INT NOT NULL DEFAULT 0
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS projects (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                image VARCHAR(255),
                tech_stack VARCHAR(200) NOT NULL,
                live_link VARCHAR(200) NOT NULL DEFAULT '',
                github_link VARCHAR(200) NOT NULL DEFAULT '',
                sort_order INT NOT NULL DEFAULT 0,
                icon_name VARCHAR(50) NOT NULL DEFAULT '',
                accent_color VARCHAR(30) NOT NULL DEFAULT ''
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS experiences (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                company VARCHAR(200) NOT NULL,
                role VARCHAR(200) NOT NULL,
                duration VARCHAR(100) NOT NULL,
                description TEXT NOT NULL,
                sort_order INT NOT NULL DEFAULT 0,
                is_primary BOOLEAN NOT NULL DEFAULT FALSE
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS education (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                duration VARCHAR(100) NOT NULL,
                degree VARCHAR(200) NOT NULL,
                institution VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                sort_order INT NOT NULL DEFAULT 0
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS certifications (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(200) NOT NULL,
                issuer VARCHAR(200) NOT NULL,
                year VARCHAR(20) NOT NULL DEFAULT '',
                sort_order INT NOT NULL DEFAULT 0
            ) DEFAULT CHARSET = utf8mb4;
        "#,
    },
    Migration {
        version: 3,
        name: "create_submissions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS contact_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(254) NOT NULL,
                subject VARCHAR(200) NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS newsletter_subscribers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(254) NOT NULL UNIQUE COLLATE NOCASE,
                subscribed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                is_active BOOLEAN NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_subscribers_active ON newsletter_subscribers(is_active);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS contact_messages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(254) NOT NULL,
                subject VARCHAR(200) NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS newsletter_subscribers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(254) NOT NULL UNIQUE,
                subscribed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                is_active BOOLEAN NOT NULL DEFAULT TRUE
            ) DEFAULT CHARSET = utf8mb4;
            CREATE INDEX idx_subscribers_active ON newsletter_subscribers(is_active);
        "#,
    },
    Migration {
        version: 4,
        name: "create_blog",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS blog_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                excerpt TEXT NOT NULL,
                content TEXT NOT NULL,
                cover_image VARCHAR(255),
                category_id INTEGER,
                is_published BOOLEAN NOT NULL DEFAULT 1,
                meta_title VARCHAR(200) NOT NULL DEFAULT '',
                meta_description VARCHAR(320) NOT NULL DEFAULT '',
                meta_keywords VARCHAR(500) NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_blog_posts_published ON blog_posts(is_published, created_at);
            CREATE TABLE IF NOT EXISTS blog_post_tags (
                post_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (post_id, tag_id),
                FOREIGN KEY (post_id) REFERENCES blog_posts(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(254) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                FOREIGN KEY (post_id) REFERENCES blog_posts(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS blog_posts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                excerpt TEXT NOT NULL,
                content LONGTEXT NOT NULL,
                cover_image VARCHAR(255),
                category_id BIGINT,
                is_published BOOLEAN NOT NULL DEFAULT TRUE,
                meta_title VARCHAR(200) NOT NULL DEFAULT '',
                meta_description VARCHAR(320) NOT NULL DEFAULT '',
                meta_keywords VARCHAR(500) NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL
            ) DEFAULT CHARSET = utf8mb4;
            CREATE INDEX idx_blog_posts_published ON blog_posts(is_published, created_at);
            CREATE TABLE IF NOT EXISTS blog_post_tags (
                post_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL,
                PRIMARY KEY (post_id, tag_id),
                FOREIGN KEY (post_id) REFERENCES blog_posts(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            ) DEFAULT CHARSET = utf8mb4;
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                post_id BIGINT NOT NULL,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(254) NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                FOREIGN KEY (post_id) REFERENCES blog_posts(id) ON DELETE CASCADE
            ) DEFAULT CHARSET = utf8mb4;
            CREATE INDEX idx_comments_post ON comments(post_id, created_at);
        "#,
    },
];

/// Apply every migration not yet recorded. Returns how many ran.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = applied_versions(pool).await?;
    let mut count = 0;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        tracing::info!(version = migration.version, name = migration.name, "Applying migration");
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .count())
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn applied_versions(pool: &DynDatabasePool) -> Result<Vec<i32>> {
    let versions = crate::on_pool!(pool, |p| {
        sqlx::query("SELECT version FROM _migrations ORDER BY version")
            .fetch_all(p)
            .await?
            .iter()
            .map(|row| row.try_get::<i32, _>("version"))
            .collect::<Result<Vec<_>, _>>()?
    });
    Ok(versions)
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let body = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    for statement in split_sql_statements(body) {
        pool.execute(statement)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    crate::on_pool!(pool, |p| {
        sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(p)
            .await?;
    });

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split a migration body on `;`, dropping empty and comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_comment_only(s))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT);\n-- note\n;\n  CREATE TABLE b (id INT)  ";
        assert_eq!(
            split_sql_statements(sql),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );
    }

    #[test]
    fn test_versions_are_unique_and_ordered() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_email_unique_ignores_case() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO newsletter_subscribers (email) VALUES (?)")
            .bind("ada@example.com")
            .execute(sqlite)
            .await
            .expect("first insert");
        let dup = sqlx::query("INSERT INTO newsletter_subscribers (email) VALUES (?)")
            .bind("ADA@example.com")
            .execute(sqlite)
            .await;

        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_deleting_post_cascades_to_comments() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO blog_posts (id, title, slug, excerpt, content) VALUES (1, 't', 's', 'e', 'c')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO comments (post_id, name, email, content) VALUES (1, 'n', 'n@example.com', 'hi')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("DELETE FROM blog_posts WHERE id = 1")
            .execute(sqlite)
            .await
            .unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(sqlite)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
