//! Database layer
//!
//! SQLite serves local development, MySQL serves production; the driver is picked
//! from configuration. Repositories hold a [`DynDatabasePool`] and dispatch on the
//! driver, either explicitly where the dialects diverge or through [`on_pool!`]
//! where the same SQL runs on both.

pub mod migrations;
pub mod pool;
pub mod repositories;

use sqlx::{mysql::MySqlQueryResult, sqlite::SqliteQueryResult};

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Run the same body against whichever sqlx pool backs a [`DynDatabasePool`].
///
/// The body is expanded once per driver, so it may use `?` and `.await` and is
/// type-checked against both `SqlitePool` and `MySqlPool`.
///
/// ```ignore
/// let count: i64 = on_pool!(self.pool, |p| {
///     sqlx::query_scalar("SELECT COUNT(*) FROM comments").fetch_one(p).await?
/// });
/// ```
#[macro_export]
macro_rules! on_pool {
    ($pool:expr, |$p:ident| $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $p = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool unavailable"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $p = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool unavailable"))?;
                $body
            }
        }
    };
}

/// Id of the row created by an `INSERT`, whichever backend ran it
pub trait InsertedId {
    fn inserted_id(&self) -> i64;
}

impl InsertedId for SqliteQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertedId for MySqlQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}

/// Whether an error chain bottoms out in a unique/primary key violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}
