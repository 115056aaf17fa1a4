#![cfg_attr(
    not(any(feature = "pg", feature = "sqlite")),
    allow(unused_imports, unused_variables, dead_code, unreachable_code)
)]

//! Store plumbing for the admin engine.
//!
//! A [`DbHandle`] owns one sqlx pool plus the SeaORM connection built on top
//! of it. The [`condition`] module lowers `admin_query::Expr` trees into
//! `sea_orm::Condition`, [`statements`] builds the per-schema SQL, [`rows`]
//! decodes result rows into records and [`errors`] classifies constraint
//! failures.
//!
//! # Features
//! - `sqlite` (default), `pg`: enable the sqlx/SeaORM backends
//!
//! # Example
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> admin_db::Result<()> {
//!     use admin_db::{ConnectOpts, DbHandle};
//!
//!     let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
//!     let _conn = db.sea();
//!     db.close().await;
//!     Ok(())
//! }
//! ```

pub mod condition;
pub mod config;
pub mod errors;
pub mod rows;
pub mod statements;

pub use condition::{expr_to_condition, to_sea_value};
pub use config::{DbConnConfig, PoolCfg};
pub use errors::{classify_db_err, ConstraintKind, ConstraintViolation};

use std::time::Duration;

#[cfg(any(feature = "pg", feature = "sqlite"))]
use sqlx::pool::PoolOptions;
#[cfg(feature = "pg")]
use sqlx::{postgres::PgPoolOptions, PgPool};
#[cfg(feature = "sqlite")]
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use sea_orm::DatabaseConnection;
#[cfg(feature = "pg")]
use sea_orm::SqlxPostgresConnector;
#[cfg(feature = "sqlite")]
use sea_orm::SqlxSqliteConnector;

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to build statement: {0}")]
    Statement(String),

    #[error("{schema} has no field '{field}'")]
    UnknownField { schema: String, field: String },

    #[error("cannot decode column '{column}' as {expected}: {message}")]
    Decode {
        column: String,
        expected: admin_query::FieldType,
        message: String,
    },

    #[error("decimal out of range: {0}")]
    Decimal(String),
}

impl From<sea_orm::sea_query::error::Error> for DbError {
    fn from(e: sea_orm::sea_query::error::Error) -> Self {
        DbError::Statement(e.to_string())
    }
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Connection pool knobs; each driver applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: bool,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

impl ConnectOpts {
    /// Overlay these knobs on a driver's pool builder.
    #[cfg(any(feature = "pg", feature = "sqlite"))]
    fn apply_to<DB: sqlx::Database>(&self, o: PoolOptions<DB>) -> PoolOptions<DB> {
        let mut o = o
            .acquire_timeout(self.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT))
            .test_before_acquire(self.test_before_acquire);
        if let Some(t) = self.idle_timeout {
            o = o.idle_timeout(t);
        }
        if let Some(t) = self.max_lifetime {
            o = o.max_lifetime(t);
        }
        if let Some(n) = self.max_conns {
            o = o.max_connections(n);
        }
        if let Some(n) = self.min_conns {
            o = o.min_connections(n);
        }
        o
    }
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(DEFAULT_ACQUIRE_TIMEOUT),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
            create_sqlite_dirs: true,
        }
    }
}

#[derive(Clone, Debug)]
enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Main handle.
#[derive(Debug)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
    sea: DatabaseConnection,
}

const DEFAULT_SQLITE_BUSY_TIMEOUT: i32 = 5000;

impl DbHandle {
    /// Detect engine by DSN scheme.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(config::redact_credentials(dsn)))
        }
    }

    /// Connect and build handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        tracing::debug!(dsn = %config::redact_credentials(dsn), ?engine, "connecting");
        match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let o = opts.apply_to(PgPoolOptions::new());
                let pool = o.connect(dsn).await?;
                let sea = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::Postgres(pool),
                    dsn: dsn.to_string(),
                    sea,
                })
            }
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                let in_memory = is_memory_dsn(dsn);
                if opts.create_sqlite_dirs && !in_memory {
                    prepare_sqlite_path(dsn)?;
                }

                let mut o = if in_memory {
                    // Every connection to `:memory:` is a distinct database; keep exactly one alive.
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                        .acquire_timeout(opts.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT))
                        .test_before_acquire(opts.test_before_acquire)
                } else {
                    opts.apply_to(SqlitePoolOptions::new())
                };

                o = o.after_connect(move |conn, _meta| {
                    Box::pin(async move {
                        sqlx::query("PRAGMA foreign_keys = ON")
                            .execute(&mut *conn)
                            .await?;
                        if in_memory {
                            sqlx::query("PRAGMA journal_mode = DELETE")
                                .execute(&mut *conn)
                                .await?;
                        } else {
                            sqlx::query("PRAGMA journal_mode = WAL")
                                .execute(&mut *conn)
                                .await?;
                            // PRAGMA values cannot be bound parameters.
                            let busy = format!("PRAGMA busy_timeout = {DEFAULT_SQLITE_BUSY_TIMEOUT}");
                            sqlx::query(&busy).execute(&mut *conn).await?;
                        }
                        sqlx::query("PRAGMA synchronous = NORMAL")
                            .execute(&mut *conn)
                            .await?;
                        Ok(())
                    })
                });

                let pool = o.connect(dsn).await?;
                let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::Sqlite(pool),
                    dsn: dsn.to_string(),
                    sea,
                })
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }

    /// Connect using a config section.
    pub async fn from_config(cfg: &DbConnConfig) -> Result<Self> {
        Self::connect(&cfg.dsn, cfg.connect_opts()).await
    }

    /// Graceful pool close.
    pub async fn close(self) {
        match self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN with credentials redacted.
    pub fn dsn(&self) -> String {
        config::redact_credentials(&self.dsn)
    }

    /// SeaORM connection (clone; cheap handle).
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    pub fn seaorm(&self) -> &DatabaseConnection {
        &self.sea
    }
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

#[cfg(feature = "sqlite")]
fn prepare_sqlite_path(dsn: &str) -> Result<()> {
    let raw = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);

    // URI forms (`file:`) and query strings have no plain parent directory.
    if !raw.starts_with("file:") && !raw.contains('?') {
        if let Some(parent) = std::path::Path::new(raw).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
