use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    CatalogRepository, EnrollmentRepository, ForumRepository, ProgressLedger, Storage,
};

mod catalog_repo;
mod enrollment_repo;
mod forum_repo;
mod ledger_repo;
mod mapping;
mod migrate;

/// How long a connection waits on a locked database before `SQLITE_BUSY`.
///
/// A lesson completion opens its transaction with the ledger INSERT, which
/// needs the write lock. While another completion holds that lock, the
/// INSERT blocks for up to this long instead of failing at once, so
/// concurrent completions for the same learner are serialized by `SQLite`
/// and both counts land. Only a writer stuck behind a lock for longer than
/// this surfaces as `StorageError::Connection`.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Per-connection settings: foreign keys on (forum replies cascade with
/// their thread, completions need an existing lesson), WAL so readers do not
/// block the completion writer, and [`BUSY_TIMEOUT`].
fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT))
}

impl SqliteRepository {
    /// Open a pool of up to five connections to `database_url`.
    ///
    /// Acquiring a connection from the pool is bounded by [`BUSY_TIMEOUT`]
    /// as well, so a saturated pool and a locked database fail on the same
    /// schedule.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL does not parse or the first
    /// connection cannot be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(BUSY_TIMEOUT)
            .connect_with(connect_options(database_url)?)
            .await?;
        tracing::debug!(url = database_url, "sqlite pool ready");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo.clone());
        let ledger: Arc<dyn ProgressLedger> = Arc::new(repo.clone());
        let forum: Arc<dyn ForumRepository> = Arc::new(repo);
        Ok(Self {
            catalog,
            enrollments,
            ledger,
            forum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[tokio::test]
    async fn pooled_connections_wait_on_locks_and_enforce_foreign_keys() {
        let repo = SqliteRepository::connect("sqlite:file:memdb_pragmas?mode=memory&cache=shared")
            .await
            .unwrap();

        let busy: i64 = sqlx::query_scalar("PRAGMA busy_timeout;")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(busy, i64::try_from(BUSY_TIMEOUT.as_millis()).unwrap());

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys;")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }
}
