use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;
use tracing::debug;

use crate::repository::{HomeworkRepository, ScheduleRepository, Storage, TrackingRepository};

mod homework_repo;
mod mapping;
mod migrate;
mod schedule_repo;
mod tracking_repo;

/// Writers wait this long on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One pool shared by the schedule, tracking and homework repositories.
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

impl SqliteRepository {
    /// Open a pool with foreign keys enforced, WAL journaling and a busy
    /// timeout, so concurrent activations queue on the write lock.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is malformed or the connection
    /// cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(BUSY_TIMEOUT)
            .connect_with(options)
            .await?;
        debug!(url = database_url, "sqlite pool ready");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration statement fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Connect, migrate, and hand out the same pool behind every repository
    /// trait.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let repo = Arc::new(repo);
        Ok(Self {
            schedules: Arc::clone(&repo) as Arc<dyn ScheduleRepository>,
            tracking: Arc::clone(&repo) as Arc<dyn TrackingRepository>,
            homework: repo as Arc<dyn HomeworkRepository>,
        })
    }
}
