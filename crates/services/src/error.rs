//! Shared error types for the services crate.

use thiserror::Error;

use hifz_core::config::ConfigError;
use hifz_core::model::{HomeworkError, ScheduleError, ScheduleId, StudentId, TrackingError};
use hifz_storage::repository::StorageError;
use hifz_storage::sqlite::SqliteInitError;

/// Errors emitted by `ScheduleService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScheduleServiceError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("deleting schedule {schedule_id} requires confirmation")]
    ConfirmationRequired { schedule_id: ScheduleId },
    #[error("schedule {schedule_id} is referenced by {records} tracking records")]
    InUse { schedule_id: ScheduleId, records: u64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TrackingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackingServiceError {
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `HomeworkService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HomeworkServiceError {
    #[error(transparent)]
    Homework(#[from] HomeworkError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("student {student_id} has no active schedule")]
    NoActiveSchedule { student_id: StudentId },
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
