#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    HomeworkRepository, InMemoryRepository, ScheduleRepository, Storage, StorageError,
    TrackingRepository,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
