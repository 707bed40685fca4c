use std::sync::Arc;

use hifz_core::config::EngineConfig;
use hifz_core::progress::ScheduleProgressEngine;
use hifz_core::range::RangeResolver;
use hifz_storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::homework_service::HomeworkService;
use crate::progress_service::ProgressService;
use crate::schedule_service::ScheduleService;
use crate::tracking_service::TrackingService;

/// Assembles the services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    schedules: Arc<ScheduleService>,
    tracking: Arc<TrackingService>,
    homework: Arc<HomeworkService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the engine config is invalid or storage
    /// initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: EngineConfig,
    ) -> Result<Self, AppServicesError> {
        let config = config.validate()?;
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, config))
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` if the engine config is invalid.
    pub fn in_memory(clock: Clock, config: EngineConfig) -> Result<Self, AppServicesError> {
        let config = config.validate()?;
        Ok(Self::from_storage(&Storage::in_memory(), clock, config))
    }

    /// Wire services to an existing storage. `config` is used as given.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: EngineConfig) -> Self {
        let resolver = RangeResolver::standard();
        let engine = ScheduleProgressEngine::new(config, resolver.clone());

        let schedules = Arc::new(ScheduleService::new(
            clock,
            Arc::clone(&storage.schedules),
            Arc::clone(&storage.tracking),
        ));
        let tracking = Arc::new(TrackingService::new(
            resolver.clone(),
            Arc::clone(&storage.schedules),
            Arc::clone(&storage.tracking),
        ));
        let homework = Arc::new(HomeworkService::new(
            clock,
            resolver,
            Arc::clone(&storage.homework),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            engine,
            Arc::clone(&storage.schedules),
            Arc::clone(&storage.tracking),
        ));

        Self {
            schedules,
            tracking,
            homework,
            progress,
        }
    }

    #[must_use]
    pub fn schedules(&self) -> Arc<ScheduleService> {
        Arc::clone(&self.schedules)
    }

    #[must_use]
    pub fn tracking(&self) -> Arc<TrackingService> {
        Arc::clone(&self.tracking)
    }

    #[must_use]
    pub fn homework(&self) -> Arc<HomeworkService> {
        Arc::clone(&self.homework)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
