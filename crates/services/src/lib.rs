#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod homework_service;
pub mod progress_service;
pub mod schedule_service;
pub mod tracking_service;

pub use hifz_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, HomeworkServiceError, ProgressServiceError, ScheduleServiceError,
    TrackingServiceError,
};
pub use homework_service::HomeworkService;
pub use progress_service::{ProgressService, ScheduleProgress};
pub use schedule_service::ScheduleService;
pub use tracking_service::TrackingService;
