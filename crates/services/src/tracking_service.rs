use std::sync::Arc;

use hifz_core::model::{ScheduleError, StudentId, TrackingDraft, TrackingRecord};
use hifz_core::range::RangeResolver;
use hifz_storage::repository::{ScheduleRepository, TrackingRepository};
use tracing::debug;

use crate::error::TrackingServiceError;

/// Records study sessions after validating their ranges.
#[derive(Clone)]
pub struct TrackingService {
    resolver: RangeResolver,
    schedules: Arc<dyn ScheduleRepository>,
    tracking: Arc<dyn TrackingRepository>,
}

impl TrackingService {
    #[must_use]
    pub fn new(
        resolver: RangeResolver,
        schedules: Arc<dyn ScheduleRepository>,
        tracking: Arc<dyn TrackingRepository>,
    ) -> Self {
        Self {
            resolver,
            schedules,
            tracking,
        }
    }

    /// Validate and persist a tracking entry.
    ///
    /// A referenced schedule must exist and belong to the same student.
    ///
    /// # Errors
    ///
    /// Returns `TrackingServiceError::Tracking` for invalid ranges or page
    /// counts, `TrackingServiceError::Schedule` for an unknown or foreign
    /// schedule, and `TrackingServiceError::Storage` if persistence fails.
    pub async fn record(&self, draft: TrackingDraft) -> Result<TrackingRecord, TrackingServiceError> {
        let validated = draft.validate(&self.resolver)?;

        if let Some(schedule_id) = validated.schedule_id {
            let schedule = self
                .schedules
                .get_schedule(schedule_id)
                .await?
                .ok_or(ScheduleError::NotFound { schedule_id })?;
            if schedule.student_id() != validated.student_id {
                return Err(ScheduleError::StudentMismatch {
                    schedule_id,
                    student_id: validated.student_id,
                }
                .into());
            }
        }

        let record = self.tracking.append_record(validated).await?;
        debug!(
            record_id = %record.id,
            student_id = %record.student_id,
            reading_type = record.reading_type.as_str(),
            range = %record.range,
            "recorded tracking entry"
        );
        Ok(record)
    }

    /// A student's records ordered by date.
    ///
    /// # Errors
    ///
    /// Returns `TrackingServiceError::Storage` if repository access fails.
    pub async fn list_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<TrackingRecord>, TrackingServiceError> {
        Ok(self.tracking.records_for_student(student_id).await?)
    }
}
