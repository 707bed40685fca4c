use std::sync::Arc;

use chrono::NaiveDate;
use hifz_core::model::{
    ProgressSnapshot, Schedule, ScheduleError, ScheduleId, StudentId, TrackingRecord,
};
use hifz_core::progress::ScheduleProgressEngine;
use hifz_storage::repository::{ScheduleRepository, TrackingRepository};
use serde::Serialize;

use crate::Clock;
use crate::error::ProgressServiceError;

/// A schedule together with its progress as of a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleProgress {
    pub schedule: Schedule,
    pub as_of: NaiveDate,
    pub snapshot: ProgressSnapshot,
}

/// Loads schedules and records from storage and runs the progress engine.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    engine: ScheduleProgressEngine,
    schedules: Arc<dyn ScheduleRepository>,
    tracking: Arc<dyn TrackingRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        engine: ScheduleProgressEngine,
        schedules: Arc<dyn ScheduleRepository>,
        tracking: Arc<dyn TrackingRepository>,
    ) -> Self {
        Self {
            clock,
            engine,
            schedules,
            tracking,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &ScheduleProgressEngine {
        &self.engine
    }

    /// Progress of one schedule as of the clock's today.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::NotFound` (wrapped) for unknown schedules and
    /// `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for_schedule(
        &self,
        schedule_id: ScheduleId,
    ) -> Result<ScheduleProgress, ProgressServiceError> {
        let schedule = self
            .schedules
            .get_schedule(schedule_id)
            .await?
            .ok_or(ScheduleError::NotFound { schedule_id })?;
        let records = self
            .tracking
            .records_for_student(schedule.student_id())
            .await?;
        Ok(self.evaluate(schedule, &records))
    }

    /// Progress of the student's active schedule.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NoActiveSchedule` when the student has
    /// none, `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<ScheduleProgress, ProgressServiceError> {
        let schedule = self
            .schedules
            .active_schedule(student_id)
            .await?
            .ok_or(ProgressServiceError::NoActiveSchedule { student_id })?;
        let records = self.tracking.records_for_student(student_id).await?;
        Ok(self.evaluate(schedule, &records))
    }

    /// Progress of every schedule of a student, active or not.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for_all(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ScheduleProgress>, ProgressServiceError> {
        let schedules = self.schedules.schedules_for_student(student_id).await?;
        let records = self.tracking.records_for_student(student_id).await?;
        Ok(schedules
            .into_iter()
            .map(|schedule| self.evaluate(schedule, &records))
            .collect())
    }

    fn evaluate(&self, schedule: Schedule, records: &[TrackingRecord]) -> ScheduleProgress {
        let today = self.clock.today();
        // Records filed under another schedule belong there; unfiled history
        // from before the start is outside this schedule's window. Records
        // filed under this schedule are always passed so a misdated one is
        // reported as malformed.
        let relevant: Vec<TrackingRecord> = records
            .iter()
            .filter(|r| match r.schedule_id {
                Some(id) => id == schedule.id(),
                None => r.date >= schedule.start_date(),
            })
            .cloned()
            .collect();
        let snapshot = self.engine.compute_progress(&schedule, &relevant, today);
        ScheduleProgress {
            schedule,
            as_of: today,
            snapshot,
        }
    }
}
