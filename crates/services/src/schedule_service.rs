use std::sync::Arc;

use hifz_core::model::{Schedule, ScheduleDraft, ScheduleError, ScheduleId, StudentId};
use hifz_storage::repository::{ScheduleRepository, StorageError, TrackingRepository};
use tracing::info;

use crate::Clock;
use crate::error::ScheduleServiceError;

/// Orchestrates the schedule lifecycle: creation, activation, deletion.
#[derive(Clone)]
pub struct ScheduleService {
    clock: Clock,
    schedules: Arc<dyn ScheduleRepository>,
    tracking: Arc<dyn TrackingRepository>,
}

impl ScheduleService {
    #[must_use]
    pub fn new(
        clock: Clock,
        schedules: Arc<dyn ScheduleRepository>,
        tracking: Arc<dyn TrackingRepository>,
    ) -> Self {
        Self {
            clock,
            schedules,
            tracking,
        }
    }

    /// Validate and persist a new schedule.
    ///
    /// An active draft is stored inactive first and then activated, so any
    /// previously active schedule of the student is switched off.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Schedule` for validation failures.
    /// Returns `ScheduleServiceError::Storage` if persistence fails.
    pub async fn create_schedule(
        &self,
        draft: ScheduleDraft,
    ) -> Result<Schedule, ScheduleServiceError> {
        let wants_active = draft.is_active;
        let student_id = draft.student_id;
        // placeholder id; storage assigns the real one
        let schedule = ScheduleDraft {
            is_active: false,
            ..draft
        }
        .validate(ScheduleId::new(0), self.clock.now())?;

        let id = self.schedules.insert_schedule(&schedule).await?;
        let mut schedule = schedule.with_id(id);
        if wants_active {
            self.schedules.activate_schedule(student_id, id).await?;
            schedule.set_active(true);
        }

        info!(
            %student_id,
            schedule_id = %id,
            schedule_type = schedule.schedule_type().as_str(),
            active = wants_active,
            "created schedule"
        );
        Ok(schedule)
    }

    /// Make `schedule_id` the student's only active schedule.
    ///
    /// Idempotent: activating the already-active schedule changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::NotFound` or `ScheduleError::StudentMismatch`
    /// (wrapped) when the schedule is missing or belongs to someone else.
    /// Returns `ScheduleServiceError::Storage` if persistence fails.
    pub async fn activate(
        &self,
        student_id: StudentId,
        schedule_id: ScheduleId,
    ) -> Result<Schedule, ScheduleServiceError> {
        let mut schedule = self
            .schedules
            .get_schedule(schedule_id)
            .await?
            .ok_or(ScheduleError::NotFound { schedule_id })?;
        if schedule.student_id() != student_id {
            return Err(ScheduleError::StudentMismatch {
                schedule_id,
                student_id,
            }
            .into());
        }

        self.schedules
            .activate_schedule(student_id, schedule_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ScheduleError::NotFound { schedule_id }.into(),
                StorageError::Conflict => ScheduleError::StudentMismatch {
                    schedule_id,
                    student_id,
                }
                .into(),
                other => ScheduleServiceError::Storage(other),
            })?;

        info!(%student_id, %schedule_id, "activated schedule");
        schedule.set_active(true);
        Ok(schedule)
    }

    /// Mark a schedule inactive.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::NotFound` (wrapped) for unknown schedules.
    /// Returns `ScheduleServiceError::Storage` if persistence fails.
    pub async fn deactivate(&self, schedule_id: ScheduleId) -> Result<(), ScheduleServiceError> {
        self.schedules
            .deactivate_schedule(schedule_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ScheduleError::NotFound { schedule_id }.into(),
                other => ScheduleServiceError::Storage(other),
            })?;
        info!(%schedule_id, "deactivated schedule");
        Ok(())
    }

    /// Delete a schedule that no tracking record references.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::ConfirmationRequired` unless `confirmed`,
    /// `ScheduleServiceError::InUse` while records reference the schedule, and
    /// `ScheduleError::NotFound` (wrapped) for unknown schedules.
    pub async fn delete_schedule(
        &self,
        schedule_id: ScheduleId,
        confirmed: bool,
    ) -> Result<(), ScheduleServiceError> {
        if !confirmed {
            return Err(ScheduleServiceError::ConfirmationRequired { schedule_id });
        }
        let records = self.tracking.count_for_schedule(schedule_id).await?;
        if records > 0 {
            return Err(ScheduleServiceError::InUse {
                schedule_id,
                records,
            });
        }

        match self.schedules.delete_schedule(schedule_id).await {
            Ok(()) => {
                info!(%schedule_id, "deleted schedule");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(ScheduleError::NotFound { schedule_id }.into()),
            // a record was added between the count and the delete
            Err(StorageError::Conflict) => Err(ScheduleServiceError::InUse {
                schedule_id,
                records: self.tracking.count_for_schedule(schedule_id).await?,
            }),
            Err(other) => Err(other.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Storage` if repository access fails.
    pub async fn get_schedule(
        &self,
        schedule_id: ScheduleId,
    ) -> Result<Option<Schedule>, ScheduleServiceError> {
        Ok(self.schedules.get_schedule(schedule_id).await?)
    }

    /// All schedules of a student, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Storage` if repository access fails.
    pub async fn list_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Schedule>, ScheduleServiceError> {
        Ok(self.schedules.schedules_for_student(student_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Storage` if repository access fails.
    pub async fn active_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Option<Schedule>, ScheduleServiceError> {
        Ok(self.schedules.active_schedule(student_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hifz_core::model::{ReadingType, ScheduleType, TrackingDraft, VerseRange};
    use hifz_core::range::RangeResolver;
    use hifz_core::time::{fixed_now, fixed_today};
    use hifz_storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> ScheduleService {
        ScheduleService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn draft(student: u64, active: bool) -> ScheduleDraft {
        ScheduleDraft {
            student_id: StudentId::new(student),
            title: Some("Surah Al-Mulk".into()),
            schedule_type: ScheduleType::Weekly,
            pages_per_period: Some(2.0),
            verses_per_period: None,
            start_date: fixed_today(),
            expected_completion_date: None,
            target_total_pages: Some(4),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn creating_an_active_schedule_replaces_the_previous_one() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);

        let first = svc.create_schedule(draft(1, true)).await.unwrap();
        let second = svc.create_schedule(draft(1, true)).await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(second.created_at(), fixed_now());

        let active = svc.active_for_student(StudentId::new(1)).await.unwrap();
        assert_eq!(active.map(|s| s.id()), Some(second.id()));
        assert_eq!(svc.list_for_student(StudentId::new(1)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected_before_storage() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let mut bad = draft(1, false);
        bad.pages_per_period = None;

        let err = svc.create_schedule(bad).await.unwrap_err();
        assert!(matches!(
            err,
            ScheduleServiceError::Schedule(ScheduleError::MissingTargetRate)
        ));
        assert!(svc.list_for_student(StudentId::new(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn activation_checks_ownership() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let other = svc.create_schedule(draft(2, false)).await.unwrap();

        let err = svc.activate(StudentId::new(1), other.id()).await.unwrap_err();
        assert!(matches!(
            err,
            ScheduleServiceError::Schedule(ScheduleError::StudentMismatch { .. })
        ));
        let err = svc
            .activate(StudentId::new(1), ScheduleId::new(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleServiceError::Schedule(ScheduleError::NotFound { .. })
        ));

        let activated = svc.activate(StudentId::new(2), other.id()).await.unwrap();
        assert!(activated.is_active());
        svc.deactivate(other.id()).await.unwrap();
        assert!(svc.active_for_student(StudentId::new(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deletion_needs_confirmation_and_no_records() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let schedule = svc.create_schedule(draft(1, true)).await.unwrap();

        assert!(matches!(
            svc.delete_schedule(schedule.id(), false).await,
            Err(ScheduleServiceError::ConfirmationRequired { .. })
        ));

        let record = TrackingDraft {
            student_id: StudentId::new(1),
            schedule_id: Some(schedule.id()),
            date: fixed_today(),
            range: VerseRange::within(67, 1, 5),
            reading_type: ReadingType::Memorize,
            pages_memorized: Some(1),
            notes: None,
        }
        .validate(&RangeResolver::standard())
        .unwrap();
        repo.append_record(record).await.unwrap();

        assert!(matches!(
            svc.delete_schedule(schedule.id(), true).await,
            Err(ScheduleServiceError::InUse { records: 1, .. })
        ));

        let unused = svc.create_schedule(draft(1, false)).await.unwrap();
        svc.delete_schedule(unused.id(), true).await.unwrap();
        assert!(svc.get_schedule(unused.id()).await.unwrap().is_none());
        assert!(matches!(
            svc.delete_schedule(unused.id(), true).await,
            Err(ScheduleServiceError::Schedule(ScheduleError::NotFound { .. }))
        ));
    }
}
