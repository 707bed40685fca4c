use async_trait::async_trait;
use hifz_core::model::{
    Homework, HomeworkId, Schedule, ScheduleError, ScheduleId, StudentId, TrackingRecord,
    TrackingRecordId, ValidatedHomework, ValidatedTracking, activate,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for memorization schedules.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Insert a new schedule and return the storage-assigned id.
    ///
    /// The id carried by `schedule` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the schedule is active and the
    /// student already has an active schedule.
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<ScheduleId, StorageError>;

    /// Persist or update a schedule by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the schedule cannot be stored.
    async fn upsert_schedule(&self, schedule: &Schedule) -> Result<(), StorageError>;

    /// Fetch a schedule by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, StorageError>;

    /// All schedules of a student, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn schedules_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Schedule>, StorageError>;

    /// The student's active schedule, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn active_schedule(&self, student_id: StudentId)
    -> Result<Option<Schedule>, StorageError>;

    /// Atomically make `schedule_id` the only active schedule of `student_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the schedule does not exist and
    /// `StorageError::Conflict` if it belongs to another student. Nothing is
    /// changed in either case.
    async fn activate_schedule(
        &self,
        student_id: StudentId,
        schedule_id: ScheduleId,
    ) -> Result<(), StorageError>;

    /// Mark a schedule inactive.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the schedule does not exist.
    async fn deactivate_schedule(&self, schedule_id: ScheduleId) -> Result<(), StorageError>;

    /// Delete a schedule.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing and `StorageError::Conflict`
    /// while tracking records still reference it.
    async fn delete_schedule(&self, schedule_id: ScheduleId) -> Result<(), StorageError>;
}

/// Repository contract for dated tracking records.
#[async_trait]
pub trait TrackingRepository: Send + Sync {
    /// Append a validated record and return it with its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the referenced schedule does not exist.
    async fn append_record(
        &self,
        record: ValidatedTracking,
    ) -> Result<TrackingRecord, StorageError>;

    /// All records of a student ordered by date, then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or undecodable rows.
    async fn records_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<TrackingRecord>, StorageError>;

    /// Number of records referencing `schedule_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_for_schedule(&self, schedule_id: ScheduleId) -> Result<u64, StorageError>;
}

/// Repository contract for homework assignments.
#[async_trait]
pub trait HomeworkRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the homework cannot be stored.
    async fn insert_homework(&self, homework: ValidatedHomework)
    -> Result<Homework, StorageError>;

    /// Homework of a student, most recently assigned first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn homework_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Homework>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Lock order is schedules before records.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    schedules: Arc<Mutex<Table<Schedule>>>,
    records: Arc<Mutex<Table<TrackingRecord>>>,
    homework: Arc<Mutex<Table<Homework>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ScheduleRepository for InMemoryRepository {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<ScheduleId, StorageError> {
        let mut guard = self.schedules.lock().map_err(poisoned)?;
        if schedule.is_active()
            && guard
                .rows
                .values()
                .any(|s| s.student_id() == schedule.student_id() && s.is_active())
        {
            return Err(StorageError::Conflict);
        }
        let id = ScheduleId::new(guard.allocate());
        guard.rows.insert(id.value(), schedule.clone().with_id(id));
        Ok(id)
    }

    async fn upsert_schedule(&self, schedule: &Schedule) -> Result<(), StorageError> {
        let mut guard = self.schedules.lock().map_err(poisoned)?;
        if schedule.is_active()
            && guard.rows.values().any(|s| {
                s.student_id() == schedule.student_id() && s.is_active() && s.id() != schedule.id()
            })
        {
            return Err(StorageError::Conflict);
        }
        let id = schedule.id().value();
        guard.next_id = guard.next_id.max(id + 1);
        guard.rows.insert(id, schedule.clone());
        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, StorageError> {
        let guard = self.schedules.lock().map_err(poisoned)?;
        Ok(guard.rows.get(&id.value()).cloned())
    }

    async fn schedules_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Schedule>, StorageError> {
        let guard = self.schedules.lock().map_err(poisoned)?;
        Ok(guard
            .rows
            .values()
            .filter(|s| s.student_id() == student_id)
            .cloned()
            .collect())
    }

    async fn active_schedule(
        &self,
        student_id: StudentId,
    ) -> Result<Option<Schedule>, StorageError> {
        let guard = self.schedules.lock().map_err(poisoned)?;
        Ok(guard
            .rows
            .values()
            .find(|s| s.student_id() == student_id && s.is_active())
            .cloned())
    }

    async fn activate_schedule(
        &self,
        student_id: StudentId,
        schedule_id: ScheduleId,
    ) -> Result<(), StorageError> {
        // The whole transition happens under one guard.
        let mut guard = self.schedules.lock().map_err(poisoned)?;
        let current: Vec<Schedule> = guard.rows.values().cloned().collect();
        let updated = activate(schedule_id, student_id, current).map_err(|e| match e {
            ScheduleError::NotFound { .. } => StorageError::NotFound,
            _ => StorageError::Conflict,
        })?;
        for schedule in updated {
            guard.rows.insert(schedule.id().value(), schedule);
        }
        Ok(())
    }

    async fn deactivate_schedule(&self, schedule_id: ScheduleId) -> Result<(), StorageError> {
        let mut guard = self.schedules.lock().map_err(poisoned)?;
        let schedule = guard
            .rows
            .get_mut(&schedule_id.value())
            .ok_or(StorageError::NotFound)?;
        schedule.set_active(false);
        Ok(())
    }

    async fn delete_schedule(&self, schedule_id: ScheduleId) -> Result<(), StorageError> {
        let mut schedules = self.schedules.lock().map_err(poisoned)?;
        if !schedules.rows.contains_key(&schedule_id.value()) {
            return Err(StorageError::NotFound);
        }
        let records = self.records.lock().map_err(poisoned)?;
        if records
            .rows
            .values()
            .any(|r| r.schedule_id == Some(schedule_id))
        {
            return Err(StorageError::Conflict);
        }
        schedules.rows.remove(&schedule_id.value());
        Ok(())
    }
}

#[async_trait]
impl TrackingRepository for InMemoryRepository {
    async fn append_record(
        &self,
        record: ValidatedTracking,
    ) -> Result<TrackingRecord, StorageError> {
        let schedules = self.schedules.lock().map_err(poisoned)?;
        if let Some(schedule_id) = record.schedule_id {
            if !schedules.rows.contains_key(&schedule_id.value()) {
                return Err(StorageError::Conflict);
            }
        }
        let mut guard = self.records.lock().map_err(poisoned)?;
        let record = record.assign_id(TrackingRecordId::new(guard.allocate()));
        guard.rows.insert(record.id.value(), record.clone());
        Ok(record)
    }

    async fn records_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<TrackingRecord>, StorageError> {
        let guard = self.records.lock().map_err(poisoned)?;
        let mut out: Vec<TrackingRecord> = guard
            .rows
            .values()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.date, r.id.value()));
        Ok(out)
    }

    async fn count_for_schedule(&self, schedule_id: ScheduleId) -> Result<u64, StorageError> {
        let guard = self.records.lock().map_err(poisoned)?;
        let count = guard
            .rows
            .values()
            .filter(|r| r.schedule_id == Some(schedule_id))
            .count();
        u64::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }
}

#[async_trait]
impl HomeworkRepository for InMemoryRepository {
    async fn insert_homework(
        &self,
        homework: ValidatedHomework,
    ) -> Result<Homework, StorageError> {
        let mut guard = self.homework.lock().map_err(poisoned)?;
        let homework = homework.assign_id(HomeworkId::new(guard.allocate()));
        guard.rows.insert(homework.id.value(), homework.clone());
        Ok(homework)
    }

    async fn homework_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Homework>, StorageError> {
        let guard = self.homework.lock().map_err(poisoned)?;
        let mut out: Vec<Homework> = guard
            .rows
            .values()
            .filter(|h| h.student_id == student_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.assigned_on
                .cmp(&a.assigned_on)
                .then(b.id.value().cmp(&a.id.value()))
        });
        Ok(out)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub schedules: Arc<dyn ScheduleRepository>,
    pub tracking: Arc<dyn TrackingRepository>,
    pub homework: Arc<dyn HomeworkRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let schedules: Arc<dyn ScheduleRepository> = Arc::new(repo.clone());
        let tracking: Arc<dyn TrackingRepository> = Arc::new(repo.clone());
        let homework: Arc<dyn HomeworkRepository> = Arc::new(repo);
        Self {
            schedules,
            tracking,
            homework,
        }
    }
}
