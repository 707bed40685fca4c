use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ScheduleId, StudentId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error("a schedule needs a pages or verses target rate")]
    MissingTargetRate,

    #[error("{field} per period must be positive and finite, got {provided}")]
    InvalidTargetRate { field: &'static str, provided: f64 },

    #[error("expected completion date {completion} is before start date {start}")]
    CompletionBeforeStart {
        start: NaiveDate,
        completion: NaiveDate,
    },

    #[error("target total pages must be > 0")]
    InvalidTargetTotalPages,

    #[error("schedule {schedule_id} not found")]
    NotFound { schedule_id: ScheduleId },

    #[error("schedule {schedule_id} does not belong to student {student_id}")]
    StudentMismatch {
        schedule_id: ScheduleId,
        student_id: StudentId,
    },
}

//
// ─── SCHEDULE TYPE ─────────────────────────────────────────────────────────────
//

/// Length of the period a target rate is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleType::Daily => "daily",
            ScheduleType::Weekly => "weekly",
            ScheduleType::Monthly => "monthly",
        }
    }
}

//
// ─── TARGET RATE ───────────────────────────────────────────────────────────────
//

/// Expected progress per schedule period. At least one of the two is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRate {
    pages_per_period: Option<f64>,
    verses_per_period: Option<f64>,
}

impl TargetRate {
    /// # Errors
    ///
    /// Returns `MissingTargetRate` when both are `None`, and
    /// `InvalidTargetRate` when a provided value is not positive and finite.
    pub fn new(
        pages_per_period: Option<f64>,
        verses_per_period: Option<f64>,
    ) -> Result<Self, ScheduleError> {
        if pages_per_period.is_none() && verses_per_period.is_none() {
            return Err(ScheduleError::MissingTargetRate);
        }
        check_rate("pages", pages_per_period)?;
        check_rate("verses", verses_per_period)?;
        Ok(Self {
            pages_per_period,
            verses_per_period,
        })
    }

    /// # Errors
    ///
    /// Returns `InvalidTargetRate` if `pages` is not positive and finite.
    pub fn pages(pages: f64) -> Result<Self, ScheduleError> {
        Self::new(Some(pages), None)
    }

    /// # Errors
    ///
    /// Returns `InvalidTargetRate` if `verses` is not positive and finite.
    pub fn verses(verses: f64) -> Result<Self, ScheduleError> {
        Self::new(None, Some(verses))
    }

    #[must_use]
    pub fn pages_per_period(&self) -> Option<f64> {
        self.pages_per_period
    }

    #[must_use]
    pub fn verses_per_period(&self) -> Option<f64> {
        self.verses_per_period
    }
}

fn check_rate(field: &'static str, value: Option<f64>) -> Result<(), ScheduleError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => {
            Err(ScheduleError::InvalidTargetRate { field, provided: v })
        }
        _ => Ok(()),
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated schedule input, as submitted by an instructor or admin.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDraft {
    pub student_id: StudentId,
    pub title: Option<String>,
    pub schedule_type: ScheduleType,
    pub pages_per_period: Option<f64>,
    pub verses_per_period: Option<f64>,
    pub start_date: NaiveDate,
    pub expected_completion_date: Option<NaiveDate>,
    pub target_total_pages: Option<u32>,
    pub is_active: bool,
}

impl ScheduleDraft {
    /// Validate the draft into a schedule with the given id.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` for a missing/invalid target rate, a completion
    /// date before the start date, or a zero page target.
    pub fn validate(
        self,
        id: ScheduleId,
        created_at: DateTime<Utc>,
    ) -> Result<Schedule, ScheduleError> {
        let target_rate = TargetRate::new(self.pages_per_period, self.verses_per_period)?;
        Schedule::from_persisted(
            id,
            self.student_id,
            self.title,
            self.schedule_type,
            target_rate,
            self.start_date,
            self.expected_completion_date,
            self.target_total_pages,
            self.is_active,
            created_at,
        )
    }
}

//
// ─── SCHEDULE ──────────────────────────────────────────────────────────────────
//

/// A student's long-term memorization plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    id: ScheduleId,
    student_id: StudentId,
    title: Option<String>,
    schedule_type: ScheduleType,
    target_rate: TargetRate,
    start_date: NaiveDate,
    expected_completion_date: Option<NaiveDate>,
    target_total_pages: Option<u32>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Schedule {
    /// Rehydrate a schedule, re-checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::CompletionBeforeStart` or
    /// `ScheduleError::InvalidTargetTotalPages` when the data is inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ScheduleId,
        student_id: StudentId,
        title: Option<String>,
        schedule_type: ScheduleType,
        target_rate: TargetRate,
        start_date: NaiveDate,
        expected_completion_date: Option<NaiveDate>,
        target_total_pages: Option<u32>,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        if let Some(completion) = expected_completion_date {
            if completion < start_date {
                return Err(ScheduleError::CompletionBeforeStart {
                    start: start_date,
                    completion,
                });
            }
        }
        if target_total_pages == Some(0) {
            return Err(ScheduleError::InvalidTargetTotalPages);
        }

        let title = title.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty());

        Ok(Self {
            id,
            student_id,
            title,
            schedule_type,
            target_rate,
            start_date,
            expected_completion_date,
            target_total_pages,
            is_active,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ScheduleId {
        self.id
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn schedule_type(&self) -> ScheduleType {
        self.schedule_type
    }

    #[must_use]
    pub fn target_rate(&self) -> TargetRate {
        self.target_rate
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn expected_completion_date(&self) -> Option<NaiveDate> {
        self.expected_completion_date
    }

    #[must_use]
    pub fn target_total_pages(&self) -> Option<u32> {
        self.target_total_pages
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Flip the active flag. Callers holding several schedules for one
    /// student should go through [`activate`] instead.
    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Assign a storage-generated id.
    #[must_use]
    pub fn with_id(mut self, id: ScheduleId) -> Self {
        self.id = id;
        self
    }
}

//
// ─── ACTIVATION ────────────────────────────────────────────────────────────────
//

/// Make `schedule_id` the only active schedule of `student_id`.
///
/// Schedules of other students are returned unchanged. Storage adapters must
/// apply the result as one atomic write.
///
/// # Errors
///
/// Returns `ScheduleError::NotFound` if the schedule is not in the list, or
/// `ScheduleError::StudentMismatch` if it belongs to a different student.
pub fn activate(
    schedule_id: ScheduleId,
    student_id: StudentId,
    mut schedules: Vec<Schedule>,
) -> Result<Vec<Schedule>, ScheduleError> {
    let target = schedules
        .iter()
        .find(|s| s.id == schedule_id)
        .ok_or(ScheduleError::NotFound { schedule_id })?;
    if target.student_id != student_id {
        return Err(ScheduleError::StudentMismatch {
            schedule_id,
            student_id,
        });
    }

    for schedule in schedules.iter_mut().filter(|s| s.student_id == student_id) {
        schedule.is_active = schedule.id == schedule_id;
    }
    Ok(schedules)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
