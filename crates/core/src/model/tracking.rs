use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::VerseRange;
use crate::model::ids::{ScheduleId, StudentId, TrackingRecordId};
use crate::range::{RangeError, RangeMode, RangeResolver};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised when a new tracking entry is submitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackingError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("pages memorized cannot be negative, got {0}")]
    NegativePages(i32),
}

//
// ─── READING TYPE ──────────────────────────────────────────────────────────────
//

/// What the student did during a session.
///
/// Only `Memorize` counts toward schedule progress; revision and reading are
/// kept for the instructor's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingType {
    Memorize,
    Revise,
    Read,
}

impl ReadingType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingType::Memorize => "memorize",
            ReadingType::Revise => "revise",
            ReadingType::Read => "read",
        }
    }

    #[must_use]
    pub fn counts_toward_progress(self) -> bool {
        matches!(self, ReadingType::Memorize)
    }
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// One dated study session.
///
/// `pages_memorized` is signed so that dirty rows coming back from storage can
/// be represented and rejected during aggregation instead of failing the load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub id: TrackingRecordId,
    pub student_id: StudentId,
    pub schedule_id: Option<ScheduleId>,
    pub date: NaiveDate,
    pub range: VerseRange,
    pub reading_type: ReadingType,
    pub pages_memorized: Option<i32>,
    pub notes: Option<String>,
}

/// Unvalidated tracking entry as submitted by an instructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingDraft {
    pub student_id: StudentId,
    pub schedule_id: Option<ScheduleId>,
    pub date: NaiveDate,
    pub range: VerseRange,
    pub reading_type: ReadingType,
    pub pages_memorized: Option<i32>,
    pub notes: Option<String>,
}

impl TrackingDraft {
    /// Validate the entry; a single verse (`start == end`) is allowed.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Range` for invalid ranges and
    /// `TrackingError::NegativePages` for a negative page count.
    pub fn validate(self, resolver: &RangeResolver) -> Result<ValidatedTracking, TrackingError> {
        resolver.validate(&self.range, RangeMode::AllowSingleVerse)?;
        if let Some(pages) = self.pages_memorized {
            if pages < 0 {
                return Err(TrackingError::NegativePages(pages));
            }
        }
        let notes = self
            .notes
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());

        Ok(ValidatedTracking {
            student_id: self.student_id,
            schedule_id: self.schedule_id,
            date: self.date,
            range: self.range,
            reading_type: self.reading_type,
            pages_memorized: self.pages_memorized,
            notes,
        })
    }
}

/// A tracking entry that passed validation and awaits a storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTracking {
    pub student_id: StudentId,
    pub schedule_id: Option<ScheduleId>,
    pub date: NaiveDate,
    pub range: VerseRange,
    pub reading_type: ReadingType,
    pub pages_memorized: Option<i32>,
    pub notes: Option<String>,
}

impl ValidatedTracking {
    #[must_use]
    pub fn assign_id(self, id: TrackingRecordId) -> TrackingRecord {
        TrackingRecord {
            id,
            student_id: self.student_id,
            schedule_id: self.schedule_id,
            date: self.date,
            range: self.range,
            reading_type: self.reading_type,
            pages_memorized: self.pages_memorized,
            notes: self.notes,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
