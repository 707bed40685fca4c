use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::VerseRange;
use crate::model::ids::{HomeworkId, StudentId};
use crate::range::{RangeError, RangeMode, RangeResolver};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HomeworkError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("due date {due_on} is before assignment date {assigned_on}")]
    DueBeforeAssigned {
        assigned_on: NaiveDate,
        due_on: NaiveDate,
    },
}

/// Unvalidated memorization homework from the assignment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeworkDraft {
    pub student_id: StudentId,
    pub range: VerseRange,
    pub due_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl HomeworkDraft {
    /// Validate with the strict ordering rule: the assigned span must end
    /// strictly after it starts.
    ///
    /// # Errors
    ///
    /// Returns `HomeworkError::Range` for invalid ranges and
    /// `HomeworkError::DueBeforeAssigned` for a due date in the past.
    pub fn validate(
        self,
        resolver: &RangeResolver,
        assigned_on: NaiveDate,
    ) -> Result<ValidatedHomework, HomeworkError> {
        resolver.validate(&self.range, RangeMode::Strict)?;
        if let Some(due_on) = self.due_on {
            if due_on < assigned_on {
                return Err(HomeworkError::DueBeforeAssigned {
                    assigned_on,
                    due_on,
                });
            }
        }
        Ok(ValidatedHomework {
            student_id: self.student_id,
            range: self.range,
            assigned_on,
            due_on: self.due_on,
            notes: self
                .notes
                .map(|n| n.trim().to_owned())
                .filter(|n| !n.is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedHomework {
    pub student_id: StudentId,
    pub range: VerseRange,
    pub assigned_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ValidatedHomework {
    #[must_use]
    pub fn assign_id(self, id: HomeworkId) -> Homework {
        Homework {
            id,
            student_id: self.student_id,
            range: self.range,
            assigned_on: self.assigned_on,
            due_on: self.due_on,
            notes: self.notes,
        }
    }
}

/// A persisted homework assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Homework {
    pub id: HomeworkId,
    pub student_id: StudentId,
    pub range: VerseRange,
    pub assigned_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_today;
    use chrono::Duration;

    #[test]
    fn homework_requires_strictly_forward_range() {
        let resolver = RangeResolver::standard();
        let draft = HomeworkDraft {
            student_id: StudentId::new(1),
            range: VerseRange::within(2, 5, 5),
            due_on: None,
            notes: None,
        };
        let err = draft.validate(&resolver, fixed_today()).unwrap_err();
        assert!(matches!(err, HomeworkError::Range(RangeError::InvalidOrder { .. })));
    }

    #[test]
    fn due_date_must_not_precede_assignment() {
        let resolver = RangeResolver::standard();
        let today = fixed_today();
        let draft = HomeworkDraft {
            student_id: StudentId::new(1),
            range: VerseRange::within(67, 1, 10),
            due_on: Some(today - Duration::days(1)),
            notes: None,
        };
        assert!(matches!(
            draft.clone().validate(&resolver, today),
            Err(HomeworkError::DueBeforeAssigned { .. })
        ));

        let ok = HomeworkDraft {
            due_on: Some(today + Duration::days(7)),
            notes: Some(" tajweed on madd ".into()),
            ..draft
        }
        .validate(&resolver, today)
        .unwrap()
        .assign_id(HomeworkId::new(4));
        assert_eq!(ok.notes.as_deref(), Some("tajweed on madd"));
        assert_eq!(ok.assigned_on, today);
    }
}
