use std::sync::Arc;

use hifz_core::model::{Homework, HomeworkDraft, StudentId};
use hifz_core::range::RangeResolver;
use hifz_storage::repository::HomeworkRepository;
use tracing::info;

use crate::Clock;
use crate::error::HomeworkServiceError;

/// Assigns memorization homework; ranges follow the strict ordering rule.
#[derive(Clone)]
pub struct HomeworkService {
    clock: Clock,
    resolver: RangeResolver,
    homework: Arc<dyn HomeworkRepository>,
}

impl HomeworkService {
    #[must_use]
    pub fn new(
        clock: Clock,
        resolver: RangeResolver,
        homework: Arc<dyn HomeworkRepository>,
    ) -> Self {
        Self {
            clock,
            resolver,
            homework,
        }
    }

    /// Validate and persist homework assigned today.
    ///
    /// # Errors
    ///
    /// Returns `HomeworkServiceError::Homework` for an invalid range or due
    /// date, `HomeworkServiceError::Storage` if persistence fails.
    pub async fn assign(&self, draft: HomeworkDraft) -> Result<Homework, HomeworkServiceError> {
        let validated = draft.validate(&self.resolver, self.clock.today())?;
        let homework = self.homework.insert_homework(validated).await?;
        info!(
            homework_id = %homework.id,
            student_id = %homework.student_id,
            range = %homework.range,
            "assigned homework"
        );
        Ok(homework)
    }

    /// # Errors
    ///
    /// Returns `HomeworkServiceError::Storage` if repository access fails.
    pub async fn list_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Homework>, HomeworkServiceError> {
        Ok(self.homework.homework_for_student(student_id).await?)
    }
}
