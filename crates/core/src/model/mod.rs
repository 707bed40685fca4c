mod homework;
mod ids;
mod progress;
mod schedule;
mod surah;
mod tracking;
mod verse_range;

pub use ids::{HomeworkId, ParseIdError, ScheduleId, StudentId, TrackingRecordId};

pub use homework::{Homework, HomeworkDraft, HomeworkError, ValidatedHomework};
pub use progress::{ProgressMeasure, ProgressSnapshot, Status};
pub use schedule::{Schedule, ScheduleDraft, ScheduleError, ScheduleType, TargetRate, activate};
pub use surah::{SURAH_COUNT, Surah, SurahTable, SurahTableError};
pub use tracking::{ReadingType, TrackingDraft, TrackingError, TrackingRecord, ValidatedTracking};
pub use verse_range::{FIRST_PAGE, LAST_PAGE, VerseRange};
