//! Aggregation of tracking records into schedule progress and status.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::model::{
    ProgressMeasure, ProgressSnapshot, Schedule, ScheduleId, ScheduleType, Status, StudentId,
    TrackingRecord, TrackingRecordId,
};
use crate::range::{RangeError, RangeResolver};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A tracking record that cannot take part in aggregation.
///
/// These never abort a computation: the record is logged and skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MalformedRecordError {
    #[error("record {record_id} has negative pages memorized ({pages})")]
    NegativePages {
        record_id: TrackingRecordId,
        pages: i32,
    },

    #[error("record {record_id} dated {date} precedes schedule start {start}")]
    BeforeStart {
        record_id: TrackingRecordId,
        date: NaiveDate,
        start: NaiveDate,
    },

    #[error("record {record_id} belongs to student {found}, expected {expected}")]
    ForeignStudent {
        record_id: TrackingRecordId,
        expected: StudentId,
        found: StudentId,
    },

    #[error("record {record_id} belongs to schedule {found}, expected {expected}")]
    ForeignSchedule {
        record_id: TrackingRecordId,
        expected: ScheduleId,
        found: ScheduleId,
    },

    #[error("record {record_id} has an unusable range")]
    InvalidRange {
        record_id: TrackingRecordId,
        #[source]
        source: RangeError,
    },
}

//
// ─── CONTRIBUTION ──────────────────────────────────────────────────────────────
//

/// What one memorization record adds to the running totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Contribution {
    pub pages: u32,
    pub verses: u32,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Computes [`ProgressSnapshot`]s from a schedule and its tracking records.
///
/// Pure and deterministic: the caller supplies `today`, so identical inputs
/// always yield identical snapshots.
///
/// # Examples
///
/// ```
/// # use chrono::{Duration, Utc};
/// # use hifz_core::model::{ScheduleDraft, ScheduleId, ScheduleType, Status, StudentId};
/// # use hifz_core::progress::ScheduleProgressEngine;
/// let today = Utc::now().date_naive();
/// let schedule = ScheduleDraft {
///     student_id: StudentId::new(1),
///     title: None,
///     schedule_type: ScheduleType::Daily,
///     pages_per_period: Some(5.0),
///     verses_per_period: None,
///     start_date: today - Duration::days(10),
///     expected_completion_date: None,
///     target_total_pages: None,
///     is_active: true,
/// }
/// .validate(ScheduleId::new(1), Utc::now())?;
///
/// let snapshot = ScheduleProgressEngine::default().compute_progress(&schedule, &[], today);
/// assert_eq!(snapshot.expected_pages_to_date, 50.0);
/// assert_eq!(snapshot.status, Status::SignificantlyBehind);
/// # Ok::<(), hifz_core::model::ScheduleError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScheduleProgressEngine {
    config: EngineConfig,
    resolver: RangeResolver,
}

impl ScheduleProgressEngine {
    #[must_use]
    pub fn new(config: EngineConfig, resolver: RangeResolver) -> Self {
        Self { config, resolver }
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::new(config, RangeResolver::standard())
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn resolver(&self) -> &RangeResolver {
        &self.resolver
    }

    /// Aggregate `records` against `schedule` as of `today`.
    ///
    /// Malformed records are logged, counted in `skipped_records`, and
    /// otherwise ignored.
    #[must_use]
    pub fn compute_progress(
        &self,
        schedule: &Schedule,
        records: &[TrackingRecord],
        today: NaiveDate,
    ) -> ProgressSnapshot {
        let mut cumulative_pages = 0_u32;
        let mut cumulative_verses = 0_u32;
        let mut skipped_records = 0_usize;

        for record in records {
            match self.contribution(schedule, record) {
                Ok(Some(c)) => {
                    cumulative_pages = cumulative_pages.saturating_add(c.pages);
                    cumulative_verses = cumulative_verses.saturating_add(c.verses);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(schedule_id = %schedule.id(), error = %err, "skipping malformed tracking record");
                    skipped_records += 1;
                }
            }
        }

        let days_elapsed = today
            .signed_duration_since(schedule.start_date())
            .num_days()
            .max(0);
        let periods_elapsed = self.periods_elapsed(schedule.schedule_type(), days_elapsed);

        let rate = schedule.target_rate();
        let expected_pages_to_date = rate
            .pages_per_period()
            .map_or(0.0, |pages| periods_elapsed * pages);
        let expected_verses_to_date = rate
            .verses_per_period()
            .map_or(0.0, |verses| periods_elapsed * verses);

        let measure = if rate.pages_per_period().is_some() {
            ProgressMeasure::Pages
        } else {
            ProgressMeasure::Verses
        };
        let (cumulative, expected) = match measure {
            ProgressMeasure::Pages => (f64::from(cumulative_pages), expected_pages_to_date),
            ProgressMeasure::Verses => (f64::from(cumulative_verses), expected_verses_to_date),
        };
        let deficit_ratio = (expected - cumulative) / expected.max(1.0);

        // A page total only acts as a finish line when progress is measured in pages.
        let page_total = schedule
            .target_total_pages()
            .filter(|_| measure == ProgressMeasure::Pages);
        let percentage = page_total.map(|total| percentage(cumulative_pages, total));
        let completed = page_total.is_some_and(|total| cumulative_pages >= total);

        let status = self.derive_status(schedule, today, completed, deficit_ratio);

        debug!(
            schedule_id = %schedule.id(),
            cumulative_pages,
            cumulative_verses,
            expected_pages_to_date,
            status = status.as_str(),
            "computed schedule progress"
        );

        ProgressSnapshot {
            cumulative_pages,
            cumulative_verses,
            expected_pages_to_date,
            expected_verses_to_date,
            percentage,
            status,
            measure,
            days_elapsed,
            periods_elapsed,
            deficit_ratio,
            skipped_records,
        }
    }

    /// Decide whether `record` counts toward `schedule` and by how much.
    ///
    /// Returns `Ok(None)` for well-formed records that do not count
    /// (revision and reading sessions).
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecordError` when the record belongs elsewhere,
    /// predates the schedule, or has a negative page count. A memorization
    /// range that does not resolve is malformed only for verse-measured
    /// schedules; page-measured ones keep the pages and add no verses.
    pub fn contribution(
        &self,
        schedule: &Schedule,
        record: &TrackingRecord,
    ) -> Result<Option<Contribution>, MalformedRecordError> {
        let record_id = record.id;
        if record.student_id != schedule.student_id() {
            return Err(MalformedRecordError::ForeignStudent {
                record_id,
                expected: schedule.student_id(),
                found: record.student_id,
            });
        }
        if let Some(found) = record.schedule_id {
            if found != schedule.id() {
                return Err(MalformedRecordError::ForeignSchedule {
                    record_id,
                    expected: schedule.id(),
                    found,
                });
            }
        }
        if let Some(pages) = record.pages_memorized {
            if pages < 0 {
                return Err(MalformedRecordError::NegativePages { record_id, pages });
            }
        }
        if record.date < schedule.start_date() {
            return Err(MalformedRecordError::BeforeStart {
                record_id,
                date: record.date,
                start: schedule.start_date(),
            });
        }
        if !record.reading_type.counts_toward_progress() {
            return Ok(None);
        }

        let verses = match self.resolver.verse_span(&record.range) {
            Ok(verses) => verses,
            // pages are measured independently of the verse mapping
            Err(source) if schedule.target_rate().pages_per_period().is_some() => {
                warn!(%record_id, error = %source, "range does not resolve; counting pages only");
                0
            }
            Err(source) => return Err(MalformedRecordError::InvalidRange { record_id, source }),
        };
        let pages = record.pages_memorized.map_or(0, i32::unsigned_abs);
        Ok(Some(Contribution { pages, verses }))
    }

    /// Fractional number of schedule periods in `days_elapsed`.
    #[must_use]
    pub fn periods_elapsed(&self, schedule_type: ScheduleType, days_elapsed: i64) -> f64 {
        // Elapsed days stay far below 2^52, so the cast is exact.
        #[allow(clippy::cast_precision_loss)]
        let days = days_elapsed as f64;
        match schedule_type {
            ScheduleType::Daily => days,
            ScheduleType::Weekly => days / self.config.days_per_week,
            ScheduleType::Monthly => days / self.config.days_per_month,
        }
    }

    fn derive_status(
        &self,
        schedule: &Schedule,
        today: NaiveDate,
        completed: bool,
        deficit_ratio: f64,
    ) -> Status {
        if !schedule.is_active() {
            return Status::Inactive;
        }
        if completed {
            return Status::Completed;
        }
        if schedule
            .expected_completion_date()
            .is_some_and(|deadline| today > deadline)
        {
            return Status::Overdue;
        }
        if deficit_ratio <= 0.0 {
            Status::OnTrack
        } else if deficit_ratio <= self.config.behind_threshold {
            Status::Behind
        } else {
            Status::SignificantlyBehind
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentage(cumulative: u32, total: u32) -> u8 {
    let pct = (f64::from(cumulative) / f64::from(total) * 100.0)
        .round()
        .min(100.0);
    pct as u8
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReadingType, ScheduleDraft, VerseRange};
    use crate::time::{fixed_now, fixed_today};
    use chrono::Duration;

    const STUDENT: u64 = 1;
    const SCHEDULE: u64 = 10;

    fn draft(days_ago: i64) -> ScheduleDraft {
        ScheduleDraft {
            student_id: StudentId::new(STUDENT),
            title: None,
            schedule_type: ScheduleType::Daily,
            pages_per_period: Some(5.0),
            verses_per_period: None,
            start_date: fixed_today() - Duration::days(days_ago),
            expected_completion_date: None,
            target_total_pages: None,
            is_active: true,
        }
    }

    fn build(draft: ScheduleDraft) -> Schedule {
        draft.validate(ScheduleId::new(SCHEDULE), fixed_now()).unwrap()
    }

    fn record(id: u64, days_ago: i64, pages: i32) -> TrackingRecord {
        TrackingRecord {
            id: TrackingRecordId::new(id),
            student_id: StudentId::new(STUDENT),
            schedule_id: Some(ScheduleId::new(SCHEDULE)),
            date: fixed_today() - Duration::days(days_ago),
            range: VerseRange::within(2, 1, 10),
            reading_type: ReadingType::Memorize,
            pages_memorized: Some(pages),
            notes: None,
        }
    }

    fn engine() -> ScheduleProgressEngine {
        ScheduleProgressEngine::default()
    }

    #[test]
    fn no_records_after_ten_days_is_significantly_behind() {
        let schedule = build(draft(10));
        let snap = engine().compute_progress(&schedule, &[], fixed_today());

        assert_eq!(snap.days_elapsed, 10);
        assert!((snap.expected_pages_to_date - 50.0).abs() < f64::EPSILON);
        assert_eq!(snap.cumulative_pages, 0);
        assert!((snap.deficit_ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(snap.status, Status::SignificantlyBehind);
        assert_eq!(snap.percentage, None);
        assert_eq!(snap.measure, ProgressMeasure::Pages);
    }

    #[test]
    fn exceeding_expectation_is_on_track() {
        let schedule = build(draft(10));
        let records: Vec<_> = (0..4)
            .map(|i| record(i, 9 - i64::try_from(i).unwrap(), 13))
            .collect();
        let snap = engine().compute_progress(&schedule, &records, fixed_today());

        assert_eq!(snap.cumulative_pages, 52);
        assert_eq!(snap.status, Status::OnTrack);
        assert!(snap.deficit_ratio < 0.0);
    }

    #[test]
    fn reaching_page_total_completes_regardless_of_elapsed_time() {
        let mut d = draft(1_000);
        d.target_total_pages = Some(100);
        d.expected_completion_date = Some(fixed_today() - Duration::days(500));
        let schedule = build(d);
        let records = vec![record(1, 900, 60), record(2, 800, 40)];

        let snap = engine().compute_progress(&schedule, &records, fixed_today());

        assert_eq!(snap.cumulative_pages, 100);
        assert_eq!(snap.status, Status::Completed);
        assert_eq!(snap.percentage, Some(100));
        assert!(snap.status.is_terminal());
    }

    #[test]
    fn inactive_schedule_overrides_everything() {
        let mut d = draft(10);
        d.target_total_pages = Some(20);
        d.is_active = false;
        let schedule = build(d);
        let snap = engine().compute_progress(&schedule, &[record(1, 2, 80)], fixed_today());

        assert_eq!(snap.status, Status::Inactive);
        assert_eq!(snap.percentage, Some(100));
    }

    #[test]
    fn deficit_threshold_is_inclusive_for_behind() {
        let schedule = build(draft(8)); // expects 40 pages
        let behind = engine().compute_progress(&schedule, &[record(1, 1, 30)], fixed_today());
        assert!((behind.deficit_ratio - 0.25).abs() < f64::EPSILON);
        assert_eq!(behind.status, Status::Behind);

        let worse = engine().compute_progress(&schedule, &[record(1, 1, 29)], fixed_today());
        assert_eq!(worse.status, Status::SignificantlyBehind);
    }

    #[test]
    fn threshold_is_configurable() {
        let schedule = build(draft(10));
        let config = EngineConfig {
            behind_threshold: 0.5,
            ..EngineConfig::default()
        };
        let snap = ScheduleProgressEngine::with_config(config).compute_progress(
            &schedule,
            &[record(1, 1, 30)],
            fixed_today(),
        );
        assert_eq!(snap.status, Status::Behind);
    }

    #[test]
    fn past_completion_date_is_overdue_even_when_on_pace() {
        let mut d = draft(10);
        d.expected_completion_date = Some(fixed_today() - Duration::days(1));
        d.target_total_pages = Some(500);
        let schedule = build(d);
        let snap = engine().compute_progress(&schedule, &[record(1, 1, 60)], fixed_today());

        assert_eq!(snap.status, Status::Overdue);
        assert_eq!(snap.percentage, Some(12));
    }

    #[test]
    fn completion_date_today_is_not_overdue() {
        let mut d = draft(10);
        d.expected_completion_date = Some(fixed_today());
        let schedule = build(d);
        let snap = engine().compute_progress(&schedule, &[record(1, 1, 50)], fixed_today());
        assert_eq!(snap.status, Status::OnTrack);
    }

    #[test]
    fn schedule_starting_today_or_later_expects_nothing() {
        for days_ago in [0, -3] {
            let schedule = build(draft(days_ago));
            let snap = engine().compute_progress(&schedule, &[], fixed_today());
            assert_eq!(snap.days_elapsed, 0);
            assert!(snap.expected_pages_to_date.abs() < f64::EPSILON);
            assert_eq!(snap.status, Status::OnTrack);
        }
    }

    #[test]
    fn weekly_and_monthly_periods_are_fractional() {
        let e = engine();
        assert!((e.periods_elapsed(ScheduleType::Weekly, 14) - 2.0).abs() < f64::EPSILON);
        assert!((e.periods_elapsed(ScheduleType::Weekly, 10) - 10.0 / 7.0).abs() < 1e-12);
        assert!((e.periods_elapsed(ScheduleType::Monthly, 45) - 1.5).abs() < f64::EPSILON);

        let mut d = draft(45);
        d.schedule_type = ScheduleType::Monthly;
        d.pages_per_period = Some(20.0);
        let snap = e.compute_progress(&build(d), &[record(1, 3, 30)], fixed_today());
        assert!((snap.expected_pages_to_date - 30.0).abs() < 1e-9);
        assert_eq!(snap.status, Status::OnTrack);
    }

    #[test]
    fn verse_only_schedule_compares_verses_and_skips_page_completion() {
        let mut d = draft(3);
        d.pages_per_period = None;
        d.verses_per_period = Some(10.0);
        d.target_total_pages = Some(5);
        let schedule = build(d);

        let mut first = record(1, 2, 40);
        first.range = VerseRange::within(2, 1, 20);
        let mut second = record(2, 1, 0);
        second.range = VerseRange::within(2, 21, 25);

        let snap = engine().compute_progress(&schedule, &[first, second], fixed_today());

        assert_eq!(snap.measure, ProgressMeasure::Verses);
        assert_eq!(snap.cumulative_verses, 25);
        assert!((snap.expected_verses_to_date - 30.0).abs() < f64::EPSILON);
        assert!(snap.expected_pages_to_date.abs() < f64::EPSILON);
        assert_eq!(snap.percentage, None);
        // 40 pages would complete a page schedule; here it only counts verses
        assert_eq!(snap.status, Status::Behind);
    }

    #[test]
    fn revision_and_reading_do_not_count() {
        let schedule = build(draft(2));
        let mut revise = record(1, 1, 30);
        revise.reading_type = ReadingType::Revise;
        let mut read = record(2, 1, 30);
        read.reading_type = ReadingType::Read;

        let snap = engine().compute_progress(&schedule, &[revise, read], fixed_today());
        assert_eq!(snap.cumulative_pages, 0);
        assert_eq!(snap.cumulative_verses, 0);
        assert_eq!(snap.skipped_records, 0);
    }

    #[test]
    fn malformed_records_are_skipped_without_aborting() {
        let schedule = build(draft(10));
        let mut foreign = record(4, 1, 100);
        foreign.student_id = StudentId::new(99);
        let mut other_schedule = record(5, 1, 100);
        other_schedule.schedule_id = Some(ScheduleId::new(77));

        let records = vec![
            record(1, 5, 20),
            record(2, 3, -7),
            record(3, 11, 100),
            foreign,
            other_schedule,
            record(7, 1, 25),
        ];
        let snap = engine().compute_progress(&schedule, &records, fixed_today());

        assert_eq!(snap.cumulative_pages, 45);
        assert_eq!(snap.skipped_records, 4);
        assert_eq!(snap.status, Status::Behind);
    }

    #[test]
    fn unresolvable_range_keeps_pages_in_page_mode() {
        let mut bad_range = record(6, 1, 12);
        bad_range.range = VerseRange::new(114, 1, 1, 1);
        let records = [record(1, 2, 4), bad_range.clone()];

        let pages_schedule = build(draft(10));
        let snap = engine().compute_progress(&pages_schedule, &records, fixed_today());
        assert_eq!(snap.cumulative_pages, 16);
        assert_eq!(snap.cumulative_verses, 10);
        assert_eq!(snap.skipped_records, 0);

        let mut verse_draft = draft(10);
        verse_draft.pages_per_period = None;
        verse_draft.verses_per_period = Some(20.0);
        let verse_schedule = build(verse_draft);
        let snap = engine().compute_progress(&verse_schedule, &records, fixed_today());
        assert_eq!(snap.cumulative_verses, 10);
        assert_eq!(snap.skipped_records, 1);
        assert!(matches!(
            engine().contribution(&verse_schedule, &bad_range),
            Err(MalformedRecordError::InvalidRange { .. })
        ));
    }

    #[test]
    fn contribution_reports_the_reason() {
        let schedule = build(draft(10));
        let err = engine()
            .contribution(&schedule, &record(3, 11, 4))
            .unwrap_err();
        assert!(matches!(err, MalformedRecordError::BeforeStart { .. }));

        let err = engine()
            .contribution(&schedule, &record(2, 1, -1))
            .unwrap_err();
        assert_eq!(
            err,
            MalformedRecordError::NegativePages {
                record_id: TrackingRecordId::new(2),
                pages: -1
            }
        );

        let ok = engine().contribution(&schedule, &record(1, 1, 4)).unwrap();
        assert_eq!(ok, Some(Contribution { pages: 4, verses: 10 }));
    }

    #[test]
    fn unscoped_records_count_for_the_students_schedule() {
        let schedule = build(draft(2));
        let mut unscoped = record(1, 1, 10);
        unscoped.schedule_id = None;
        let snap = engine().compute_progress(&schedule, &[unscoped], fixed_today());
        assert_eq!(snap.cumulative_pages, 10);
    }

    #[test]
    fn compute_progress_is_idempotent() {
        let mut d = draft(20);
        d.target_total_pages = Some(604);
        let schedule = build(d);
        let records = vec![record(1, 15, 12), record(2, 4, -1), record(3, 2, 33)];

        let e = engine();
        let first = e.compute_progress(&schedule, &records, fixed_today());
        let second = e.compute_progress(&schedule, &records, fixed_today());
        assert_eq!(first, second);
    }

    #[test]
    fn percentage_rounds_and_caps() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(700, 604), 100);
        assert_eq!(percentage(0, 10), 0);
    }
}
