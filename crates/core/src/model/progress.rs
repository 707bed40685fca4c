use serde::{Deserialize, Serialize};

/// Discrete schedule status shown as a badge next to the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Completed,
    OnTrack,
    Behind,
    SignificantlyBehind,
    Overdue,
    Inactive,
}

impl Status {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Completed => "completed",
            Status::OnTrack => "on_track",
            Status::Behind => "behind",
            Status::SignificantlyBehind => "significantly_behind",
            Status::Overdue => "overdue",
            Status::Inactive => "inactive",
        }
    }

    /// `Completed` is terminal; nothing recorded later can move a schedule out of it.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed)
    }
}

/// Unit in which cumulative and expected progress are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMeasure {
    Pages,
    Verses,
}

/// Derived, non-persisted view of a schedule's progress.
///
/// Expected values are `0.0` for a unit the schedule has no target rate in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub cumulative_pages: u32,
    pub cumulative_verses: u32,
    pub expected_pages_to_date: f64,
    pub expected_verses_to_date: f64,
    /// 0..=100, only when a page total is set and progress is measured in pages.
    pub percentage: Option<u8>,
    pub status: Status,
    pub measure: ProgressMeasure,
    pub days_elapsed: i64,
    pub periods_elapsed: f64,
    pub deficit_ratio: f64,
    pub skipped_records: usize,
}
