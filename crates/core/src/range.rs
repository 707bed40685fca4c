//! Validation and ordering of Surah/verse/page spans.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{FIRST_PAGE, LAST_PAGE, SurahTable, VerseRange};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RangeError {
    #[error("surah {surah} does not exist")]
    SurahNotFound { surah: u16 },

    #[error("verse {verse} is outside surah {surah} (1..={verse_count})")]
    VerseOutOfBounds {
        surah: u16,
        verse: u16,
        verse_count: u16,
    },

    #[error("range {from_surah}:{from_verse} -> {to_surah}:{to_verse} goes backwards")]
    InvalidOrder {
        from_surah: u16,
        from_verse: u16,
        to_surah: u16,
        to_verse: u16,
    },

    #[error("invalid page range {page_from:?}..{page_to:?}: pages must be in 1..=604 and ascending")]
    InvalidPageRange {
        page_from: Option<u16>,
        page_to: Option<u16>,
    },
}

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

/// Which ordering rule a range must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// Homework assignment: the end must lie strictly after the start.
    Strict,
    /// Tracking entries: a single verse (`start == end`) is allowed.
    AllowSingleVerse,
}

impl RangeMode {
    #[must_use]
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::AllowSingleVerse
        }
    }

    #[must_use]
    pub fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

//
// ─── LINEAR POSITION ───────────────────────────────────────────────────────────
//

/// Ordering key for a range: absolute verse index of its start, then of its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinearPosition {
    pub start: u32,
    pub end: u32,
}

impl LinearPosition {
    /// Single integer form: start in the high 32 bits, end in the low 32.
    /// Agrees with the derived ordering for every table.
    #[must_use]
    pub fn key(&self) -> u64 {
        (u64::from(self.start) << 32) | u64::from(self.end)
    }
}

//
// ─── VALIDATION ────────────────────────────────────────────────────────────────
//

/// Validate `range` against `table` under the given ordering `mode`.
///
/// Checks run in order: Surah existence, verse bounds, ordering, pages.
///
/// # Errors
///
/// - `SurahNotFound` if either Surah id is not in the table
/// - `VerseOutOfBounds` if a verse is outside its Surah
/// - `InvalidOrder` if the range goes backwards (or is empty under `Strict`)
/// - `InvalidPageRange` if a page is outside 1..=604 or `page_from > page_to`
pub fn validate_range(
    range: &VerseRange,
    table: &SurahTable,
    mode: RangeMode,
) -> Result<(), RangeError> {
    for (surah, verse) in [range.start(), range.end()] {
        let entry = table
            .get(surah)
            .ok_or(RangeError::SurahNotFound { surah })?;
        if !entry.contains_verse(verse) {
            return Err(RangeError::VerseOutOfBounds {
                surah,
                verse,
                verse_count: entry.verse_count(),
            });
        }
    }

    let backwards = match range.surah_from.cmp(&range.surah_to) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal if mode.is_strict() => range.verse_from >= range.verse_to,
        std::cmp::Ordering::Equal => range.verse_from > range.verse_to,
    };
    if backwards {
        return Err(RangeError::InvalidOrder {
            from_surah: range.surah_from,
            from_verse: range.verse_from,
            to_surah: range.surah_to,
            to_verse: range.verse_to,
        });
    }

    validate_pages(range.page_from, range.page_to)
}

fn validate_pages(page_from: Option<u16>, page_to: Option<u16>) -> Result<(), RangeError> {
    let in_bounds = |page: Option<u16>| page.is_none_or(|p| (FIRST_PAGE..=LAST_PAGE).contains(&p));
    let ordered = match (page_from, page_to) {
        (Some(from), Some(to)) => from <= to,
        _ => true,
    };
    if in_bounds(page_from) && in_bounds(page_to) && ordered {
        Ok(())
    } else {
        Err(RangeError::InvalidPageRange { page_from, page_to })
    }
}

//
// ─── RESOLVER ──────────────────────────────────────────────────────────────────
//

/// Validates ranges and maps them onto absolute verse positions of a table.
///
/// # Examples
///
/// ```
/// # use hifz_core::range::{RangeMode, RangeResolver};
/// # use hifz_core::model::VerseRange;
/// let resolver = RangeResolver::standard();
/// let range = VerseRange::within(2, 1, 5);
/// resolver.validate(&range, RangeMode::Strict)?;
/// assert_eq!(resolver.verse_span(&range)?, 5);
/// # Ok::<(), hifz_core::range::RangeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RangeResolver {
    table: Arc<SurahTable>,
}

impl Default for RangeResolver {
    fn default() -> Self {
        Self::standard()
    }
}

impl RangeResolver {
    #[must_use]
    pub fn new(table: Arc<SurahTable>) -> Self {
        Self { table }
    }

    /// Resolver over the standard 114-Surah table.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(SurahTable::standard())
    }

    #[must_use]
    pub fn table(&self) -> &SurahTable {
        &self.table
    }

    /// See [`validate_range`].
    ///
    /// # Errors
    ///
    /// Returns `RangeError` when the range is not valid under `mode`.
    pub fn validate(&self, range: &VerseRange, mode: RangeMode) -> Result<(), RangeError> {
        validate_range(range, &self.table, mode)
    }

    /// Ordering key used to sort ranges in recitation order.
    ///
    /// Only Surah/verse bounds are checked; ordering and pages are not.
    ///
    /// # Errors
    ///
    /// Returns `SurahNotFound` or `VerseOutOfBounds` for endpoints outside the table.
    pub fn to_linear_position(&self, range: &VerseRange) -> Result<LinearPosition, RangeError> {
        Ok(LinearPosition {
            start: self.absolute(range.surah_from, range.verse_from)?,
            end: self.absolute(range.surah_to, range.verse_to)?,
        })
    }

    /// Number of verses covered by a range, endpoints included.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if the range does not validate as a tracking range.
    pub fn verse_span(&self, range: &VerseRange) -> Result<u32, RangeError> {
        self.validate(range, RangeMode::AllowSingleVerse)?;
        let position = self.to_linear_position(range)?;
        Ok(position.end - position.start + 1)
    }

    fn absolute(&self, surah: u16, verse: u16) -> Result<u32, RangeError> {
        let entry = self
            .table
            .get(surah)
            .ok_or(RangeError::SurahNotFound { surah })?;
        self.table
            .absolute_verse(surah, verse)
            .ok_or(RangeError::VerseOutOfBounds {
                surah,
                verse,
                verse_count: entry.verse_count(),
            })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
