use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of Surahs in the Qur'an.
pub const SURAH_COUNT: u16 = 114;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SurahTableError {
    #[error("surah table cannot be empty")]
    Empty,

    #[error("surah table holds {len} entries, at most 114 allowed")]
    TooManySurahs { len: usize },

    #[error("surah ids must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguousId { expected: u16, found: u16 },

    #[error("surah {surah} must have at least one verse")]
    NoVerses { surah: u16 },
}

//
// ─── SURAH ─────────────────────────────────────────────────────────────────────
//

/// One chapter of the Qur'an.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surah {
    id: u16,
    name: String,
    verse_count: u16,
}

impl Surah {
    #[must_use]
    pub fn new(id: u16, name: impl Into<String>, verse_count: u16) -> Self {
        Self {
            id,
            name: name.into(),
            verse_count,
        }
    }

    #[must_use]
    pub fn id(&self) -> u16 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn verse_count(&self) -> u16 {
        self.verse_count
    }

    /// True when `verse` lies in `1..=verse_count`.
    #[must_use]
    pub fn contains_verse(&self, verse: u16) -> bool {
        (1..=self.verse_count).contains(&verse)
    }
}

//
// ─── TABLE ─────────────────────────────────────────────────────────────────────
//

/// Immutable Surah reference data with precomputed verse offsets.
///
/// `offsets[i]` holds the number of verses preceding Surah `i + 1`, which lets
/// a (Surah, verse) pair be mapped to an absolute verse index in O(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurahTable {
    surahs: Vec<Surah>,
    offsets: Vec<u32>,
}

static STANDARD_TABLE: LazyLock<Arc<SurahTable>> = LazyLock::new(|| {
    let surahs = STANDARD_SURAHS
        .iter()
        .zip(1_u16..)
        .map(|(&(name, verses), id)| Surah::new(id, name, verses))
        .collect();
    Arc::new(SurahTable::from_validated(surahs))
});

impl SurahTable {
    /// The standard 114-Surah table (6236 verses).
    #[must_use]
    pub fn standard() -> Arc<SurahTable> {
        Arc::clone(&STANDARD_TABLE)
    }

    /// Build a table from custom entries.
    ///
    /// # Errors
    ///
    /// Returns `SurahTableError` if the table is empty, exceeds 114 entries,
    /// ids are not contiguous from 1, or a Surah has no verses.
    pub fn new(surahs: Vec<Surah>) -> Result<Self, SurahTableError> {
        if surahs.is_empty() {
            return Err(SurahTableError::Empty);
        }
        if surahs.len() > usize::from(SURAH_COUNT) {
            return Err(SurahTableError::TooManySurahs { len: surahs.len() });
        }
        for (surah, expected) in surahs.iter().zip(1_u16..) {
            if surah.id != expected {
                return Err(SurahTableError::NonContiguousId {
                    expected,
                    found: surah.id,
                });
            }
            if surah.verse_count == 0 {
                return Err(SurahTableError::NoVerses { surah: surah.id });
            }
        }
        Ok(Self::from_validated(surahs))
    }

    fn from_validated(surahs: Vec<Surah>) -> Self {
        let mut offsets = Vec::with_capacity(surahs.len());
        let mut running = 0_u32;
        for surah in &surahs {
            offsets.push(running);
            running += u32::from(surah.verse_count);
        }
        Self { surahs, offsets }
    }

    #[must_use]
    pub fn get(&self, id: u16) -> Option<&Surah> {
        let idx = usize::from(id).checked_sub(1)?;
        self.surahs.get(idx)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.surahs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surahs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surah> {
        self.surahs.iter()
    }

    #[must_use]
    pub fn total_verses(&self) -> u32 {
        self.surahs
            .iter()
            .map(|s| u32::from(s.verse_count))
            .sum()
    }

    /// Absolute 1-based verse index across the whole table.
    ///
    /// Returns `None` when the Surah is unknown or the verse is out of bounds.
    #[must_use]
    pub fn absolute_verse(&self, surah: u16, verse: u16) -> Option<u32> {
        let entry = self.get(surah)?;
        if !entry.contains_verse(verse) {
            return None;
        }
        let offset = self.offsets[usize::from(surah) - 1];
        Some(offset + u32::from(verse))
    }
}

// Hafs numbering.
const STANDARD_SURAHS: [(&str, u16); SURAH_COUNT as usize] = [
    ("Al-Fatihah", 7),
    ("Al-Baqarah", 286),
    ("Ali 'Imran", 200),
    ("An-Nisa", 176),
    ("Al-Ma'idah", 120),
    ("Al-An'am", 165),
    ("Al-A'raf", 206),
    ("Al-Anfal", 75),
    ("At-Tawbah", 129),
    ("Yunus", 109),
    ("Hud", 123),
    ("Yusuf", 111),
    ("Ar-Ra'd", 43),
    ("Ibrahim", 52),
    ("Al-Hijr", 99),
    ("An-Nahl", 128),
    ("Al-Isra", 111),
    ("Al-Kahf", 110),
    ("Maryam", 98),
    ("Taha", 135),
    ("Al-Anbya", 112),
    ("Al-Hajj", 78),
    ("Al-Mu'minun", 118),
    ("An-Nur", 64),
    ("Al-Furqan", 77),
    ("Ash-Shu'ara", 227),
    ("An-Naml", 93),
    ("Al-Qasas", 88),
    ("Al-'Ankabut", 69),
    ("Ar-Rum", 60),
    ("Luqman", 34),
    ("As-Sajdah", 30),
    ("Al-Ahzab", 73),
    ("Saba", 54),
    ("Fatir", 45),
    ("Ya-Sin", 83),
    ("As-Saffat", 182),
    ("Sad", 88),
    ("Az-Zumar", 75),
    ("Ghafir", 85),
    ("Fussilat", 54),
    ("Ash-Shuraa", 53),
    ("Az-Zukhruf", 89),
    ("Ad-Dukhan", 59),
    ("Al-Jathiyah", 37),
    ("Al-Ahqaf", 35),
    ("Muhammad", 38),
    ("Al-Fath", 29),
    ("Al-Hujurat", 18),
    ("Qaf", 45),
    ("Adh-Dhariyat", 60),
    ("At-Tur", 49),
    ("An-Najm", 62),
    ("Al-Qamar", 55),
    ("Ar-Rahman", 78),
    ("Al-Waqi'ah", 96),
    ("Al-Hadid", 29),
    ("Al-Mujadila", 22),
    ("Al-Hashr", 24),
    ("Al-Mumtahanah", 13),
    ("As-Saf", 14),
    ("Al-Jumu'ah", 11),
    ("Al-Munafiqun", 11),
    ("At-Taghabun", 18),
    ("At-Talaq", 12),
    ("At-Tahrim", 12),
    ("Al-Mulk", 30),
    ("Al-Qalam", 52),
    ("Al-Haqqah", 52),
    ("Al-Ma'arij", 44),
    ("Nuh", 28),
    ("Al-Jinn", 28),
    ("Al-Muzzammil", 20),
    ("Al-Muddaththir", 56),
    ("Al-Qiyamah", 40),
    ("Al-Insan", 31),
    ("Al-Mursalat", 50),
    ("An-Naba", 40),
    ("An-Nazi'at", 46),
    ("'Abasa", 42),
    ("At-Takwir", 29),
    ("Al-Infitar", 19),
    ("Al-Mutaffifin", 36),
    ("Al-Inshiqaq", 25),
    ("Al-Buruj", 22),
    ("At-Tariq", 17),
    ("Al-A'la", 19),
    ("Al-Ghashiyah", 26),
    ("Al-Fajr", 30),
    ("Al-Balad", 20),
    ("Ash-Shams", 15),
    ("Al-Layl", 21),
    ("Ad-Duhaa", 11),
    ("Ash-Sharh", 8),
    ("At-Tin", 8),
    ("Al-'Alaq", 19),
    ("Al-Qadr", 5),
    ("Al-Bayyinah", 8),
    ("Az-Zalzalah", 8),
    ("Al-'Adiyat", 11),
    ("Al-Qari'ah", 11),
    ("At-Takathur", 8),
    ("Al-'Asr", 3),
    ("Al-Humazah", 9),
    ("Al-Fil", 5),
    ("Quraysh", 4),
    ("Al-Ma'un", 7),
    ("Al-Kawthar", 3),
    ("Al-Kafirun", 6),
    ("An-Nasr", 3),
    ("Al-Masad", 5),
    ("Al-Ikhlas", 4),
    ("Al-Falaq", 5),
    ("An-Nas", 6),
];

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_has_all_surahs() {
        let table = SurahTable::standard();
        assert_eq!(table.len(), 114);
        assert_eq!(table.total_verses(), 6236);
        assert_eq!(table.get(1).unwrap().verse_count(), 7);
        assert_eq!(table.get(2).unwrap().name(), "Al-Baqarah");
        assert_eq!(table.get(114).unwrap().verse_count(), 6);
    }

    #[test]
    fn lookup_rejects_out_of_range_ids() {
        let table = SurahTable::standard();
        assert!(table.get(0).is_none());
        assert!(table.get(115).is_none());
    }

    #[test]
    fn absolute_verse_spans_the_whole_book() {
        let table = SurahTable::standard();
        assert_eq!(table.absolute_verse(1, 1), Some(1));
        assert_eq!(table.absolute_verse(1, 7), Some(7));
        assert_eq!(table.absolute_verse(2, 1), Some(8));
        assert_eq!(table.absolute_verse(114, 6), Some(6236));
        assert_eq!(table.absolute_verse(1, 8), None);
        assert_eq!(table.absolute_verse(3, 0), None);
    }

    #[test]
    fn custom_table_requires_contiguous_ids() {
        let err = SurahTable::new(vec![Surah::new(1, "A", 3), Surah::new(3, "C", 4)]).unwrap_err();
        assert_eq!(
            err,
            SurahTableError::NonContiguousId {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn custom_table_rejects_empty_and_verseless() {
        assert_eq!(SurahTable::new(Vec::new()).unwrap_err(), SurahTableError::Empty);
        let err = SurahTable::new(vec![Surah::new(1, "A", 0)]).unwrap_err();
        assert_eq!(err, SurahTableError::NoVerses { surah: 1 });
    }
}
