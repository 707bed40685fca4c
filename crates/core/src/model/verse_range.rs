use serde::{Deserialize, Serialize};
use std::fmt;

/// First page of the standard 604-page Mushaf.
pub const FIRST_PAGE: u16 = 1;
/// Last page of the standard 604-page Mushaf.
pub const LAST_PAGE: u16 = 604;

/// A recitation span from (`surah_from`, `verse_from`) to (`surah_to`, `verse_to`),
/// optionally annotated with the Mushaf pages it covers.
///
/// This is raw input as submitted by a form or loaded from storage; run it
/// through [`crate::range::validate_range`] before trusting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseRange {
    pub surah_from: u16,
    pub verse_from: u16,
    pub surah_to: u16,
    pub verse_to: u16,
    #[serde(default)]
    pub page_from: Option<u16>,
    #[serde(default)]
    pub page_to: Option<u16>,
}

impl VerseRange {
    #[must_use]
    pub fn new(surah_from: u16, verse_from: u16, surah_to: u16, verse_to: u16) -> Self {
        Self {
            surah_from,
            verse_from,
            surah_to,
            verse_to,
            page_from: None,
            page_to: None,
        }
    }

    /// A range inside one Surah.
    #[must_use]
    pub fn within(surah: u16, verse_from: u16, verse_to: u16) -> Self {
        Self::new(surah, verse_from, surah, verse_to)
    }

    #[must_use]
    pub fn with_pages(mut self, page_from: Option<u16>, page_to: Option<u16>) -> Self {
        self.page_from = page_from;
        self.page_to = page_to;
        self
    }

    #[must_use]
    pub fn is_single_surah(&self) -> bool {
        self.surah_from == self.surah_to
    }

    #[must_use]
    pub fn start(&self) -> (u16, u16) {
        (self.surah_from, self.verse_from)
    }

    #[must_use]
    pub fn end(&self) -> (u16, u16) {
        (self.surah_to, self.verse_to)
    }
}

impl fmt::Display for VerseRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.surah_from, self.verse_from, self.surah_to, self.verse_to
        )?;
        match (self.page_from, self.page_to) {
            (Some(from), Some(to)) => write!(f, " (p. {from}-{to})"),
            (Some(page), None) | (None, Some(page)) => write!(f, " (p. {page})"),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_pages_when_present() {
        let range = VerseRange::new(2, 1, 2, 5);
        assert_eq!(range.to_string(), "2:1-2:5");
        let range = range.with_pages(Some(2), Some(3));
        assert_eq!(range.to_string(), "2:1-2:5 (p. 2-3)");
    }

    #[test]
    fn deserializes_without_page_fields() {
        let range: VerseRange = serde_json::from_str(
            r#"{"surah_from":1,"verse_from":1,"surah_to":1,"verse_to":7}"#,
        )
        .unwrap();
        assert_eq!(range, VerseRange::within(1, 1, 7));
        assert!(range.is_single_surah());
    }
}
