//! Weighted full-text matching over `name` and `description`.
//!
//! One combined index covers both fields. A record's score is the weighted
//! count of query-term occurrences: each hit in `name` counts
//! [`NAME_WEIGHT`], each hit in `description` counts [`DESCRIPTION_WEIGHT`].
//! Terms are OR-ed; a record matches when its score is positive.

use resmeta_common::MetadataRecord;

pub const NAME_WEIGHT: u32 = 2;
pub const DESCRIPTION_WEIGHT: u32 = 1;

/// Parsed `search` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    terms: Vec<String>,
}

impl TextQuery {
    /// Parse whitespace-separated keywords. Returns `None` when no term survives
    /// tokenization.
    #[must_use]
    pub fn parse(search: &str) -> Option<Self> {
        let mut terms: Vec<String> = tokenize(search).collect();
        terms.sort_unstable();
        terms.dedup();
        if terms.is_empty() {
            None
        } else {
            Some(Self { terms })
        }
    }

    /// Relevance score of `record` for this query; zero means no match
    #[must_use]
    pub fn score(&self, record: &MetadataRecord) -> u32 {
        NAME_WEIGHT * self.hits(record.name.as_deref())
            + DESCRIPTION_WEIGHT * self.hits(record.description.as_deref())
    }

    fn hits(&self, field: Option<&str>) -> u32 {
        let Some(text) = field else { return 0 };
        let count = tokenize(text)
            .filter(|token| self.terms.binary_search(token).is_ok())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// Lower-cased alphanumeric runs
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}
