use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::ledger::record::EnrichedRecord;

/// Upper-cases, strips diacritics and collapses whitespace.
pub fn normalize_text(raw: &str) -> String {
    let folded = raw
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>()
        .to_uppercase();
    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Drops a trailing `S` from every word longer than three characters, so
/// `CADEIRAS` matches `CADEIRA`.
pub fn singularize(normalized: &str) -> String {
    normalized
        .split(' ')
        .map(|word| {
            if word.chars().count() > 3 {
                word.strip_suffix('S').unwrap_or(word)
            } else {
                word
            }
        })
        .collect::<Vec<&str>>()
        .join(" ")
}

fn fold(raw: &str) -> String {
    singularize(&normalize_text(raw))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordQuery {
    raw: String,
    folded: String,
}

impl KeywordQuery {
    /// `None` when the query is blank after normalization.
    pub fn new(raw: &str) -> Option<Self> {
        let folded = fold(raw);
        if folded.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.trim().to_string(),
            folded,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn matches(&self, row: &EnrichedRecord) -> bool {
        fold(&row.record.description).contains(&self.folded)
    }

    pub fn apply<'a, I>(&self, rows: I) -> Vec<&'a EnrichedRecord>
    where
        I: IntoIterator<Item = &'a EnrichedRecord>,
    {
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}
