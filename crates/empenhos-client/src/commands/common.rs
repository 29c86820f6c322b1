use std::path::Path;

use crate::config::Settings;
use crate::contracts::types::{AppliedFilter, LoadSummary};
use crate::ledger::Ledger;
use crate::ledger::cache::LedgerCache;
use crate::ledger::filter::{Dimension, FilterSet, Selection};
use crate::store::{DocumentStore, open_store};
use crate::{ClientError, ClientResult};

/// Settings plus the ledger cache, owned by whoever serves the commands.
///
/// A long-lived caller keeps one `Dashboard` so repeated reports reuse the
/// parsed data files. The one-shot `*_with_options` entry points build a
/// fresh one per call.
#[derive(Debug, Clone)]
pub struct Dashboard {
    settings: Settings,
    cache: LedgerCache,
}

impl Dashboard {
    pub fn open(home_override: Option<&Path>) -> ClientResult<Self> {
        Ok(Self::new(Settings::load(home_override)?))
    }

    pub fn new(settings: Settings) -> Self {
        Self::with_cache(settings, LedgerCache::new())
    }

    pub fn with_cache(settings: Settings, cache: LedgerCache) -> Self {
        Self { settings, cache }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &LedgerCache {
        &self.cache
    }

    pub fn ledger(&self) -> Ledger {
        let table = self.cache.get_or_load(&self.settings.data_dir);
        Ledger::build(&table)
    }

    pub fn store(&self) -> ClientResult<Box<dyn DocumentStore>> {
        open_store(&self.settings)
    }

    /// Drops every cached data directory. Call after changing data files.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

/// Filter values as given on the command line. An empty list means all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilters {
    pub years: Vec<String>,
    pub entities: Vec<String>,
    pub creditors: Vec<String>,
    pub funds: Vec<String>,
    pub expenses: Vec<String>,
    pub natures: Vec<String>,
}

impl ReportFilters {
    pub fn validate(&self) -> ClientResult<()> {
        for year in &self.years {
            if year.trim().parse::<i32>().is_err() {
                return Err(ClientError::invalid_argument_with_recovery(
                    &format!("`{year}` is not a fiscal year."),
                    vec!["Pass years as numbers, for example `--year 2024`.".to_string()],
                ));
            }
        }
        Ok(())
    }

    fn selections(&self) -> [(Dimension, &Vec<String>); 6] {
        [
            (Dimension::FiscalYear, &self.years),
            (Dimension::Entity, &self.entities),
            (Dimension::Creditor, &self.creditors),
            (Dimension::FundSource, &self.funds),
            (Dimension::ExpenseCategory, &self.expenses),
            (Dimension::NatureCode, &self.natures),
        ]
    }

    pub fn to_filter_set(&self) -> FilterSet {
        self.selections()
            .into_iter()
            .fold(FilterSet::new(), |filters, (dimension, values)| {
                let values = values.iter().map(|value| year_or_text(dimension, value));
                filters.with(dimension, Selection::from_values(values))
            })
    }

    pub fn applied(&self) -> Vec<AppliedFilter> {
        self.to_filter_set()
            .specs()
            .iter()
            .filter_map(|spec| match &spec.selection {
                Selection::All => None,
                Selection::Only(values) => Some(AppliedFilter {
                    dimension: spec.dimension,
                    label: spec.dimension.label().to_string(),
                    values: values.iter().cloned().collect(),
                }),
            })
            .collect()
    }
}

/// `2024.0` or ` 2024` select the same year as `2024`.
fn year_or_text(dimension: Dimension, value: &str) -> String {
    if dimension == Dimension::FiscalYear
        && let Ok(year) = value.trim().parse::<i32>()
    {
        return year.to_string();
    }
    value.trim().to_string()
}

pub(crate) fn load_summary(ledger: &Ledger) -> LoadSummary {
    LoadSummary {
        files_loaded: ledger
            .sources
            .iter()
            .filter(|source| source.error.is_none())
            .count(),
        files_skipped: ledger
            .sources
            .iter()
            .filter(|source| source.error.is_some())
            .count(),
        records: ledger.records.len(),
        rows_dropped: ledger.stats.normalize.dropped_missing_entity
            + ledger.stats.normalize.dropped_missing_year,
        references_matched: ledger.stats.resolver.matched,
        references_unmatched: ledger.stats.resolver.unmatched,
        duplicate_reference_keys: ledger.stats.resolver.duplicate_keys,
    }
}

/// One line per skipped file or dropped line, for the envelope warnings.
pub(crate) fn load_warnings(ledger: &Ledger) -> Vec<String> {
    let mut warnings = Vec::new();
    for source in &ledger.sources {
        if let Some(error) = &source.error {
            warnings.push(format!("Skipped `{}`: {error}", source.file_name));
        } else if source.rows_skipped > 0 {
            warnings.push(format!(
                "Skipped {} malformed line(s) in `{}`.",
                source.rows_skipped, source.file_name
            ));
        }
    }
    if ledger.stats.resolver.duplicate_keys > 0 {
        warnings.push(format!(
            "{} duplicate reference key(s) ignored; the first entry was kept.",
            ledger.stats.resolver.duplicate_keys
        ));
    }
    warnings
}
