pub mod aggregate;
pub mod cache;
pub mod export;
pub mod filter;
pub mod keyword;
pub mod loader;
pub mod money;
pub mod normalize;
pub mod record;
pub mod reference;
pub mod schema;

use serde::Serialize;

use crate::ledger::loader::{LoadedTable, SourceReport};
use crate::ledger::normalize::NormalizeStats;
use crate::ledger::record::EnrichedRecord;
use crate::ledger::reference::{ReferenceTable, ResolverStats};

/// Normalized, reference-enriched view of one data directory.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub records: Vec<EnrichedRecord>,
    pub sources: Vec<SourceReport>,
    pub stats: LedgerStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerStats {
    pub normalize: NormalizeStats,
    pub resolver: ResolverStats,
}

impl Ledger {
    pub fn build(table: &LoadedTable) -> Self {
        let normalized = normalize::normalize(&table.transactions);
        let references = ReferenceTable::from_sheets(&table.references);
        let (records, resolver) = reference::resolve(normalized.records, &references);

        Self {
            records,
            sources: table.sources.clone(),
            stats: LedgerStats {
                normalize: normalized.stats,
                resolver,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
