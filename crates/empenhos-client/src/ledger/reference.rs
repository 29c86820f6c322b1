use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::ledger::loader::RawSheet;
use crate::ledger::normalize::{code_field, normalize_code, text_field};
use crate::ledger::record::{EnrichedRecord, TransactionRecord};
use crate::ledger::schema::Field;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceKey {
    pub fiscal_year: i32,
    pub entity: String,
    pub category_code: String,
    pub nature_code: String,
}

impl ReferenceKey {
    pub fn new(fiscal_year: i32, entity: &str, category_code: &str, nature_code: &str) -> Self {
        Self {
            fiscal_year,
            entity: join_key(entity),
            category_code: join_key(category_code),
            nature_code: join_key(nature_code),
        }
    }

    fn for_record(record: &TransactionRecord) -> Self {
        Self::new(
            record.fiscal_year,
            &record.entity,
            &record.category_code,
            &record.nature_code,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub category_description: String,
    pub nature_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub reference_entries: usize,
    pub duplicate_keys: usize,
    pub matched: usize,
    pub unmatched: usize,
}

/// Code-to-description lookup. The first entry seen for a key wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: HashMap<ReferenceKey, ReferenceEntry>,
    duplicate_keys: usize,
}

impl ReferenceTable {
    pub fn from_sheets(sheets: &[RawSheet]) -> Self {
        let mut table = Self::default();
        for sheet in sheets {
            for row in &sheet.rows {
                let year = text_field(sheet, row, Field::Year)
                    .and_then(|value| normalize_code(&value).parse().ok())
                    .unwrap_or(sheet.fiscal_year);
                let Some(entity) = text_field(sheet, row, Field::Entity) else {
                    continue;
                };
                let key = ReferenceKey::new(
                    year,
                    &entity,
                    &code_field(sheet, row, Field::CategoryCode).unwrap_or_default(),
                    &code_field(sheet, row, Field::NatureCode).unwrap_or_default(),
                );
                let entry = ReferenceEntry {
                    category_description: text_field(sheet, row, Field::CategoryDescription)
                        .unwrap_or_default(),
                    nature_description: text_field(sheet, row, Field::NatureDescription)
                        .unwrap_or_default(),
                };
                table.insert(key, entry, &sheet.file_name);
            }
        }
        table
    }

    pub fn insert(&mut self, key: ReferenceKey, entry: ReferenceEntry, source: &str) {
        if self.entries.contains_key(&key) {
            self.duplicate_keys += 1;
            warn!(
                file = source,
                year = key.fiscal_year,
                entity = %key.entity,
                category = %key.category_code,
                nature = %key.nature_code,
                "duplicate reference key; keeping the first entry"
            );
            return;
        }
        self.entries.insert(key, entry);
    }

    pub fn lookup(&self, key: &ReferenceKey) -> Option<&ReferenceEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Left-joins `records` onto `references`, one output row per input row.
pub fn resolve(
    records: Vec<TransactionRecord>,
    references: &ReferenceTable,
) -> (Vec<EnrichedRecord>, ResolverStats) {
    let mut stats = ResolverStats {
        reference_entries: references.len(),
        duplicate_keys: references.duplicate_keys,
        ..ResolverStats::default()
    };

    let enriched: Vec<EnrichedRecord> = records
        .into_iter()
        .map(|record| match references.lookup(&ReferenceKey::for_record(&record)) {
            Some(entry) => {
                stats.matched += 1;
                EnrichedRecord {
                    category_label: label_or_code(
                        &entry.category_description,
                        &record.category_code,
                    ),
                    nature_label: label_or_code(&entry.nature_description, &record.nature_code),
                    record,
                }
            }
            None => {
                stats.unmatched += 1;
                EnrichedRecord::unresolved(record)
            }
        })
        .collect();

    (enriched, stats)
}

fn join_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn label_or_code(label: &str, code: &str) -> String {
    if label.trim().is_empty() {
        code.to_string()
    } else {
        label.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ReferenceEntry, ReferenceKey, ReferenceTable, resolve};
    use crate::ledger::record::TransactionRecord;

    fn transaction(year: i32, entity: &str, category: &str, nature: &str) -> TransactionRecord {
        TransactionRecord {
            fiscal_year: year,
            entity: entity.to_string(),
            creditor: "FORNECEDOR".to_string(),
            commitment_number: "1".to_string(),
            fund_source: "100".to_string(),
            category_code: category.to_string(),
            nature_code: nature.to_string(),
            description: String::new(),
            commitment_date: None,
            gross: Decimal::ONE,
            canceled: Decimal::ZERO,
            settled: Decimal::ZERO,
        }
    }

    fn entry(category: &str, nature: &str) -> ReferenceEntry {
        ReferenceEntry {
            category_description: category.to_string(),
            nature_description: nature.to_string(),
        }
    }

    #[test]
    fn missing_reference_falls_back_to_raw_codes() {
        let mut table = ReferenceTable::default();
        table.insert(
            ReferenceKey::new(2023, "ACME", "31", "90"),
            entry("PESSOAL", "APLICACOES DIRETAS"),
            "2023_referencias.xlsx",
        );

        let (enriched, stats) = resolve(vec![transaction(2024, "ACME", "31", "90")], &table);
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].category_label, "31");
        assert_eq!(enriched[0].nature_label, "90");
        assert_eq!(stats.unmatched, 1);
    }

    #[test]
    fn keys_match_trimmed_and_case_insensitively() {
        let mut table = ReferenceTable::default();
        table.insert(
            ReferenceKey::new(2024, " acme ", "31", "90"),
            entry("PESSOAL", "APLICACOES DIRETAS"),
            "2024_referencias.xlsx",
        );

        let (enriched, stats) = resolve(vec![transaction(2024, "ACME", "31", "90")], &table);
        assert_eq!(enriched[0].category_label, "PESSOAL");
        assert_eq!(enriched[0].nature_label, "APLICACOES DIRETAS");
        assert_eq!(stats.matched, 1);
    }

    #[test]
    fn duplicate_keys_keep_first_entry_without_fan_out() {
        let mut table = ReferenceTable::default();
        let key = ReferenceKey::new(2024, "ACME", "31", "90");
        table.insert(key.clone(), entry("PRIMEIRA", "N1"), "2024_referencias.xlsx");
        table.insert(key, entry("SEGUNDA", "N2"), "2024_referencias.xlsx");

        let (enriched, stats) = resolve(
            vec![
                transaction(2024, "ACME", "31", "90"),
                transaction(2024, "ACME", "31", "90"),
            ],
            &table,
        );
        assert_eq!(enriched.len(), 2);
        assert!(enriched.iter().all(|row| row.category_label == "PRIMEIRA"));
        assert_eq!(stats.duplicate_keys, 1);
        assert_eq!(stats.reference_entries, 1);
    }

    #[test]
    fn blank_description_falls_back_to_code() {
        let mut table = ReferenceTable::default();
        table.insert(
            ReferenceKey::new(2024, "ACME", "31", "90"),
            entry("PESSOAL", "  "),
            "2024_referencias.xlsx",
        );
        let (enriched, _) = resolve(vec![transaction(2024, "ACME", "31", "90")], &table);
        assert_eq!(enriched[0].category_label, "PESSOAL");
        assert_eq!(enriched[0].nature_label, "90");
    }
}
