use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::filter::Dimension;
use crate::ledger::record::EnrichedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Gross,
    Canceled,
    Settled,
    NetCommitted,
    Outstanding,
}

impl Measure {
    pub const ALL: [Measure; 5] = [
        Self::Gross,
        Self::Canceled,
        Self::Settled,
        Self::NetCommitted,
        Self::Outstanding,
    ];

    pub fn value_of(&self, row: &EnrichedRecord) -> Decimal {
        match self {
            Self::Gross => row.record.gross,
            Self::Canceled => row.record.canceled,
            Self::Settled => row.record.settled,
            Self::NetCommitted => row.record.net_committed(),
            Self::Outstanding => row.record.outstanding(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Gross => "Empenhado Bruto",
            Self::Canceled => "Empenhado Anulado",
            Self::Settled => "Baixado",
            Self::NetCommitted => "Empenhado Líquido",
            Self::Outstanding => "Restos a Pagar",
        }
    }

    /// Column name used in CSV exports.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Gross => "valorEmpenhadoBruto",
            Self::Canceled => "valorEmpenhadoAnulado",
            Self::Settled => "valorBaixadoBruto",
            Self::NetCommitted => "valorEmpenhadoLiquido",
            Self::Outstanding => "restosAPagar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRow {
    pub key: Vec<String>,
    pub values: Vec<Decimal>,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grouped {
    pub dimensions: Vec<Dimension>,
    pub measures: Vec<Measure>,
    pub rows: Vec<GroupRow>,
}

impl Grouped {
    pub fn measure_index(&self, measure: Measure) -> Option<usize> {
        self.measures.iter().position(|candidate| *candidate == measure)
    }

    /// Sum of `measure` across every group.
    pub fn total(&self, measure: Measure) -> Decimal {
        let Some(index) = self.measure_index(measure) else {
            return Decimal::ZERO;
        };
        self.rows
            .iter()
            .filter_map(|row| row.values.get(index))
            .copied()
            .sum()
    }

    /// Each group's fraction of the grouped total for `measure`.
    ///
    /// `None` when the total is zero or `measure` was not aggregated.
    pub fn shares(&self, measure: Measure) -> Vec<Option<Decimal>> {
        let total = self.total(measure);
        let index = self.measure_index(measure);
        self.rows
            .iter()
            .map(|row| {
                let value = row.values.get(index?)?;
                if total.is_zero() {
                    return None;
                }
                value.checked_div(total)
            })
            .collect()
    }
}

/// Sums `measures` per distinct combination of `dimensions`, sorted by key.
///
/// Only combinations that occur produce a row.
pub fn group_by<'a, I>(rows: I, dimensions: &[Dimension], measures: &[Measure]) -> Grouped
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut groups: BTreeMap<Vec<String>, (Vec<Decimal>, usize)> = BTreeMap::new();
    for row in rows {
        let key = dimensions
            .iter()
            .map(|dimension| dimension.value_of(row).into_owned())
            .collect::<Vec<String>>();
        let slot = groups
            .entry(key)
            .or_insert_with(|| (vec![Decimal::ZERO; measures.len()], 0));
        for (sum, measure) in slot.0.iter_mut().zip(measures) {
            *sum += measure.value_of(row);
        }
        slot.1 += 1;
    }

    Grouped {
        dimensions: dimensions.to_vec(),
        measures: measures.to_vec(),
        rows: groups
            .into_iter()
            .map(|(key, (values, records))| GroupRow {
                key,
                values,
                records,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub gross: Decimal,
    pub canceled: Decimal,
    pub settled: Decimal,
    pub net_committed: Decimal,
    pub outstanding: Decimal,
    pub records: usize,
}

impl Totals {
    pub fn get(&self, measure: Measure) -> Decimal {
        match measure {
            Measure::Gross => self.gross,
            Measure::Canceled => self.canceled,
            Measure::Settled => self.settled,
            Measure::NetCommitted => self.net_committed,
            Measure::Outstanding => self.outstanding,
        }
    }
}

pub fn totals<'a, I>(rows: I) -> Totals
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut totals = Totals::default();
    for row in rows {
        totals.gross += row.record.gross;
        totals.canceled += row.record.canceled;
        totals.settled += row.record.settled;
        totals.records += 1;
    }
    totals.net_committed = totals.gross - totals.canceled;
    totals.outstanding = totals.net_committed - totals.settled;
    totals
}

/// Sorted distinct non-empty values of `dimension`, for filter option lists.
pub fn distinct_values<'a, I>(rows: I, dimension: Dimension) -> Vec<String>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    rows.into_iter()
        .map(|row| dimension.value_of(row).into_owned())
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
