use rust_decimal::Decimal;
use serde::Serialize;

/// One committed budget line, as read from a single source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub fiscal_year: i32,
    pub entity: String,
    pub creditor: String,
    pub commitment_number: String,
    pub fund_source: String,
    pub category_code: String,
    pub nature_code: String,
    pub description: String,
    pub commitment_date: Option<String>,
    pub gross: Decimal,
    pub canceled: Decimal,
    pub settled: Decimal,
}

impl TransactionRecord {
    /// Gross minus canceled.
    pub fn net_committed(&self) -> Decimal {
        self.gross - self.canceled
    }

    /// Committed but not yet settled ("restos a pagar").
    pub fn outstanding(&self) -> Decimal {
        self.gross - self.canceled - self.settled
    }
}

/// A transaction with its category and nature codes resolved to labels.
///
/// Labels fall back to the raw code when the reference table has no entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: TransactionRecord,
    pub category_label: String,
    pub nature_label: String,
}

impl EnrichedRecord {
    pub fn unresolved(record: TransactionRecord) -> Self {
        Self {
            category_label: record.category_code.clone(),
            nature_label: record.nature_code.clone(),
            record,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::{EnrichedRecord, TransactionRecord};

    pub(crate) fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap_or(Decimal::MAX)
    }

    pub(crate) fn record(
        year: i32,
        entity: &str,
        creditor: &str,
        fund: &str,
        amounts: (&str, &str, &str),
    ) -> EnrichedRecord {
        EnrichedRecord::unresolved(TransactionRecord {
            fiscal_year: year,
            entity: entity.to_string(),
            creditor: creditor.to_string(),
            commitment_number: String::new(),
            fund_source: fund.to_string(),
            category_code: "31".to_string(),
            nature_code: "90".to_string(),
            description: String::new(),
            commitment_date: None,
            gross: dec(amounts.0),
            canceled: dec(amounts.1),
            settled: dec(amounts.2),
        })
    }
}
