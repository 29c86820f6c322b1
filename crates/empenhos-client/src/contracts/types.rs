use rust_decimal::Decimal;
use serde::Serialize;

use crate::access::model::{AccountSummary, RequestStatus, RequestSummary, Session};
use crate::ledger::aggregate::{Grouped, Measure, Totals};
use crate::ledger::filter::Dimension;
use crate::ledger::loader::{DataFileKind, SourceFormat, SourceReport};
use crate::ledger::record::EnrichedRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFilter {
    pub dimension: Dimension,
    pub label: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub key: Vec<String>,
    pub values: Vec<Decimal>,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<Decimal>,
}

/// A grouped aggregate ready for display or charting.
#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub name: String,
    pub title: String,
    pub dimensions: Vec<TableColumn>,
    pub measures: Vec<TableColumn>,
    /// Measure the `share` column is computed from, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_of: Option<Measure>,
    pub rows: Vec<TableRow>,
}

impl ReportTable {
    pub fn from_grouped(
        name: &str,
        title: &str,
        grouped: &Grouped,
        share_of: Option<Measure>,
    ) -> Self {
        let shares = share_of
            .map(|measure| grouped.shares(measure))
            .unwrap_or_default();
        Self {
            name: name.to_string(),
            title: title.to_string(),
            dimensions: grouped
                .dimensions
                .iter()
                .map(|dimension| TableColumn {
                    key: dimension.key().to_string(),
                    label: dimension.label().to_string(),
                })
                .collect(),
            measures: grouped
                .measures
                .iter()
                .map(|measure| TableColumn {
                    key: measure.column().to_string(),
                    label: measure.label().to_string(),
                })
                .collect(),
            share_of,
            rows: grouped
                .rows
                .iter()
                .enumerate()
                .map(|(index, row)| TableRow {
                    key: row.key.clone(),
                    values: row.values.clone(),
                    records: row.records,
                    share: shares.get(index).copied().flatten(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailRow {
    #[serde(flatten)]
    pub row: EnrichedRecord,
    pub net_committed: Decimal,
    pub outstanding: Decimal,
}

impl DetailRow {
    pub fn from_record(row: &EnrichedRecord) -> Self {
        Self {
            net_committed: row.record.net_committed(),
            outstanding: row.record.outstanding(),
            row: row.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub records: usize,
    pub rows_dropped: usize,
    pub references_matched: usize,
    pub references_unmatched: usize,
    pub duplicate_reference_keys: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub report: String,
    pub title: String,
    pub filters: Vec<AppliedFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// No record survived the filters.
    pub empty: bool,
    pub totals: Totals,
    pub tables: Vec<ReportTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<DetailRow>>,
    pub load: LoadSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportData {
    pub path: String,
    pub layout: String,
    pub rows_written: usize,
    pub bytes_written: usize,
    pub filters: Vec<AppliedFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestSubmittedData {
    pub request: RequestSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingRequestsData {
    pub requests: Vec<RequestSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalData {
    pub account: AccountSummary,
    pub request_status: RequestStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectionData {
    pub request: RequestSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapAdminData {
    pub username: String,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginData {
    pub session: Session,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsersData {
    pub users: Vec<AccountSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDeletedData {
    pub account: AccountSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFileClass {
    Transactions,
    References,
    Other,
}

impl From<DataFileKind> for DataFileClass {
    fn from(kind: DataFileKind) -> Self {
        match kind {
            DataFileKind::Transactions => Self::Transactions,
            DataFileKind::References => Self::References,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DataFileEntry {
    pub name: String,
    pub class: DataFileClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<SourceFormat>,
    pub year: Option<i32>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilesListData {
    pub data_dir: String,
    pub files: Vec<DataFileEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileUploadData {
    pub name: String,
    pub key: String,
    pub backend: String,
    pub revision: String,
    pub replaced: bool,
    pub mirrored_to: Option<String>,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDeleteData {
    pub name: String,
    pub key: String,
    pub backend: String,
    pub local_copy_removed: bool,
}
