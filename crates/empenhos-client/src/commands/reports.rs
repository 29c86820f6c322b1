use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::common::{Dashboard, ReportFilters, load_summary, load_warnings};
use crate::contracts::envelope::{SuccessEnvelope, success, success_with_warnings};
use crate::contracts::types::{DetailRow, ExportData, ReportData, ReportTable};
use crate::ledger::Ledger;
use crate::ledger::aggregate::{Measure, group_by, totals};
use crate::ledger::export::{detail_csv, grouped_csv};
use crate::ledger::filter::Dimension;
use crate::ledger::keyword::KeywordQuery;
use crate::ledger::record::EnrichedRecord;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Summary,
    Creditor,
    Fund,
    Expense,
    Paid,
    CompareCreditorFund,
    CompareFundCreditor,
    Keyword,
}

impl ReportKind {
    pub fn command(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Creditor => "creditor",
            Self::Fund => "fund",
            Self::Expense => "expense",
            Self::Paid => "paid",
            Self::CompareCreditorFund => "compare creditor-fund",
            Self::CompareFundCreditor => "compare fund-creditor",
            Self::Keyword => "keyword",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Summary => "Resumo dos empenhos",
            Self::Creditor => "Consulta por credor",
            Self::Fund => "Consulta por fonte de recurso",
            Self::Expense => "Consulta por despesa",
            Self::Paid => "Pagos no exercício",
            Self::CompareCreditorFund => "Comparativo credor x fonte",
            Self::CompareFundCreditor => "Comparativo fonte x credor",
            Self::Keyword => "Busca por palavra-chave",
        }
    }

    fn tables(&self) -> &'static [TableSpec] {
        match self {
            Self::Summary => &SUMMARY_TABLES,
            Self::Creditor => &CREDITOR_TABLES,
            Self::Fund => &FUND_TABLES,
            Self::Expense => &EXPENSE_TABLES,
            Self::Paid => &PAID_TABLES,
            Self::CompareCreditorFund => &CREDITOR_FUND_TABLES,
            Self::CompareFundCreditor => &FUND_CREDITOR_TABLES,
            Self::Keyword => &KEYWORD_TABLES,
        }
    }

    fn has_detail(&self) -> bool {
        matches!(self, Self::Creditor | Self::Paid | Self::Keyword)
    }
}

struct TableSpec {
    name: &'static str,
    title: &'static str,
    dimensions: &'static [Dimension],
    measures: &'static [Measure],
    share_of: Option<Measure>,
}

const COMMITMENT_MEASURES: [Measure; 3] = [Measure::Gross, Measure::Canceled, Measure::Settled];
const NET_AND_SETTLED: [Measure; 2] = [Measure::NetCommitted, Measure::Settled];

const SUMMARY_TABLES: [TableSpec; 2] = [
    TableSpec {
        name: "by_year",
        title: "Totais por exercício",
        dimensions: &[Dimension::FiscalYear],
        measures: &Measure::ALL,
        share_of: None,
    },
    TableSpec {
        name: "by_year_entity",
        title: "Totais por exercício e entidade",
        dimensions: &[Dimension::FiscalYear, Dimension::Entity],
        measures: &COMMITMENT_MEASURES,
        share_of: None,
    },
];

const CREDITOR_TABLES: [TableSpec; 2] = [
    TableSpec {
        name: "by_year",
        title: "Empenhado líquido x baixado por exercício",
        dimensions: &[Dimension::FiscalYear],
        measures: &NET_AND_SETTLED,
        share_of: None,
    },
    TableSpec {
        name: "by_creditor",
        title: "Por credor",
        dimensions: &[Dimension::Creditor],
        measures: &NET_AND_SETTLED,
        share_of: Some(Measure::NetCommitted),
    },
];

const FUND_TABLES: [TableSpec; 2] = [
    TableSpec {
        name: "by_year_fund",
        title: "Empenhado por exercício e fonte",
        dimensions: &[Dimension::FiscalYear, Dimension::FundSource],
        measures: &[Measure::Gross],
        share_of: Some(Measure::Gross),
    },
    TableSpec {
        name: "by_fund",
        title: "Empenhado por fonte",
        dimensions: &[Dimension::FundSource],
        measures: &[Measure::Gross],
        share_of: Some(Measure::Gross),
    },
];

const EXPENSE_TABLES: [TableSpec; 2] = [
    TableSpec {
        name: "by_year",
        title: "Empenhado líquido x baixado por exercício",
        dimensions: &[Dimension::FiscalYear],
        measures: &NET_AND_SETTLED,
        share_of: None,
    },
    TableSpec {
        name: "by_expense",
        title: "Por descrição da despesa",
        dimensions: &[Dimension::ExpenseCategory],
        measures: &NET_AND_SETTLED,
        share_of: Some(Measure::NetCommitted),
    },
];

const PAID_TABLES: [TableSpec; 1] = [TableSpec {
    name: "by_year",
    title: "Pagos por exercício",
    dimensions: &[Dimension::FiscalYear],
    measures: &[Measure::Settled],
    share_of: None,
}];

const CREDITOR_FUND_TABLES: [TableSpec; 2] = [
    TableSpec {
        name: "by_year",
        title: "Montantes por exercício",
        dimensions: &[Dimension::FiscalYear],
        measures: &COMMITMENT_MEASURES,
        share_of: None,
    },
    TableSpec {
        name: "by_year_fund",
        title: "Comparativo por exercício e fonte",
        dimensions: &[Dimension::FiscalYear, Dimension::FundSource],
        measures: &COMMITMENT_MEASURES,
        share_of: None,
    },
];

const FUND_CREDITOR_TABLES: [TableSpec; 2] = [
    TableSpec {
        name: "by_year",
        title: "Montantes por exercício",
        dimensions: &[Dimension::FiscalYear],
        measures: &COMMITMENT_MEASURES,
        share_of: None,
    },
    TableSpec {
        name: "by_year_creditor",
        title: "Comparativo por exercício e credor",
        dimensions: &[Dimension::FiscalYear, Dimension::Creditor],
        measures: &COMMITMENT_MEASURES,
        share_of: None,
    },
];

const KEYWORD_TABLES: [TableSpec; 2] = [
    TableSpec {
        name: "by_year",
        title: "Empenhado líquido por exercício",
        dimensions: &[Dimension::FiscalYear],
        measures: &[Measure::NetCommitted],
        share_of: None,
    },
    TableSpec {
        name: "by_expense",
        title: "Por descrição da despesa",
        dimensions: &[Dimension::ExpenseCategory],
        measures: &[Measure::NetCommitted],
        share_of: Some(Measure::NetCommitted),
    },
];

#[derive(Debug, Default)]
pub struct ReportOptions<'a> {
    pub filters: ReportFilters,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct KeywordOptions<'a> {
    pub query: String,
    pub filters: ReportFilters,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct ExportOptions<'a> {
    pub output: PathBuf,
    pub filters: ReportFilters,
    /// Restricts the export to records matching this keyword.
    pub query: Option<String>,
    /// Empty exports one line per record; otherwise one line per group.
    pub group_by: Vec<Dimension>,
    pub home_override: Option<&'a Path>,
}

pub fn run(kind: ReportKind, filters: ReportFilters) -> ClientResult<SuccessEnvelope> {
    run_with_options(
        kind,
        ReportOptions {
            filters,
            home_override: None,
        },
    )
}

#[doc(hidden)]
pub fn run_with_options(
    kind: ReportKind,
    options: ReportOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    if kind == ReportKind::Keyword {
        return Err(ClientError::invalid_argument_for_command(
            "The keyword report needs a search term.",
            Some("keyword"),
        ));
    }
    let dashboard = Dashboard::open(options.home_override)?;
    run_in(&dashboard, kind, &options.filters)
}

/// Serves a report from a caller-owned dashboard so the data files are
/// parsed once across calls.
pub fn run_in(
    dashboard: &Dashboard,
    kind: ReportKind,
    filters: &ReportFilters,
) -> ClientResult<SuccessEnvelope> {
    filters.validate()?;
    let ledger = dashboard.ledger();
    let data = build_report(kind, &ledger, filters, None);
    success_with_warnings(kind.command(), data, load_warnings(&ledger))
}

pub fn keyword(query: &str, filters: ReportFilters) -> ClientResult<SuccessEnvelope> {
    keyword_with_options(KeywordOptions {
        query: query.to_string(),
        filters,
        home_override: None,
    })
}

#[doc(hidden)]
pub fn keyword_with_options(options: KeywordOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let dashboard = Dashboard::open(options.home_override)?;
    keyword_in(&dashboard, &options.query, &options.filters)
}

pub fn keyword_in(
    dashboard: &Dashboard,
    query: &str,
    filters: &ReportFilters,
) -> ClientResult<SuccessEnvelope> {
    let query = parse_query(query)?;
    filters.validate()?;
    let ledger = dashboard.ledger();
    let data = build_report(ReportKind::Keyword, &ledger, filters, Some(&query));
    success_with_warnings(ReportKind::Keyword.command(), data, load_warnings(&ledger))
}

/// Aggregates the filtered ledger into the tables `kind` shows.
///
/// Pure with respect to `ledger`: no identity, no store access.
pub fn build_report(
    kind: ReportKind,
    ledger: &Ledger,
    filters: &ReportFilters,
    query: Option<&KeywordQuery>,
) -> ReportData {
    let rows = select_rows(ledger, filters, query);

    let tables = kind
        .tables()
        .iter()
        .map(|spec| {
            let grouped = group_by(rows.iter().copied(), spec.dimensions, spec.measures);
            ReportTable::from_grouped(spec.name, spec.title, &grouped, spec.share_of)
        })
        .collect();

    let detail = kind.has_detail().then(|| {
        rows.iter()
            .map(|row| DetailRow::from_record(row))
            .collect::<Vec<DetailRow>>()
    });

    ReportData {
        report: kind.command().to_string(),
        title: kind.title().to_string(),
        filters: filters.applied(),
        query: query.map(|value| value.raw().to_string()),
        empty: rows.is_empty(),
        totals: totals(rows.iter().copied()),
        tables,
        detail,
        load: load_summary(ledger),
        sources: if kind == ReportKind::Summary {
            ledger.sources.clone()
        } else {
            Vec::new()
        },
    }
}

pub fn export(options: ExportOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let dashboard = Dashboard::open(options.home_override)?;
    export_in(&dashboard, &options)
}

pub fn export_in(
    dashboard: &Dashboard,
    options: &ExportOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    options.filters.validate()?;
    let query = options.query.as_deref().map(parse_query).transpose()?;
    if options.output.as_os_str().is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "An output path is required.",
            Some("export"),
        ));
    }

    let ledger = dashboard.ledger();
    let rows = select_rows(&ledger, &options.filters, query.as_ref());

    let (bytes, rows_written, layout) = if options.group_by.is_empty() {
        let bytes = detail_csv(rows.iter().copied())
            .map_err(|detail| ClientError::export_write_failed(&options.output, &detail))?;
        (bytes, rows.len(), "detail".to_string())
    } else {
        let grouped = group_by(rows.iter().copied(), &options.group_by, &Measure::ALL);
        let bytes = grouped_csv(&grouped)
            .map_err(|detail| ClientError::export_write_failed(&options.output, &detail))?;
        let layout = options
            .group_by
            .iter()
            .map(|dimension| dimension.key())
            .collect::<Vec<&str>>()
            .join(",");
        (bytes, grouped.rows.len(), format!("grouped:{layout}"))
    };

    if let Some(parent) = options.output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|error| {
            ClientError::export_write_failed(&options.output, &error.to_string())
        })?;
    }
    fs::write(&options.output, &bytes)
        .map_err(|error| ClientError::export_write_failed(&options.output, &error.to_string()))?;

    let data = ExportData {
        path: options.output.display().to_string(),
        layout,
        rows_written,
        bytes_written: bytes.len(),
        filters: options.filters.applied(),
        query: query.map(|value| value.raw().to_string()),
    };
    success("export", data)
}

fn parse_query(raw: &str) -> ClientResult<KeywordQuery> {
    KeywordQuery::new(raw).ok_or_else(|| {
        ClientError::invalid_argument_with_recovery(
            "The search term is empty.",
            vec![
                "Pass a word from the commitment description, e.g. `empenhos keyword merenda`."
                    .to_string(),
            ],
        )
    })
}

fn select_rows<'a>(
    ledger: &'a Ledger,
    filters: &ReportFilters,
    query: Option<&KeywordQuery>,
) -> Vec<&'a EnrichedRecord> {
    let filtered = filters.to_filter_set().apply(&ledger.records);
    match query {
        Some(query) => query.apply(filtered),
        None => filtered,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ReportKind, build_report};
    use crate::commands::common::ReportFilters;
    use crate::ledger::keyword::KeywordQuery;
    use crate::ledger::record::EnrichedRecord;
    use crate::ledger::record::fixtures::{dec, record};
    use crate::ledger::{Ledger, LedgerStats};

    fn ledger() -> Ledger {
        let mut merenda = record(2024, "PREFEITURA", "ALFA", "100", ("1000", "100", "400"));
        merenda.record.description = "Aquisição de merenda escolar".to_string();
        merenda.category_label = "MATERIAL DE CONSUMO".to_string();
        let rows: Vec<EnrichedRecord> = vec![
            merenda,
            record(2024, "CAMARA", "BETA", "200", ("500", "0", "500")),
            record(2023, "PREFEITURA", "ALFA", "200", ("250", "50", "0")),
        ];
        Ledger {
            records: rows,
            sources: Vec::new(),
            stats: LedgerStats::default(),
        }
    }

    #[test]
    fn summary_groups_by_year_and_entity() {
        let data = build_report(ReportKind::Summary, &ledger(), &ReportFilters::default(), None);
        assert!(!data.empty);
        assert_eq!(data.totals.gross, dec("1750"));
        assert_eq!(data.tables.len(), 2);
        let by_year = &data.tables[0];
        assert_eq!(by_year.rows.len(), 2);
        assert_eq!(by_year.rows[0].key, vec!["2023".to_string()]);
        assert!(data.detail.is_none());
    }

    #[test]
    fn filtered_report_shares_sum_to_one() {
        let filters = ReportFilters {
            years: vec!["2024".to_string()],
            ..ReportFilters::default()
        };
        let data = build_report(ReportKind::Fund, &ledger(), &filters, None);
        let by_fund = &data.tables[1];
        let shares = by_fund
            .rows
            .iter()
            .filter_map(|row| row.share)
            .sum::<Decimal>();
        assert_eq!(shares, Decimal::ONE);
        assert_eq!(by_fund.rows[0].share, Some(dec("1000") / dec("1500")));
    }

    #[test]
    fn empty_selection_is_flagged_not_failed() {
        let filters = ReportFilters {
            entities: vec!["INEXISTENTE".to_string()],
            ..ReportFilters::default()
        };
        let data = build_report(ReportKind::Creditor, &ledger(), &filters, None);
        assert!(data.empty);
        assert_eq!(data.totals.records, 0);
        assert!(data.tables.iter().all(|table| table.rows.is_empty()));
        assert_eq!(data.detail.map(|rows| rows.len()), Some(0));
    }

    #[test]
    fn keyword_report_narrows_after_filters() {
        let query = KeywordQuery::new("merendas");
        assert!(query.is_some());
        if let Some(query) = query {
            let data = build_report(
                ReportKind::Keyword,
                &ledger(),
                &ReportFilters::default(),
                Some(&query),
            );
            assert_eq!(data.totals.records, 1);
            assert_eq!(data.totals.net_committed, dec("900"));
            assert_eq!(data.query.as_deref(), Some("merendas"));
            assert_eq!(data.tables[1].rows[0].key, vec!["MATERIAL DE CONSUMO".to_string()]);
        }
    }
}
