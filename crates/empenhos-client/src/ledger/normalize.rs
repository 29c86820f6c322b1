use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::ledger::loader::{Cell, RawSheet};
use crate::ledger::money::{decimal_from_f64, parse_brl};
use crate::ledger::record::TransactionRecord;
use crate::ledger::schema::{DefaultFill, Field};

const MISSING_MARKERS: [&str; 4] = ["", "nan", "NaN", "None"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub rows_in: usize,
    pub rows_kept: usize,
    pub dropped_missing_entity: usize,
    pub dropped_missing_year: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedRecords {
    pub records: Vec<TransactionRecord>,
    pub stats: NormalizeStats,
}

pub fn normalize(sheets: &[RawSheet]) -> NormalizedRecords {
    let mut output = NormalizedRecords::default();

    for sheet in sheets {
        let has_year_column = sheet.schema.has(Field::Year);
        for row in &sheet.rows {
            output.stats.rows_in += 1;

            if has_year_column && text_field(sheet, row, Field::Year).is_none() {
                output.stats.dropped_missing_year += 1;
                continue;
            }
            let Some(entity) = text_field(sheet, row, Field::Entity) else {
                output.stats.dropped_missing_entity += 1;
                continue;
            };

            output.records.push(TransactionRecord {
                fiscal_year: sheet.fiscal_year,
                entity,
                creditor: text_or_default(sheet, row, Field::Creditor),
                commitment_number: code_or_default(sheet, row, Field::CommitmentNumber),
                fund_source: code_or_default(sheet, row, Field::FundSource),
                category_code: code_or_default(sheet, row, Field::CategoryCode),
                nature_code: code_or_default(sheet, row, Field::NatureCode),
                description: text_or_default(sheet, row, Field::Description),
                commitment_date: text_field(sheet, row, Field::CommitmentDate),
                gross: amount_field(sheet, row, Field::Gross),
                canceled: amount_field(sheet, row, Field::Canceled),
                settled: amount_field(sheet, row, Field::Settled),
            });
        }
    }

    output.stats.rows_kept = output.records.len();
    debug!(
        rows_in = output.stats.rows_in,
        rows_kept = output.stats.rows_kept,
        "normalized transaction rows"
    );
    output
}

/// Trimmed text for `field`, or `None` when absent or a missing marker.
pub(crate) fn text_field(sheet: &RawSheet, row: &[Cell], field: Field) -> Option<String> {
    let text = match sheet.cell(row, field)? {
        Cell::Empty => return None,
        Cell::Text(value) => value.trim().to_string(),
        Cell::Number(value) => render_number(*value),
    };
    if MISSING_MARKERS.contains(&text.as_str()) {
        return None;
    }
    Some(text)
}

pub(crate) fn code_field(sheet: &RawSheet, row: &[Cell], field: Field) -> Option<String> {
    text_field(sheet, row, field).map(|value| normalize_code(&value))
}

fn text_or_default(sheet: &RawSheet, row: &[Cell], field: Field) -> String {
    debug_assert_eq!(field.default_fill(), DefaultFill::EmptyText);
    text_field(sheet, row, field).unwrap_or_default()
}

fn code_or_default(sheet: &RawSheet, row: &[Cell], field: Field) -> String {
    code_field(sheet, row, field).unwrap_or_default()
}

/// Monetary value for `field`; absent columns and unparseable text are zero.
fn amount_field(sheet: &RawSheet, row: &[Cell], field: Field) -> Decimal {
    match sheet.cell(row, field) {
        Some(Cell::Number(value)) => decimal_from_f64(*value),
        Some(Cell::Text(value)) => parse_brl(value),
        Some(Cell::Empty) | None => Decimal::ZERO,
    }
}

/// Drops the `.0` spreadsheets append to integral codes (`31.0` -> `31`).
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(".0") {
        Some(integral)
            if !integral.is_empty() && integral.chars().all(|ch| ch.is_ascii_digit()) =>
        {
            integral.to_string()
        }
        _ => trimmed.to_string(),
    }
}

fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::{normalize, normalize_code};
    use crate::ledger::loader::{Cell, RawSheet, transaction_sheet_from_csv};
    use crate::ledger::schema::{SourceSchema, TRANSACTION_FIELDS};

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap_or(Decimal::MAX)
    }

    fn csv_sheet(year: i32, body: &str) -> RawSheet {
        let sheet = transaction_sheet_from_csv("fixture.csv", year, body.as_bytes());
        assert!(sheet.is_ok());
        sheet.unwrap_or_else(|_| RawSheet {
            file_name: String::new(),
            fiscal_year: year,
            headers: Vec::new(),
            schema: SourceSchema::default(),
            rows: Vec::new(),
        })
    }

    #[test]
    fn parses_amounts_and_trims_text() {
        let sheet = csv_sheet(
            2024,
            "nomeEntidade;nomeCredor;numRecurso;valorEmpenhadoBruto;valorEmpenhadoAnulado;valorBaixadoBruto\n  PREFEITURA  ; ACME LTDA ;100;1.234.567,89;abc;\n",
        );
        let normalized = normalize(&[sheet]);
        assert_eq!(normalized.records.len(), 1);
        let record = &normalized.records[0];
        assert_eq!(record.entity, "PREFEITURA");
        assert_eq!(record.creditor, "ACME LTDA");
        assert_eq!(record.fund_source, "100");
        assert_eq!(record.gross, dec("1234567.89"));
        assert_eq!(record.canceled, Decimal::ZERO);
        assert_eq!(record.settled, Decimal::ZERO);
    }

    #[test]
    fn absent_monetary_columns_are_zero() {
        let sheet = csv_sheet(2023, "nomeEntidade;saldoBaixado\nPREFEITURA;50,5\n");
        let normalized = normalize(&[sheet]);
        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.records[0].gross, Decimal::ZERO);
        assert_eq!(normalized.records[0].canceled, Decimal::ZERO);
        assert_eq!(normalized.records[0].settled, dec("50.5"));
    }

    #[test]
    fn settled_amount_ignores_column_order() {
        for body in [
            "nomeEntidade;valorBaixadoBruto;saldoBaixado\nX;2,00;1,00\n",
            "nomeEntidade;saldoBaixado;valorBaixadoBruto\nX;1,00;2,00\n",
        ] {
            let normalized = normalize(&[csv_sheet(2024, body)]);
            assert_eq!(normalized.records.len(), 1);
            assert_eq!(normalized.records[0].settled, dec("2"));
        }
    }

    #[test]
    fn drops_rows_missing_entity_or_in_file_year() {
        let sheet = csv_sheet(
            2024,
            "anoEmpenho;nomeEntidade\n2024;ACME\nnan;ACME\n2024;None\n2024;\n;ACME\n",
        );
        let normalized = normalize(&[sheet]);
        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.stats.dropped_missing_year, 2);
        assert_eq!(normalized.stats.dropped_missing_entity, 2);
        assert_eq!(normalized.stats.rows_in, 5);
    }

    #[test]
    fn fiscal_year_comes_from_file_not_column() {
        let sheet = csv_sheet(2023, "anoEmpenho;nomeEntidade\n1999;ACME\n");
        let normalized = normalize(&[sheet]);
        assert_eq!(normalized.records[0].fiscal_year, 2023);
    }

    #[test]
    fn numeric_codes_render_without_fraction() {
        let headers = vec![
            "nomeEntidade".to_string(),
            "numNaturezaEmp".to_string(),
            "valorEmpenhadoBruto".to_string(),
        ];
        let sheet = RawSheet {
            file_name: "2024_empenhos.xlsx".to_string(),
            fiscal_year: 2024,
            schema: SourceSchema::resolve(&headers, &TRANSACTION_FIELDS),
            headers,
            rows: vec![vec![
                Cell::Text("ACME".to_string()),
                Cell::Number(90.0),
                Cell::Number(1500.25),
            ]],
        };
        let normalized = normalize(&[sheet]);
        assert_eq!(normalized.records[0].nature_code, "90");
        assert_eq!(normalized.records[0].gross, dec("1500.25"));
    }

    #[test]
    fn code_normalization_only_strips_integral_suffix() {
        assert_eq!(normalize_code("31.0"), "31");
        assert_eq!(normalize_code(" 339039 "), "339039");
        assert_eq!(normalize_code("3.3.90.39.0"), "3.3.90.39.0");
        assert_eq!(normalize_code(".0"), ".0");
    }
}
