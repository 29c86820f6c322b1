use std::fs;
use std::path::Path;

use calamine::{Data, DataType, Reader, open_workbook_auto};
use serde::Serialize;
use tracing::{debug, warn};

use crate::ledger::schema::{Field, REFERENCE_FIELDS, SourceSchema, TRANSACTION_FIELDS};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFileKind {
    Transactions,
    References,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

/// A file name following `<year>_empenhos.<ext>` or `<year>_referencias.<ext>`.
///
/// `year` is `None` when the leading token is not an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFileName {
    pub kind: DataFileKind,
    pub format: SourceFormat,
    pub year: Option<i32>,
}

pub fn classify_file_name(name: &str) -> Option<DataFileName> {
    let lowered = name.trim().to_lowercase();
    let (stem, format) = if let Some(stem) = lowered.strip_suffix(".csv") {
        (stem, SourceFormat::Csv)
    } else if let Some(stem) = lowered.strip_suffix(".xlsx") {
        (stem, SourceFormat::Xlsx)
    } else {
        return None;
    };

    let kind = if stem.ends_with("_empenhos") {
        DataFileKind::Transactions
    } else if stem.ends_with("_referencias") {
        DataFileKind::References
    } else {
        return None;
    };

    let year = stem
        .split('_')
        .next()
        .and_then(|token| token.trim().parse::<i32>().ok());

    Some(DataFileName { kind, format, year })
}

/// One raw worksheet cell. Text cells are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

/// The rows of one successfully read file, tagged with the file-name year.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub file_name: String,
    pub fiscal_year: i32,
    pub headers: Vec<String>,
    pub schema: SourceSchema,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn cell<'a>(&self, row: &'a [Cell], field: Field) -> Option<&'a Cell> {
        self.schema.column(field).and_then(|index| row.get(index))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub file_name: String,
    pub kind: DataFileKind,
    pub format: SourceFormat,
    pub fiscal_year: Option<i32>,
    pub encoding: Option<String>,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub missing_columns: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedTable {
    pub transactions: Vec<RawSheet>,
    pub references: Vec<RawSheet>,
    pub sources: Vec<SourceReport>,
}

impl LoadedTable {
    pub fn transaction_rows(&self) -> usize {
        self.transactions.iter().map(|sheet| sheet.rows.len()).sum()
    }
}

pub(crate) struct ParsedFile {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<Vec<Cell>>,
    pub(crate) encoding: Option<String>,
    pub(crate) rows_skipped: usize,
}

/// Reads every transaction and reference file in `dir`, in file-name order.
///
/// A missing directory yields an empty table. Files that cannot be read are
/// reported and skipped.
pub fn load_dir(dir: &Path) -> LoadedTable {
    let mut table = LoadedTable::default();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %dir.display(), %error, "data directory is unreadable");
            }
            return table;
        }
    };

    let mut names = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect::<Vec<String>>();
    names.sort();

    for name in names {
        let Some(classified) = classify_file_name(&name) else {
            continue;
        };
        let path = dir.join(&name);
        let mut report = SourceReport {
            file_name: name.clone(),
            kind: classified.kind,
            format: classified.format,
            fiscal_year: classified.year,
            encoding: None,
            rows_read: 0,
            rows_skipped: 0,
            missing_columns: Vec::new(),
            error: None,
        };

        let Some(year) = classified.year else {
            warn!(file = %name, "file name does not start with a fiscal year; skipping");
            report.error = Some("file name does not start with a fiscal year".to_string());
            table.sources.push(report);
            continue;
        };

        let parsed = match classified.format {
            SourceFormat::Csv => read_csv_file(&path),
            SourceFormat::Xlsx => read_xlsx_file(&path),
        };

        match parsed {
            Ok(parsed) => {
                let fields: &[Field] = match classified.kind {
                    DataFileKind::Transactions => &TRANSACTION_FIELDS,
                    DataFileKind::References => &REFERENCE_FIELDS,
                };
                let schema = SourceSchema::resolve(&parsed.headers, fields);
                report.missing_columns = schema.missing(fields);
                report.encoding = parsed.encoding;
                report.rows_read = parsed.rows.len();
                report.rows_skipped = parsed.rows_skipped;
                debug!(
                    file = %name,
                    encoding = report.encoding.as_deref().unwrap_or("xlsx"),
                    rows = report.rows_read,
                    "loaded data file"
                );

                let sheet = RawSheet {
                    file_name: name,
                    fiscal_year: year,
                    headers: parsed.headers,
                    schema,
                    rows: parsed.rows,
                };
                match classified.kind {
                    DataFileKind::Transactions => table.transactions.push(sheet),
                    DataFileKind::References => table.references.push(sheet),
                }
            }
            Err(detail) => {
                warn!(file = %name, error = %detail, "skipping unreadable data file");
                report.error = Some(detail);
            }
        }
        table.sources.push(report);
    }

    table
}

/// Parses CSV bytes as one transaction sheet for `fiscal_year`.
pub fn transaction_sheet_from_csv(
    file_name: &str,
    fiscal_year: i32,
    bytes: &[u8],
) -> Result<RawSheet, String> {
    let parsed = parse_csv_bytes(bytes)?;
    let schema = SourceSchema::resolve(&parsed.headers, &TRANSACTION_FIELDS);
    Ok(RawSheet {
        file_name: file_name.to_string(),
        fiscal_year,
        headers: parsed.headers,
        schema,
        rows: parsed.rows,
    })
}

fn read_csv_file(path: &Path) -> Result<ParsedFile, String> {
    let bytes = fs::read(path).map_err(|error| error.to_string())?;
    parse_csv_bytes(&bytes)
}

/// Decodes and parses a `;`-delimited export.
///
/// UTF-8 (with or without signature) is tried first, then Windows-1252.
/// Records the CSV reader rejects, or with more cells than the header, are
/// skipped and counted.
pub(crate) fn parse_csv_bytes(bytes: &[u8]) -> Result<ParsedFile, String> {
    let (text, encoding) = decode_text(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| format!("header row is unreadable: {error}"))?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();
    if headers.iter().all(String::is_empty) {
        return Err("header row is empty".to_string());
    }

    let mut rows = Vec::new();
    let mut rows_skipped = 0usize;
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                warn!(line = index + 2, %error, "skipping malformed line");
                rows_skipped += 1;
                continue;
            }
        };
        if record.len() > headers.len() {
            warn!(
                line = index + 2,
                fields = record.len(),
                expected = headers.len(),
                "skipping line with extra fields"
            );
            rows_skipped += 1;
            continue;
        }

        let mut cells = record
            .iter()
            .map(|value| {
                if value.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(value.to_string())
                }
            })
            .collect::<Vec<Cell>>();
        cells.resize(headers.len(), Cell::Empty);
        rows.push(cells);
    }

    Ok(ParsedFile {
        headers,
        rows,
        encoding: Some(encoding.to_string()),
        rows_skipped,
    })
}

fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    if let Some(stripped) = bytes.strip_prefix(UTF8_BOM)
        && let Ok(text) = std::str::from_utf8(stripped)
    {
        return (text.to_string(), "utf-8-sig");
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), "utf-8");
    }

    let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    (decoded.into_owned(), "windows-1252")
}

fn read_xlsx_file(path: &Path) -> Result<ParsedFile, String> {
    let mut workbook = open_workbook_auto(path).map_err(|error| error.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheets".to_string())?
        .map_err(|error| error.to_string())?;

    let mut rows_iter = range.rows();
    let headers = rows_iter
        .next()
        .map(|row| {
            row.iter()
                .map(|cell| match convert_cell(cell) {
                    Cell::Text(text) => text.trim().to_string(),
                    Cell::Number(number) => number.to_string(),
                    Cell::Empty => String::new(),
                })
                .collect::<Vec<String>>()
        })
        .ok_or_else(|| "worksheet is empty".to_string())?;

    let mut rows = Vec::new();
    for row in rows_iter {
        let mut cells = row.iter().map(convert_cell).collect::<Vec<Cell>>();
        if cells.iter().all(|cell| *cell == Cell::Empty) {
            continue;
        }
        cells.resize(headers.len(), Cell::Empty);
        rows.push(cells);
    }

    Ok(ParsedFile {
        headers,
        rows,
        encoding: None,
        rows_skipped: 0,
    })
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::String(value) => {
            if value.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(value.clone())
            }
        }
        Data::Bool(value) => Cell::Text(value.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_date() {
            Some(date) => Cell::Text(date.format("%d/%m/%Y").to_string()),
            None => Cell::Text(cell.to_string()),
        },
        Data::DurationIso(value) => Cell::Text(value.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use calamine::Data;

    use super::{
        Cell, DataFileKind, SourceFormat, classify_file_name, convert_cell, load_dir,
        parse_csv_bytes,
    };
    use crate::ledger::schema::Field;

    #[test]
    fn classifies_data_file_names() {
        let empenhos = classify_file_name("2023_empenhos.csv");
        assert_eq!(empenhos.map(|name| name.year), Some(Some(2023)));
        assert_eq!(empenhos.map(|name| name.kind), Some(DataFileKind::Transactions));

        let reference = classify_file_name("2024_REFERENCIAS.XLSX");
        assert_eq!(reference.map(|name| name.kind), Some(DataFileKind::References));
        assert_eq!(reference.map(|name| name.format), Some(SourceFormat::Xlsx));

        let no_year = classify_file_name("novo_empenhos.csv");
        assert_eq!(no_year.map(|name| name.year), Some(None));

        assert!(classify_file_name("usuarios.json").is_none());
        assert!(classify_file_name("2024_empenhos.txt").is_none());
    }

    #[test]
    fn skips_lines_with_extra_fields_and_pads_short_ones() {
        let body = "nomeEntidade;valorEmpenhadoBruto\nACME;1.000,00\nACME;2,00;extra\nSHORT\n";
        let parsed = parse_csv_bytes(body.as_bytes());
        assert!(parsed.is_ok());
        if let Ok(parsed) = parsed {
            assert_eq!(parsed.rows.len(), 2);
            assert_eq!(parsed.rows_skipped, 1);
            assert_eq!(parsed.rows[1], vec![Cell::Text("SHORT".to_string()), Cell::Empty]);
            assert_eq!(parsed.encoding.as_deref(), Some("utf-8"));
        }
    }

    #[test]
    fn strips_utf8_signature_from_first_header() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("nomeEntidade;numRecurso\nACME;100\n".as_bytes());
        let parsed = parse_csv_bytes(&bytes);
        assert!(parsed.is_ok());
        if let Ok(parsed) = parsed {
            assert_eq!(parsed.headers[0], "nomeEntidade");
            assert_eq!(parsed.encoding.as_deref(), Some("utf-8-sig"));
        }
    }

    #[test]
    fn falls_back_to_latin1_for_invalid_utf8() {
        // "PREFEITURA DE SÃO JOÃO" in Latin-1.
        let mut bytes = b"nomeEntidade\nPREFEITURA DE S".to_vec();
        bytes.push(0xC3);
        bytes.extend_from_slice(b"O JO");
        bytes.push(0xC3);
        bytes.extend_from_slice(b"O\n");
        let parsed = parse_csv_bytes(&bytes);
        assert!(parsed.is_ok());
        if let Ok(parsed) = parsed {
            assert_eq!(parsed.encoding.as_deref(), Some("windows-1252"));
            assert_eq!(
                parsed.rows[0],
                vec![Cell::Text("PREFEITURA DE SÃO JOÃO".to_string())]
            );
        }
    }

    #[test]
    fn numeric_spreadsheet_cells_stay_numeric() {
        assert_eq!(convert_cell(&Data::Float(1234.5)), Cell::Number(1234.5));
        assert_eq!(convert_cell(&Data::Int(31)), Cell::Number(31.0));
        assert_eq!(convert_cell(&Data::String(String::new())), Cell::Empty);
    }

    #[test]
    fn missing_directory_loads_as_empty() {
        let temp = tempfile::tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let table = load_dir(&temp.path().join("absent"));
            assert!(table.transactions.is_empty());
            assert!(table.sources.is_empty());
        }
    }

    #[test]
    fn tags_rows_with_the_file_name_year() {
        let temp = tempfile::tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let write_a = fs::write(
                temp.path().join("2023_empenhos.csv"),
                "nomeEntidade;valorEmpenhadoBruto\nACME;10,00\n",
            );
            let write_b = fs::write(
                temp.path().join("2024_empenhos.csv"),
                "anoEmpenho;nomeEntidade\n1999;ACME\n",
            );
            let write_c = fs::write(temp.path().join("notas.csv"), "x\n1\n");
            assert!(write_a.is_ok() && write_b.is_ok() && write_c.is_ok());

            let table = load_dir(temp.path());
            assert_eq!(table.transactions.len(), 2);
            assert_eq!(table.transactions[0].fiscal_year, 2023);
            assert_eq!(table.transactions[1].fiscal_year, 2024);
            assert!(table.transactions[1].schema.has(Field::Year));
            assert_eq!(table.sources.len(), 2);
            assert_eq!(table.transaction_rows(), 2);
        }
    }

    #[test]
    fn broken_workbook_is_reported_not_fatal() {
        let temp = tempfile::tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let write_bad = fs::write(temp.path().join("2022_empenhos.xlsx"), b"not a zip");
            let write_good = fs::write(
                temp.path().join("2023_empenhos.csv"),
                "nomeEntidade\nACME\n",
            );
            assert!(write_bad.is_ok() && write_good.is_ok());

            let table = load_dir(temp.path());
            assert_eq!(table.transactions.len(), 1);
            assert_eq!(table.sources.len(), 2);
            assert!(table.sources[0].error.is_some());
            assert!(table.sources[1].error.is_none());
        }
    }
}
