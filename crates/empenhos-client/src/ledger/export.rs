use rust_decimal::Decimal;

use crate::ledger::aggregate::{Grouped, Measure};
use crate::ledger::money::format_decimal_comma;
use crate::ledger::record::EnrichedRecord;
use crate::ledger::schema::Field;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Columns written after the canonical source fields.
const DERIVED_MEASURES: [Measure; 2] = [Measure::NetCommitted, Measure::Outstanding];

/// Header row of a detail export. Source fields use their canonical names,
/// so the file loads back as a transactions file.
pub fn detail_headers() -> Vec<String> {
    let mut headers = [
        Field::Year,
        Field::Entity,
        Field::Creditor,
        Field::CommitmentNumber,
        Field::FundSource,
        Field::CategoryCode,
        Field::NatureCode,
        Field::Description,
        Field::CommitmentDate,
        Field::Gross,
        Field::Canceled,
        Field::Settled,
        Field::CategoryDescription,
        Field::NatureDescription,
    ]
    .iter()
    .map(|field| field.canonical().to_string())
    .collect::<Vec<String>>();
    headers.extend(DERIVED_MEASURES.iter().map(|measure| measure.column().to_string()));
    headers
}

/// Renders `rows` as a `;`-delimited, decimal-comma CSV with a UTF-8 signature.
pub fn detail_csv<'a, I>(rows: I) -> Result<Vec<u8>, String>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut writer = start_writer();
    writer
        .write_record(detail_headers())
        .map_err(|error| error.to_string())?;

    for row in rows {
        let record = &row.record;
        let mut line = vec![
            record.fiscal_year.to_string(),
            record.entity.clone(),
            record.creditor.clone(),
            record.commitment_number.clone(),
            record.fund_source.clone(),
            record.category_code.clone(),
            record.nature_code.clone(),
            record.description.clone(),
            record.commitment_date.clone().unwrap_or_default(),
            amount(record.gross),
            amount(record.canceled),
            amount(record.settled),
            row.category_label.clone(),
            row.nature_label.clone(),
        ];
        line.extend(DERIVED_MEASURES.iter().map(|measure| amount(measure.value_of(row))));
        writer.write_record(&line).map_err(|error| error.to_string())?;
    }

    finish(writer)
}

/// Renders an aggregate table: one column per dimension, then one per
/// measure, then the record count.
pub fn grouped_csv(grouped: &Grouped) -> Result<Vec<u8>, String> {
    let mut writer = start_writer();

    let mut headers = grouped
        .dimensions
        .iter()
        .map(|dimension| dimension.label().to_string())
        .collect::<Vec<String>>();
    headers.extend(grouped.measures.iter().map(|measure| measure.column().to_string()));
    headers.push("registros".to_string());
    writer.write_record(&headers).map_err(|error| error.to_string())?;

    for row in &grouped.rows {
        let mut line = row.key.clone();
        line.extend(row.values.iter().map(|value| amount(*value)));
        line.push(row.records.to_string());
        writer.write_record(&line).map_err(|error| error.to_string())?;
    }

    finish(writer)
}

fn amount(value: Decimal) -> String {
    format_decimal_comma(value)
}

fn start_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(UTF8_BOM.to_vec())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, String> {
    writer.into_inner().map_err(|error| error.to_string())
}
