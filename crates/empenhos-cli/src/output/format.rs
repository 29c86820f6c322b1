use std::cmp;
use std::str::FromStr;

use empenhos_client::ledger::money::{format_brl, format_percent};
use rust_decimal::Decimal;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub align: Align,
}

impl Column {
    pub fn left(name: &str) -> Self {
        Self {
            name: name.to_string(),
            align: Align::Left,
        }
    }

    pub fn right(name: &str) -> Self {
        Self {
            name: name.to_string(),
            align: Align::Right,
        }
    }
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;
const MIN_COLUMN_WIDTH: usize = 6;

pub fn terminal_width() -> usize {
    let from_env = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);
    cmp::max(from_env, 40)
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| display_width(label))
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{}  {value}", pad(label, label_width, Align::Left)))
        .collect()
}

/// Renders an aligned table. Left-aligned columns are shortened with `…`
/// when the rows do not fit in `max_width`; numeric columns never are.
pub fn render_table(columns: &[Column], rows: &[Vec<String>], max_width: usize) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let mut widths = columns
        .iter()
        .map(|column| display_width(&column.name))
        .collect::<Vec<usize>>();
    for row in rows {
        for (index, value) in row.iter().enumerate() {
            if let Some(slot) = widths.get_mut(index) {
                *slot = cmp::max(*slot, display_width(value));
            }
        }
    }
    shrink_to_fit(columns, &mut widths, max_width);

    let mut output = Vec::with_capacity(rows.len() + 1);
    let header = columns
        .iter()
        .map(|column| column.name.clone())
        .collect::<Vec<String>>();
    output.push(format_row(columns, &header, &widths));
    for row in rows {
        output.push(format_row(columns, row, &widths));
    }
    output
}

fn shrink_to_fit(columns: &[Column], widths: &mut [usize], max_width: usize) {
    let gaps = COLUMN_GAP * columns.len().saturating_sub(1);
    let budget = max_width.saturating_sub(INDENT + gaps);
    let mut total = widths.iter().sum::<usize>();

    while total > budget {
        let widest = columns
            .iter()
            .enumerate()
            .filter(|(index, column)| {
                column.align == Align::Left && widths[*index] > MIN_COLUMN_WIDTH
            })
            .max_by_key(|(index, _)| widths[*index])
            .map(|(index, _)| index);
        let Some(index) = widest else {
            break;
        };
        widths[index] -= 1;
        total -= 1;
    }
}

fn format_row(columns: &[Column], cells: &[String], widths: &[usize]) -> String {
    let pieces = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let width = widths.get(index).copied().unwrap_or(MIN_COLUMN_WIDTH);
            let value = cells.get(index).map(String::as_str).unwrap_or("");
            pad(&truncate(value, width), width, column.align)
        })
        .collect::<Vec<String>>();
    format!("{}{}", " ".repeat(INDENT), pieces.join(&" ".repeat(COLUMN_GAP)))
        .trim_end()
        .to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn pad(value: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(display_width(value)));
    match align {
        Align::Left => format!("{value}{fill}"),
        Align::Right => format!("{fill}{value}"),
    }
}

fn truncate(value: &str, width: usize) -> String {
    if display_width(value) <= width {
        return value.to_string();
    }
    let mut shortened = value.chars().take(width.saturating_sub(1)).collect::<String>();
    shortened.push('…');
    shortened
}

/// Amounts arrive as decimal strings in the envelope.
pub fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(text) => Decimal::from_str(text).ok(),
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        _ => None,
    }
}

pub fn brl(value: &Value) -> String {
    decimal(value).map(format_brl).unwrap_or_else(|| "-".to_string())
}

/// Shares are fractions of one; shown as percentages.
pub fn percent(value: &Value) -> String {
    decimal(value)
        .map(|share| format_percent(share * Decimal::ONE_HUNDRED))
        .unwrap_or_else(|| "-".to_string())
}

pub fn text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Column, brl, key_value_rows, percent, render_table};

    #[test]
    fn key_value_rows_align_labels() {
        let rows = key_value_rows(
            &[
                ("Registros:", "4".to_string()),
                ("Empenhado:", "R$ 1,00".to_string()),
            ],
            2,
        );

        assert_eq!(rows[0], "  Registros:  4");
        assert_eq!(rows[1], "  Empenhado:  R$ 1,00");
    }

    #[test]
    fn table_aligns_accented_headers_by_character() {
        let lines = render_table(
            &[Column::left("Exercício"), Column::right("Valor")],
            &[vec!["2024".to_string(), "R$ 10,00".to_string()]],
            120,
        );
        assert_eq!(lines[0], "  Exercício     Valor");
        assert_eq!(lines[1], "  2024       R$ 10,00");
    }

    #[test]
    fn narrow_terminal_shortens_text_columns_only() {
        let lines = render_table(
            &[Column::left("Credor"), Column::right("Valor")],
            &[vec![
                "EMPRESA DE PAVIMENTACAO E OBRAS LTDA".to_string(),
                "R$ 1.000,00".to_string(),
            ]],
            30,
        );
        assert!(lines[1].contains('…'));
        assert!(lines[1].ends_with("R$ 1.000,00"));
        assert!(lines.iter().all(|line| line.chars().count() <= 30));
    }

    #[test]
    fn amounts_render_in_brl() {
        assert_eq!(brl(&json!("1234567.891")), "R$ 1.234.567,89");
        assert_eq!(brl(&json!(null)), "-");
        assert_eq!(percent(&json!("0.25")), "25,00%");
    }
}
