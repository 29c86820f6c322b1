use std::io;

use empenhos_client::ledger::aggregate::Measure;
use serde_json::Value;

use super::format::{Column, brl, key_value_rows, percent, render_table, terminal_width, text};

/// Detail rows shown in the terminal. JSON and `empenhos export` carry all.
const DETAIL_LIMIT: usize = 30;

pub fn render_report(data: &Value) -> io::Result<String> {
    let width = terminal_width();
    let mut lines = vec![text(&data["title"])];

    let filters = filter_summary(data);
    if !filters.is_empty() {
        lines.push(format!("  Filtros: {filters}"));
    }
    if let Some(query) = data.get("query").and_then(Value::as_str) {
        lines.push(format!("  Busca: {query}"));
    }
    lines.push(String::new());

    if data["empty"].as_bool().unwrap_or(false) {
        lines.extend(render_empty(data));
        return Ok(lines.join("\n"));
    }

    lines.push("Totais:".to_string());
    let totals = &data["totals"];
    let labels = Measure::ALL
        .iter()
        .map(|measure| format!("{}:", measure.label()))
        .collect::<Vec<String>>();
    let mut entries = vec![("Registros:", text(&totals["records"]))];
    for (measure, label) in Measure::ALL.iter().zip(&labels) {
        entries.push((label.as_str(), brl(&totals[measure_key(*measure)])));
    }
    lines.extend(key_value_rows(&entries, 2));

    for table in data["tables"].as_array().into_iter().flatten() {
        lines.push(String::new());
        lines.push(format!("{}:", text(&table["title"])));
        lines.extend(render_report_table(table, width));
    }

    if let Some(detail) = data.get("detail").and_then(Value::as_array) {
        lines.push(String::new());
        lines.extend(render_detail(detail, width));
    }

    Ok(lines.join("\n"))
}

pub fn render_export(data: &Value) -> io::Result<String> {
    let layout = text(&data["layout"]);
    let rows_label = if layout == "detail" {
        "registros"
    } else {
        "grupos"
    };
    let mut lines = vec![format!(
        "Arquivo gerado: {} ({} {rows_label}).",
        text(&data["path"]),
        text(&data["rows_written"])
    )];
    let filters = filter_summary(data);
    if !filters.is_empty() {
        lines.push(format!("  Filtros: {filters}"));
    }
    if let Some(query) = data.get("query").and_then(Value::as_str) {
        lines.push(format!("  Busca: {query}"));
    }
    Ok(lines.join("\n"))
}

fn render_empty(data: &Value) -> Vec<String> {
    let mut lines = vec!["Nenhum empenho encontrado para os filtros selecionados.".to_string()];
    if data["load"]["files_loaded"].as_u64() == Some(0) {
        lines.push(String::new());
        lines.push("Nenhum arquivo de dados foi carregado.".to_string());
        lines.push(
            "  Confira com `empenhos files list` ou envie um com `empenhos files upload`."
                .to_string(),
        );
    } else {
        lines.push("  Amplie os filtros ou remova algum deles.".to_string());
    }
    lines
}

fn render_report_table(table: &Value, width: usize) -> Vec<String> {
    let dimensions = table["dimensions"].as_array().cloned().unwrap_or_default();
    let measures = table["measures"].as_array().cloned().unwrap_or_default();
    let with_share = table.get("share_of").is_some_and(|value| !value.is_null());

    let mut columns = dimensions
        .iter()
        .map(|dimension| Column::left(&text(&dimension["label"])))
        .collect::<Vec<Column>>();
    columns.extend(
        measures
            .iter()
            .map(|measure| Column::right(&text(&measure["label"]))),
    );
    if with_share {
        columns.push(Column::right("Participação"));
    }
    columns.push(Column::right("Registros"));

    let rows = table["rows"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|row| {
            let mut cells = row["key"]
                .as_array()
                .into_iter()
                .flatten()
                .map(text)
                .collect::<Vec<String>>();
            cells.extend(row["values"].as_array().into_iter().flatten().map(brl));
            if with_share {
                cells.push(percent(&row["share"]));
            }
            cells.push(text(&row["records"]));
            cells
        })
        .collect::<Vec<Vec<String>>>();

    render_table(&columns, &rows, width)
}

fn render_detail(detail: &[Value], width: usize) -> Vec<String> {
    let mut lines = if detail.len() > DETAIL_LIMIT {
        vec![format!(
            "Detalhamento (primeiros {DETAIL_LIMIT} de {}):",
            detail.len()
        )]
    } else {
        vec!["Detalhamento:".to_string()]
    };

    let columns = [
        Column::left("Exercício"),
        Column::left("Entidade"),
        Column::left("Credor"),
        Column::left("Empenho"),
        Column::left("Especificação"),
        Column::right("Empenhado Líquido"),
        Column::right("Baixado"),
    ];
    let rows = detail
        .iter()
        .take(DETAIL_LIMIT)
        .map(|row| {
            vec![
                text(&row["fiscal_year"]),
                text(&row["entity"]),
                text(&row["creditor"]),
                text(&row["commitment_number"]),
                text(&row["description"]),
                brl(&row["net_committed"]),
                brl(&row["settled"]),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(render_table(&columns, &rows, width));

    if detail.len() > DETAIL_LIMIT {
        lines.push(String::new());
        lines.push(
            "  Use `empenhos export --output <arquivo>` com os mesmos filtros para obter todas as linhas."
                .to_string(),
        );
    }
    lines
}

fn filter_summary(data: &Value) -> String {
    data["filters"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|filter| {
            let values = filter["values"]
                .as_array()
                .into_iter()
                .flatten()
                .map(text)
                .collect::<Vec<String>>()
                .join(", ");
            format!("{} = {values}", text(&filter["label"]))
        })
        .collect::<Vec<String>>()
        .join("; ")
}

fn measure_key(measure: Measure) -> &'static str {
    match measure {
        Measure::Gross => "gross",
        Measure::Canceled => "canceled",
        Measure::Settled => "settled",
        Measure::NetCommitted => "net_committed",
        Measure::Outstanding => "outstanding",
    }
}
