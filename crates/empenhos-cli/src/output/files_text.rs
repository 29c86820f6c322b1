use std::io;

use serde_json::Value;

use super::format::{Column, render_table, terminal_width, text};

pub fn render_files_list(data: &Value) -> io::Result<String> {
    let files = data["files"].as_array().cloned().unwrap_or_default();
    let data_dir = text(&data["data_dir"]);
    if files.is_empty() {
        return Ok(format!(
            "Nenhum arquivo em {data_dir}.\n  Envie um com `empenhos files upload <ano>_empenhos.csv`."
        ));
    }

    let rows = files
        .iter()
        .map(|file| {
            vec![
                text(&file["name"]),
                class_label(&file["class"]).to_string(),
                text(&file["year"]),
                format_size(file["size_bytes"].as_u64().unwrap_or(0)),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![format!("Arquivos em {data_dir}:")];
    lines.extend(render_table(
        &[
            Column::left("Arquivo"),
            Column::left("Tipo"),
            Column::left("Exercício"),
            Column::right("Tamanho"),
        ],
        &rows,
        terminal_width(),
    ));
    Ok(lines.join("\n"))
}

pub fn render_upload(data: &Value) -> io::Result<String> {
    let verb = if data["replaced"].as_bool().unwrap_or(false) {
        "substituído"
    } else {
        "enviado"
    };
    let mut lines = vec![format!(
        "Arquivo `{}` {verb} ({}, armazenamento {}).",
        text(&data["name"]),
        format_size(data["size_bytes"].as_u64().unwrap_or(0)),
        text(&data["backend"])
    )];
    if let Some(mirror) = data.get("mirrored_to").and_then(Value::as_str) {
        lines.push(format!("  Cópia local: {mirror}"));
    }
    Ok(lines.join("\n"))
}

pub fn render_delete(data: &Value) -> io::Result<String> {
    let mut lines = vec![format!(
        "Arquivo `{}` removido (armazenamento {}).",
        text(&data["name"]),
        text(&data["backend"])
    )];
    if !data["local_copy_removed"].as_bool().unwrap_or(false) {
        lines.push("  A cópia local não foi encontrada ou não pôde ser removida.".to_string());
    }
    Ok(lines.join("\n"))
}

fn class_label(class: &Value) -> &'static str {
    match class.as_str() {
        Some("transactions") => "empenhos",
        Some("references") => "referências",
        _ => "outro",
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;
    if value < KIB {
        format!("{bytes} B")
    } else if value < KIB * KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{:.1} MiB", value / (KIB * KIB))
    }
}
