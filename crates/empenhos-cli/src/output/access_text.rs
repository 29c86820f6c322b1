use std::io;

use serde_json::Value;

use super::format::{Column, key_value_rows, render_table, terminal_width, text};

pub fn render_request_submitted(data: &Value) -> io::Result<String> {
    let request = &data["request"];
    let mut lines = vec![format!(
        "Solicitação de acesso registrada para `{}`.",
        text(&request["username"])
    )];
    lines.extend(key_value_rows(
        &[
            ("E-mail:", text(&request["email"])),
            ("Perfil:", text(&request["requested_role"])),
            ("Situação:", text(&request["status"])),
        ],
        2,
    ));
    lines.push(String::new());
    lines.push("Um administrador precisa aprovar o pedido antes do primeiro acesso.".to_string());
    Ok(lines.join("\n"))
}

pub fn render_pending(data: &Value) -> io::Result<String> {
    let requests = data["requests"].as_array().cloned().unwrap_or_default();
    if requests.is_empty() {
        return Ok("Nenhuma solicitação pendente.".to_string());
    }

    let rows = requests
        .iter()
        .map(|request| {
            vec![
                text(&request["username"]),
                text(&request["email"]),
                text(&request["requested_role"]),
                text(&request["requested_at"]),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    let mut lines = vec![format!("Solicitações pendentes ({}):", requests.len())];
    lines.extend(render_table(
        &[
            Column::left("Usuário"),
            Column::left("E-mail"),
            Column::left("Perfil"),
            Column::left("Solicitado em"),
        ],
        &rows,
        terminal_width(),
    ));
    lines.push(String::new());
    lines.push("Aprove com `empenhos access approve <usuário> --role USER|ADMIN`.".to_string());
    Ok(lines.join("\n"))
}

pub fn render_approval(data: &Value) -> io::Result<String> {
    let account = &data["account"];
    Ok(format!(
        "Acesso aprovado: `{}` agora é {} ({}).",
        text(&account["username"]),
        text(&account["role"]),
        text(&account["status"])
    ))
}

pub fn render_rejection(data: &Value) -> io::Result<String> {
    Ok(format!(
        "Solicitação de `{}` rejeitada.",
        text(&data["request"]["username"])
    ))
}

pub fn render_bootstrap_admin(data: &Value) -> io::Result<String> {
    let username = text(&data["username"]);
    if data["created"].as_bool().unwrap_or(false) {
        Ok(format!("Conta administradora `{username}` criada."))
    } else {
        Ok(format!(
            "A conta `{username}` já existe; nada foi alterado."
        ))
    }
}

pub fn render_login(data: &Value) -> io::Result<String> {
    let session = &data["session"];
    Ok(format!(
        "Credenciais válidas para `{}` (perfil {}).",
        text(&session["username"]),
        text(&session["role"])
    ))
}

pub fn render_users(data: &Value) -> io::Result<String> {
    let users = data["users"].as_array().cloned().unwrap_or_default();
    if users.is_empty() {
        return Ok("Nenhuma conta cadastrada.".to_string());
    }
    let rows = users
        .iter()
        .map(|user| {
            vec![
                text(&user["username"]),
                text(&user["role"]),
                text(&user["status"]),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    let mut lines = vec![format!("Contas ({}):", users.len())];
    lines.extend(render_table(
        &[
            Column::left("Usuário"),
            Column::left("Perfil"),
            Column::left("Situação"),
        ],
        &rows,
        terminal_width(),
    ));
    Ok(lines.join("\n"))
}

pub fn render_user_deleted(data: &Value) -> io::Result<String> {
    Ok(format!(
        "Conta `{}` excluída.",
        text(&data["account"]["username"])
    ))
}
