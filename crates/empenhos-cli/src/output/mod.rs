mod access_text;
mod error_text;
mod files_text;
mod format;
mod json;
mod mode;
mod report_text;

use std::io::{self, Write};

use empenhos_client::{ClientError, SuccessEnvelope};

pub use mode::{OutputMode, mode_for_command};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    emit(&body, true)
}

pub fn print_help(text: &str) -> io::Result<()> {
    emit(text, false)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    emit(&body, true)
}

fn emit(body: &str, trailing_newline: bool) -> io::Result<()> {
    emit_to(&mut io::stdout().lock(), body, trailing_newline)
}

/// A reader that went away (`empenhos summary | head`) is not a failure.
fn emit_to<W: Write>(writer: &mut W, body: &str, trailing_newline: bool) -> io::Result<()> {
    let written = writer
        .write_all(body.as_bytes())
        .and_then(|()| {
            if trailing_newline {
                writer.write_all(b"\n")
            } else {
                Ok(())
            }
        })
        .and_then(|()| writer.flush());
    match written {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    let data = &success.data;
    let body = match success.command.as_str() {
        "summary" | "creditor" | "fund" | "expense" | "paid" | "compare creditor-fund"
        | "compare fund-creditor" | "keyword" => report_text::render_report(data)?,
        "export" => report_text::render_export(data)?,
        "access request" => access_text::render_request_submitted(data)?,
        "access pending" => access_text::render_pending(data)?,
        "access approve" => access_text::render_approval(data)?,
        "access reject" => access_text::render_rejection(data)?,
        "access bootstrap-admin" => access_text::render_bootstrap_admin(data)?,
        "access login" => access_text::render_login(data)?,
        "user list" => access_text::render_users(data)?,
        "user delete" => access_text::render_user_deleted(data)?,
        "files list" => files_text::render_files_list(data)?,
        "files upload" => files_text::render_upload(data)?,
        "files delete" => files_text::render_delete(data)?,
        _ => {
            return Err(io::Error::other(format!(
                "unsupported text output command `{}`",
                success.command
            )));
        }
    };
    Ok(with_warnings(body, &success.warnings))
}

fn with_warnings(body: String, warnings: &[String]) -> String {
    if warnings.is_empty() {
        return body;
    }
    let mut lines = vec![body, String::new(), "Avisos:".to_string()];
    lines.extend(warnings.iter().map(|warning| format!("  - {warning}")));
    lines.join("\n")
}
