mod cli;
mod dispatch;
mod output;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use empenhos_client::ClientError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "EMPENHOS_LOG";

const ROOT_HELP: &str = "empenhos - relatórios de empenhos municipais

Usage:
  empenhos <command>

Start here:
  empenhos files list
  empenhos summary
  empenhos --help
";

const TOP_LEVEL_HELP: &str = "empenhos - relatórios de empenhos municipais

USAGE: empenhos <command> [filters] [--json]

Reports (filters: --year, --entity, --creditor, --fund, --expense, --nature; repeatable):
  empenhos summary                                   Totals by fiscal year
  empenhos creditor                                  Totals by creditor
  empenhos fund                                      Totals by fund source with shares
  empenhos expense                                   Totals by expense group and nature
  empenhos paid                                      Settled amounts and paid records
  empenhos compare creditor-fund                     Creditor x fund source matrix
  empenhos compare fund-creditor                     Fund source x creditor matrix
  empenhos keyword <text>                            Search the commitment descriptions
  empenhos export --output <file>                    Write the filtered records as CSV

Data files (<year>_empenhos.csv|xlsx, <year>_referencias.csv|xlsx):
  empenhos files list                                Show the data directory
  empenhos files upload <path>                       Add or replace a data file (admin)
  empenhos files delete <name>                       Remove a data file (admin)

Access:
  empenhos access bootstrap-admin                    Create the first administrator
  empenhos access request <user> --email <e-mail>    Ask for an account
  empenhos access pending                            List pending requests (admin)
  empenhos access approve <user> --role USER|ADMIN   Approve a request (admin)
  empenhos access reject <user>                      Reject a request (admin)
  empenhos access login                              Check credentials
  empenhos user list | user delete <user>            Manage accounts (admin)

Passwords come from EMPENHOS_PASSWORD or --password-stdin.
Set EMPENHOS_HOME to choose the working directory and EMPENHOS_LOG=debug for diagnostics.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if output::print_help(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }
    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let text = if is_top_level_help_request(&raw_args) {
                    TOP_LEVEL_HELP.to_string()
                } else {
                    err.to_string()
                };
                if output::print_help(&text).is_err() {
                    return Err(ExitCode::from(2));
                }
                return Ok(ExitCode::SUCCESS);
            }
            let command_hint = if matches!(
                err.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::InvalidValue
                    | ErrorKind::ValueValidation
                    | ErrorKind::WrongNumberOfValues
                    | ErrorKind::UnknownArgument
                    | ErrorKind::InvalidSubcommand
            ) {
                command_path_from_args(&raw_args)
            } else {
                None
            };
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error =
                ClientError::invalid_argument_for_command(&clean_message, command_hint.as_deref());
            let mode = infer_requested_output_mode(&raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            return Err(ExitCode::from(1));
        }
    };
    let mode = output::mode_for_command(&cli.command);

    let dispatched = dispatch::dispatch(&cli);
    match dispatched {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            debug!(code = %error.code, "command failed");
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Strips clap's trailing boilerplate (Usage line, "For more information" hint)
/// so our "What to do next" section is the single source of guidance.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Builds the subcommand path from raw CLI args for use in help hints.
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let non_flags: Vec<&str> = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect();

    let hint = match non_flags.as_slice() {
        ["compare", "creditor-fund", ..] => "compare creditor-fund",
        ["compare", "fund-creditor", ..] => "compare fund-creditor",
        ["access", sub @ ("request" | "pending" | "approve" | "reject" | "bootstrap-admin"
            | "login"), ..] => return Some(format!("access {sub}")),
        ["user", sub @ ("list" | "delete"), ..] => return Some(format!("user {sub}")),
        ["files", sub @ ("list" | "upload" | "delete"), ..] => {
            return Some(format!("files {sub}"));
        }
        [top @ ("summary" | "creditor" | "fund" | "expense" | "paid" | "compare" | "keyword"
            | "export" | "access" | "user" | "files"), ..] => *top,
        _ => return None,
    };
    Some(hint.to_string())
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if is_internal_error(error) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

fn is_internal_error(error: &ClientError) -> bool {
    error.code.starts_with("internal_")
        || matches!(
            error.code.as_str(),
            "home_init_permission_denied" | "home_init_failed" | "store_corrupt"
        )
}
