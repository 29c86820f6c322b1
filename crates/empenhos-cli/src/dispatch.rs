use std::io::{self, BufRead};

use empenhos_client::commands;
use empenhos_client::commands::access::{
    AdminOptions, BootstrapAdminOptions, Credentials, RequestAccessOptions, ReviewOptions,
};
use empenhos_client::commands::files::{FileDeleteOptions, FileUploadOptions};
use empenhos_client::commands::reports::{ExportOptions, ReportKind};
use empenhos_client::commands::users::UserDeleteOptions;
use empenhos_client::{ClientError, ClientResult, SuccessEnvelope};

use crate::cli::{
    AccessCommand, AuthArgs, Cli, Commands, CompareCommand, FilesCommand, ReportArgs, UserCommand,
};

pub const PASSWORD_ENV: &str = "EMPENHOS_PASSWORD";

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Summary(report) => run_report(ReportKind::Summary, report),
        Commands::Creditor(report) => run_report(ReportKind::Creditor, report),
        Commands::Fund(report) => run_report(ReportKind::Fund, report),
        Commands::Expense(report) => run_report(ReportKind::Expense, report),
        Commands::Paid(report) => run_report(ReportKind::Paid, report),
        Commands::Compare { command } => match command {
            CompareCommand::CreditorFund(report) => {
                run_report(ReportKind::CompareCreditorFund, report)
            }
            CompareCommand::FundCreditor(report) => {
                run_report(ReportKind::CompareFundCreditor, report)
            }
        },
        Commands::Keyword { text, report } => {
            commands::reports::keyword(text, report.filters.to_filters())
        }
        Commands::Export {
            output,
            group_by,
            keyword,
            report,
        } => commands::reports::export(ExportOptions {
            output: output.clone(),
            filters: report.filters.to_filters(),
            query: keyword.clone(),
            group_by: group_by.clone(),
            home_override: None,
        }),
        Commands::Access { command } => dispatch_access(command),
        Commands::User { command } => match command {
            UserCommand::List { auth, .. } => commands::users::list_with_options(AdminOptions {
                credentials: credentials(auth)?,
                home_override: None,
            }),
            UserCommand::Delete { username, auth, .. } => {
                commands::users::delete_with_options(UserDeleteOptions {
                    credentials: credentials(auth)?,
                    username: username.clone(),
                    home_override: None,
                })
            }
        },
        Commands::Files { command } => match command {
            FilesCommand::List { .. } => commands::files::list(),
            FilesCommand::Upload { path, auth, .. } => {
                commands::files::upload_with_options(FileUploadOptions {
                    credentials: credentials(auth)?,
                    path: path.clone(),
                    home_override: None,
                })
            }
            FilesCommand::Delete { name, auth, .. } => {
                commands::files::delete_with_options(FileDeleteOptions {
                    credentials: credentials(auth)?,
                    name: name.clone(),
                    home_override: None,
                })
            }
        },
    }
}

fn run_report(kind: ReportKind, report: &ReportArgs) -> ClientResult<SuccessEnvelope> {
    commands::reports::run(kind, report.filters.to_filters())
}

fn dispatch_access(command: &AccessCommand) -> ClientResult<SuccessEnvelope> {
    match command {
        AccessCommand::Request {
            username,
            email,
            password_stdin,
            ..
        } => commands::access::request_with_options(RequestAccessOptions {
            username: username.clone(),
            email: email.clone(),
            password: read_password(*password_stdin)?,
            home_override: None,
        }),
        AccessCommand::Pending { auth, .. } => {
            commands::access::pending_with_options(AdminOptions {
                credentials: credentials(auth)?,
                home_override: None,
            })
        }
        AccessCommand::Approve {
            username,
            role,
            auth,
            ..
        } => commands::access::approve_with_options(ReviewOptions {
            credentials: credentials(auth)?,
            username: username.clone(),
            role: *role,
            home_override: None,
        }),
        AccessCommand::Reject { username, auth, .. } => {
            commands::access::reject_with_options(ReviewOptions {
                credentials: credentials(auth)?,
                username: username.clone(),
                home_override: None,
                ..ReviewOptions::default()
            })
        }
        AccessCommand::BootstrapAdmin { password_stdin, .. } => {
            commands::access::bootstrap_admin_with_options(BootstrapAdminOptions {
                password: read_password(*password_stdin)?,
                home_override: None,
            })
        }
        AccessCommand::Login { auth, .. } => commands::access::login_with_options(AdminOptions {
            credentials: credentials(auth)?,
            home_override: None,
        }),
    }
}

fn credentials(auth: &AuthArgs) -> ClientResult<Credentials> {
    Ok(Credentials {
        username: auth.user.clone(),
        password: read_password(auth.password_stdin)?,
    })
}

/// First line of stdin with `--password-stdin`, otherwise `EMPENHOS_PASSWORD`.
fn read_password(from_stdin: bool) -> ClientResult<String> {
    if from_stdin {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map_err(|error| {
            ClientError::invalid_argument(&format!(
                "Could not read the password from stdin: {error}"
            ))
        })?;
        let password = line.trim_end_matches(['\r', '\n']).to_string();
        return password_or_missing(password);
    }
    password_or_missing(std::env::var(PASSWORD_ENV).unwrap_or_default())
}

fn password_or_missing(password: String) -> ClientResult<String> {
    if password.is_empty() {
        return Err(ClientError::invalid_argument_with_recovery(
            "A password is required.",
            vec![
                format!("Set `{PASSWORD_ENV}` before running the command."),
                "Or pipe it in with `--password-stdin`.".to_string(),
            ],
        ));
    }
    Ok(password)
}
