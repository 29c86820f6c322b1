use crate::cli::{AccessCommand, Commands, CompareCommand, FilesCommand, UserCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    if json_requested(command) {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}

fn json_requested(command: &Commands) -> bool {
    match command {
        Commands::Summary(report)
        | Commands::Creditor(report)
        | Commands::Fund(report)
        | Commands::Expense(report)
        | Commands::Paid(report)
        | Commands::Keyword { report, .. }
        | Commands::Export { report, .. } => report.json,
        Commands::Compare { command } => match command {
            CompareCommand::CreditorFund(report) | CompareCommand::FundCreditor(report) => {
                report.json
            }
        },
        Commands::Access { command } => match command {
            AccessCommand::Request { json, .. }
            | AccessCommand::Pending { json, .. }
            | AccessCommand::Approve { json, .. }
            | AccessCommand::Reject { json, .. }
            | AccessCommand::BootstrapAdmin { json, .. }
            | AccessCommand::Login { json, .. } => *json,
        },
        Commands::User { command } => match command {
            UserCommand::List { json, .. } | UserCommand::Delete { json, .. } => *json,
        },
        Commands::Files { command } => match command {
            FilesCommand::List { json }
            | FilesCommand::Upload { json, .. }
            | FilesCommand::Delete { json, .. } => *json,
        },
    }
}
