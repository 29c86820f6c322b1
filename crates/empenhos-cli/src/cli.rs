use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use empenhos_client::access::model::Role;
use empenhos_client::commands::common::ReportFilters;
use empenhos_client::ledger::filter::Dimension;

pub fn parse_role(value: &str) -> Result<Role, String> {
    Role::parse(value).ok_or_else(|| "role must be USER or ADMIN".to_string())
}

pub fn parse_dimension(value: &str) -> Result<Dimension, String> {
    Dimension::parse(value).ok_or_else(|| {
        "dimension must be one of: year, entity, creditor, fund, expense, expense_nature, nature"
            .to_string()
    })
}

/// Extended help shown after `empenhos export --help`.
pub const EXPORT_AFTER_HELP: &str = "\
Output format:
  `;`-delimited CSV, UTF-8 with signature, decimal comma and no thousands
  separator. Spreadsheet programs configured for pt-BR open it directly.

  Without --group-by, one line per filtered record with the same column
  names the loader reads, so an exported file can be dropped back into the
  data directory as `<year>_empenhos.csv`.

  With --group-by, one line per group: the grouping columns, then every
  measure, then the record count.

Examples:
  empenhos export --output pagos-2024.csv --year 2024
  empenhos export --output por-fonte.csv --group-by year,fund
  empenhos export --output merenda.csv --keyword merenda
";

/// Extended help shared by commands that authenticate.
pub const AUTH_AFTER_HELP: &str = "\
Authentication:
  The password is read from the EMPENHOS_PASSWORD environment variable,
  or from the first line of stdin with --password-stdin.
  Example: printf '%s\\n' \"$SENHA\" | empenhos access pending --password-stdin
";

#[derive(Debug, Parser)]
#[command(
    name = "empenhos",
    version,
    about = "municipal budget-commitment reports",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Fiscal year to include (repeatable; omitted = all)
    #[arg(long = "year", value_name = "YEAR")]
    pub years: Vec<String>,
    /// Entity name to include (repeatable)
    #[arg(long = "entity", value_name = "ENTITY")]
    pub entities: Vec<String>,
    /// Creditor name to include (repeatable)
    #[arg(long = "creditor", value_name = "CREDITOR")]
    pub creditors: Vec<String>,
    /// Fund source code to include (repeatable)
    #[arg(long = "fund", value_name = "CODE")]
    pub funds: Vec<String>,
    /// Expense category description to include (repeatable)
    #[arg(long = "expense", value_name = "DESCRIPTION")]
    pub expenses: Vec<String>,
    /// Expense nature code to include (repeatable)
    #[arg(long = "nature", value_name = "CODE")]
    pub natures: Vec<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> ReportFilters {
        ReportFilters {
            years: self.years.clone(),
            entities: self.entities.clone(),
            creditors: self.creditors.clone(),
            funds: self.funds.clone(),
            expenses: self.expenses.clone(),
            natures: self.natures.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AuthArgs {
    /// Account to authenticate as
    #[arg(long = "user", value_name = "USERNAME", default_value = "admin")]
    pub user: String,
    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Totals per fiscal year and entity
    Summary(ReportArgs),
    /// Net committed and settled amounts per creditor, with detail rows
    Creditor(ReportArgs),
    /// Gross committed amounts per fund source
    Fund(ReportArgs),
    /// Net committed and settled amounts per expense category
    Expense(ReportArgs),
    /// Amounts settled in each fiscal year, with detail rows
    Paid(ReportArgs),
    /// Cross a creditor against fund sources, or a fund against creditors
    #[command(arg_required_else_help = true)]
    Compare {
        #[command(subcommand)]
        command: CompareCommand,
    },
    /// Search commitment descriptions, ignoring accents, case and plurals
    Keyword {
        /// Word or phrase to look for
        text: String,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Write the filtered records, or a grouped table, to a CSV file
    #[command(after_long_help = EXPORT_AFTER_HELP)]
    Export {
        /// Destination file
        #[arg(long, short = 'o')]
        output: PathBuf,
        /// Group by these dimensions instead of writing one line per record
        #[arg(long = "group-by", value_delimiter = ',', value_parser = parse_dimension)]
        group_by: Vec<Dimension>,
        /// Restrict the export to descriptions matching this keyword
        #[arg(long)]
        keyword: Option<String>,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Request access and review pending requests
    #[command(arg_required_else_help = true)]
    Access {
        #[command(subcommand)]
        command: AccessCommand,
    },
    /// Manage approved accounts
    #[command(arg_required_else_help = true)]
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Manage the transaction and reference files behind the reports
    #[command(arg_required_else_help = true)]
    Files {
        #[command(subcommand)]
        command: FilesCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CompareCommand {
    /// Amounts per year and fund source
    CreditorFund(ReportArgs),
    /// Amounts per year and creditor
    FundCreditor(ReportArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum AccessCommand {
    /// Ask an administrator for an account
    #[command(after_long_help = AUTH_AFTER_HELP)]
    Request {
        /// Username to request
        username: String,
        /// Contact e-mail
        #[arg(long)]
        email: String,
        /// Read the new password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// List requests waiting for review (admin)
    #[command(after_long_help = AUTH_AFTER_HELP)]
    Pending {
        #[command(flatten)]
        auth: AuthArgs,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Approve a pending request and create the account (admin)
    #[command(after_long_help = AUTH_AFTER_HELP)]
    Approve {
        /// Username of the pending request
        username: String,
        /// Role granted to the new account
        #[arg(long, value_parser = parse_role, default_value = "USER")]
        role: Role,
        #[command(flatten)]
        auth: AuthArgs,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Reject a pending request (admin)
    #[command(after_long_help = AUTH_AFTER_HELP)]
    Reject {
        /// Username of the pending request
        username: String,
        #[command(flatten)]
        auth: AuthArgs,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Create the protected `admin` account if it does not exist
    #[command(after_long_help = AUTH_AFTER_HELP)]
    BootstrapAdmin {
        /// Read the admin password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Check credentials and show the account role
    #[command(after_long_help = AUTH_AFTER_HELP)]
    Login {
        #[command(flatten)]
        auth: AuthArgs,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum UserCommand {
    /// List accounts with role and status (admin)
    #[command(after_long_help = AUTH_AFTER_HELP)]
    List {
        #[command(flatten)]
        auth: AuthArgs,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Delete an account (admin)
    #[command(after_long_help = AUTH_AFTER_HELP)]
    Delete {
        /// Account to delete
        username: String,
        #[command(flatten)]
        auth: AuthArgs,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum FilesCommand {
    /// List files in the data directory
    List {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Add or replace a `<year>_empenhos` or `<year>_referencias` file (admin)
    #[command(after_long_help = AUTH_AFTER_HELP)]
    Upload {
        /// Local CSV or XLSX file to upload
        path: PathBuf,
        #[command(flatten)]
        auth: AuthArgs,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Remove a data file (admin)
    #[command(after_long_help = AUTH_AFTER_HELP)]
    Delete {
        /// File name as shown by `empenhos files list`
        name: String,
        #[command(flatten)]
        auth: AuthArgs,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
