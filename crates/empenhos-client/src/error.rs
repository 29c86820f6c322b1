use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const DATA_FILES_HELP_COMMAND: &str = "empenhos files list";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `empenhos {cmd} --help` for usage."),
            None => "Run `empenhos --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn config_missing(variable: &str, reason: &str) -> Self {
        Self::new(
            "config_missing",
            &format!("Configuration `{variable}` is required: {reason}"),
            vec![
                format!("Export `{variable}` in the environment and retry."),
                "Or set `EMPENHOS_STORE=local` to keep documents on local disk.".to_string(),
            ],
        )
        .with_data(json!({
            "variable": variable,
        }))
    }

    pub fn store_conflict(key: &str) -> Self {
        Self::new(
            "store_conflict",
            &format!("Document `{key}` changed while it was being written."),
            vec![
                "Another administrator updated the same document concurrently.".to_string(),
                "Rerun the command so it re-reads the current revision.".to_string(),
            ],
        )
        .with_data(json!({
            "key": key,
        }))
    }

    pub fn store_unavailable(key: &str, detail: &str) -> Self {
        Self::new(
            "store_unavailable",
            &format!("Document store request for `{key}` failed: {detail}"),
            vec![
                "Check network access and the configured repository token.".to_string(),
                "Retry the command.".to_string(),
            ],
        )
        .with_data(json!({
            "key": key,
        }))
    }

    pub fn store_corrupt(key: &str, detail: &str) -> Self {
        Self::new(
            "store_corrupt",
            &format!("Document `{key}` could not be decoded: {detail}"),
            vec![format!(
                "Repair or remove `{key}` so it holds a JSON object keyed by username."
            )],
        )
    }

    pub fn authentication_failed() -> Self {
        Self::new(
            "authentication_failed",
            "Invalid username or password, or access not yet approved.",
            vec![
                "Check your credentials and retry.".to_string(),
                "If you have no account yet, run `empenhos access request`.".to_string(),
            ],
        )
    }

    pub fn admin_required(username: &str) -> Self {
        Self::new(
            "admin_required",
            &format!("User `{username}` is not an administrator."),
            vec!["Ask an administrator to run this command.".to_string()],
        )
    }

    pub fn request_exists(username: &str) -> Self {
        Self::new(
            "request_exists",
            &format!("An access request or account for `{username}` already exists."),
            vec![
                "Choose a different username.".to_string(),
                "Or wait for an administrator to review the existing request.".to_string(),
            ],
        )
        .with_data(json!({
            "username": username,
        }))
    }

    pub fn request_not_found(username: &str) -> Self {
        Self::new(
            "request_not_found",
            &format!("No access request exists for `{username}`."),
            vec!["Run `empenhos access pending` to list open requests.".to_string()],
        )
        .with_data(json!({
            "username": username,
        }))
    }

    pub fn request_not_pending(username: &str, status: &str) -> Self {
        Self::new(
            "request_not_pending",
            &format!("Access request for `{username}` is already `{status}`."),
            vec!["Only pending requests can be approved or rejected.".to_string()],
        )
        .with_data(json!({
            "username": username,
            "status": status,
        }))
    }

    pub fn account_not_found(username: &str) -> Self {
        Self::new(
            "account_not_found",
            &format!("No account exists for `{username}`."),
            vec!["Run `empenhos user list` to see existing accounts.".to_string()],
        )
        .with_data(json!({
            "username": username,
        }))
    }

    pub fn account_exists(username: &str) -> Self {
        Self::new(
            "account_exists",
            &format!("An account for `{username}` already exists."),
            vec!["Reject the request, or delete the existing account first.".to_string()],
        )
        .with_data(json!({
            "username": username,
        }))
    }

    pub fn account_protected(username: &str) -> Self {
        Self::new(
            "account_protected",
            &format!(
                "Account `{username}` is reserved for the administrator. \
                 It cannot be requested or deleted."
            ),
            vec!["Run `empenhos access bootstrap-admin` to create it.".to_string()],
        )
    }

    pub fn invalid_data_file_name(name: &str) -> Self {
        Self::new(
            "invalid_data_file_name",
            &format!("File name `{name}` does not follow the data file convention."),
            vec![
                "Name transaction files `<year>_empenhos.csv` or `<year>_empenhos.xlsx`."
                    .to_string(),
                "Name reference files `<year>_referencias.xlsx` or `<year>_referencias.csv`."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "file_name": name,
        }))
    }

    pub fn data_file_not_found(name: &str) -> Self {
        Self::new(
            "data_file_not_found",
            &format!("Data file `{name}` was not found."),
            vec![format!(
                "Run `{DATA_FILES_HELP_COMMAND}` to see the files currently available."
            )],
        )
        .with_data(json!({
            "file_name": name,
        }))
    }

    pub fn data_file_unreadable(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "data_file_unreadable",
            &format!("Could not read `{location}`: {detail}"),
            vec!["Verify the path exists and is readable.".to_string()],
        )
    }

    pub fn export_write_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "export_write_failed",
            &format!("Could not write export to `{location}`: {detail}"),
            vec!["Choose a writable output path and retry.".to_string()],
        )
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn internal_password_hash(message: &str) -> Self {
        Self::new("internal_password_hash_error", message, Vec::new())
    }

    pub fn home_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "home_init_permission_denied",
            &format!("Cannot initialize data home at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `EMPENHOS_HOME` to a writable directory."
            )],
        )
    }

    pub fn home_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "home_init_failed",
            &format!("Data home initialization failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
