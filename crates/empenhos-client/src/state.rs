use std::fs;
use std::path::{Path, PathBuf};

use crate::{ClientError, ClientResult};

pub const DATA_DIR_NAME: &str = "data";

pub fn resolve_home(home_override: Option<&Path>) -> ClientResult<PathBuf> {
    let candidate = match home_override {
        Some(path) => path.to_path_buf(),
        None => {
            if let Some(override_path) = std::env::var_os("EMPENHOS_HOME") {
                PathBuf::from(override_path)
            } else if let Some(home_path) = home::home_dir() {
                home_path.join(".empenhos")
            } else {
                return Err(ClientError::home_init_failed(
                    Path::new("."),
                    "Could not resolve a home directory for the data files.",
                ));
            }
        }
    };

    absolutize(&candidate)
}

pub fn data_dir(home: &Path) -> PathBuf {
    home.join(DATA_DIR_NAME)
}

/// Creates `<home>/data` if needed and returns its path.
pub fn ensure_data_dir(home: &Path) -> ClientResult<PathBuf> {
    let dir = data_dir(home);
    fs::create_dir_all(&dir).map_err(|error| map_io_error(&dir, &error))?;
    set_private_permissions_best_effort(home);
    Ok(dir)
}

pub fn map_io_error(path: &Path, error: &std::io::Error) -> ClientError {
    if error.kind() == std::io::ErrorKind::PermissionDenied {
        return ClientError::home_init_permission_denied(path, &error.to_string());
    }

    ClientError::home_init_failed(path, &error.to_string())
}

fn absolutize(path: &Path) -> ClientResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|error| ClientError::home_init_failed(path, &error.to_string()))
}

#[cfg(unix)]
fn set_private_permissions_best_effort(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn set_private_permissions_best_effort(_path: &Path) {}
