use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::access::MAX_WRITE_ATTEMPTS;
use crate::commands::access::{Credentials, authorize_admin_in};
use crate::commands::common::Dashboard;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{
    DataFileClass, DataFileEntry, FileDeleteData, FileUploadData, FilesListData,
};
use crate::ledger::loader::classify_file_name;
use crate::state::{DATA_DIR_NAME, ensure_data_dir, map_io_error};
use crate::store::{DocumentStore, Revision};
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct FilesListOptions<'a> {
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct FileUploadOptions<'a> {
    pub credentials: Credentials,
    pub path: PathBuf,
    pub home_override: Option<&'a Path>,
}

#[derive(Debug, Default)]
pub struct FileDeleteOptions<'a> {
    pub credentials: Credentials,
    pub name: String,
    pub home_override: Option<&'a Path>,
}

pub fn list() -> ClientResult<SuccessEnvelope> {
    list_with_options(FilesListOptions::default())
}

#[doc(hidden)]
pub fn list_with_options(options: FilesListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let dashboard = Dashboard::open(options.home_override)?;
    let data_dir = &dashboard.settings().data_dir;
    let data = FilesListData {
        data_dir: data_dir.display().to_string(),
        files: list_data_files(data_dir)?,
    };
    success("files list", data)
}

pub fn upload_with_options(options: FileUploadOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let dashboard = Dashboard::open(options.home_override)?;
    upload_in(&dashboard, &options.credentials, &options.path)
}

/// Writes a data file through the store, then drops the ledger cache.
pub fn upload_in(
    dashboard: &Dashboard,
    credentials: &Credentials,
    path: &Path,
) -> ClientResult<SuccessEnvelope> {
    let store = dashboard.store()?;
    authorize_admin_in(store.as_ref(), credentials)?;

    let name = path
        .file_name()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_default();
    validate_data_file_name(&name)?;
    let bytes = fs::read(path)
        .map_err(|error| ClientError::data_file_unreadable(path, &error.to_string()))?;

    let key = data_key(&name);
    let (revision, replaced) = replace_document(store.as_ref(), &key, &bytes)?;

    let mirrored_to = if store.backend() == "local" {
        None
    } else {
        let target = ensure_data_dir(&dashboard.settings().home)?.join(&name);
        fs::write(&target, &bytes).map_err(|error| map_io_error(&target, &error))?;
        Some(target.display().to_string())
    };

    dashboard.invalidate();
    info!(file = %name, backend = store.backend(), replaced, "data file uploaded");

    success(
        "files upload",
        FileUploadData {
            name,
            key,
            backend: store.backend().to_string(),
            revision: revision.to_string(),
            replaced,
            mirrored_to,
            size_bytes: bytes.len(),
        },
    )
}

pub fn delete_with_options(options: FileDeleteOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let dashboard = Dashboard::open(options.home_override)?;
    delete_in(&dashboard, &options.credentials, &options.name)
}

pub fn delete_in(
    dashboard: &Dashboard,
    credentials: &Credentials,
    name: &str,
) -> ClientResult<SuccessEnvelope> {
    let store = dashboard.store()?;
    authorize_admin_in(store.as_ref(), credentials)?;

    let name = name.trim().to_string();
    validate_data_file_name(&name)?;
    let key = data_key(&name);
    let local_copy = dashboard.settings().data_dir.join(&name);

    let stored = store.get(&key)?;
    if stored.is_none() && (store.backend() == "local" || !local_copy.exists()) {
        return Err(ClientError::data_file_not_found(&name));
    }
    if let Some(document) = stored {
        store.delete(&key, &document.revision)?;
    }

    let local_copy_removed = match fs::remove_file(&local_copy) {
        Ok(()) => true,
        Err(error) if error.kind() == ErrorKind::NotFound => store.backend() == "local",
        Err(error) => {
            warn!(file = %local_copy.display(), %error, "could not remove local copy");
            false
        }
    };

    dashboard.invalidate();
    info!(file = %name, backend = store.backend(), "data file deleted");

    success(
        "files delete",
        FileDeleteData {
            name,
            key,
            backend: store.backend().to_string(),
            local_copy_removed,
        },
    )
}

/// Data-directory files sorted by name, classified by naming convention.
pub fn list_data_files(data_dir: &Path) -> ClientResult<Vec<DataFileEntry>> {
    let entries = match fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(map_io_error(data_dir, &error)),
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let classified = classify_file_name(&name);
        files.push(DataFileEntry {
            class: classified
                .map(|value| DataFileClass::from(value.kind))
                .unwrap_or(DataFileClass::Other),
            format: classified.map(|value| value.format),
            year: classified.and_then(|value| value.year),
            size_bytes: metadata.len(),
            name,
        });
    }
    files.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(files)
}

fn validate_data_file_name(name: &str) -> ClientResult<()> {
    let valid = !name.contains('/')
        && !name.contains('\\')
        && classify_file_name(name).is_some_and(|classified| classified.year.is_some());
    if valid {
        Ok(())
    } else {
        Err(ClientError::invalid_data_file_name(name))
    }
}

fn data_key(name: &str) -> String {
    format!("{DATA_DIR_NAME}/{name}")
}

/// Puts `bytes` over whatever revision is current, re-reading on conflict.
fn replace_document(
    store: &dyn DocumentStore,
    key: &str,
    bytes: &[u8],
) -> ClientResult<(Revision, bool)> {
    let mut attempt = 1;
    loop {
        let current = store.get(key)?.map(|document| document.revision);
        match store.put(key, bytes, current.as_ref()) {
            Ok(revision) => return Ok((revision, current.is_some())),
            Err(error) if error.code == "store_conflict" && attempt < MAX_WRITE_ATTEMPTS => {
                warn!(key, attempt, "data file changed during upload; retrying");
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{list_data_files, validate_data_file_name};
    use crate::contracts::types::DataFileClass;

    #[test]
    fn accepts_only_conventional_names() {
        assert!(validate_data_file_name("2024_empenhos.csv").is_ok());
        assert!(validate_data_file_name("2023_EMPENHOS.XLSX").is_ok());
        assert!(validate_data_file_name("2024_referencias.xlsx").is_ok());
        assert!(validate_data_file_name("xx_empenhos.csv").is_err());
        assert!(validate_data_file_name("empenhos.csv").is_err());
        assert!(validate_data_file_name("2024_empenhos.txt").is_err());
        assert!(validate_data_file_name("../2024_empenhos.csv").is_err());
    }

    #[test]
    fn lists_and_classifies_files() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok());
        let Ok(dir) = dir else {
            return;
        };
        assert!(fs::write(dir.path().join("2024_empenhos.csv"), "a;b\n").is_ok());
        assert!(fs::write(dir.path().join("2024_referencias.xlsx"), "x").is_ok());
        assert!(fs::write(dir.path().join("usuarios.json"), "{}").is_ok());
        assert!(fs::write(dir.path().join(".hidden"), "").is_ok());
        assert!(fs::create_dir(dir.path().join("sub")).is_ok());

        let files = list_data_files(dir.path());
        assert!(files.is_ok());
        if let Ok(files) = files {
            let names = files.iter().map(|file| file.name.as_str()).collect::<Vec<&str>>();
            assert_eq!(names, vec!["2024_empenhos.csv", "2024_referencias.xlsx", "usuarios.json"]);
            assert_eq!(files[0].class, DataFileClass::Transactions);
            assert_eq!(files[0].year, Some(2024));
            assert_eq!(files[0].size_bytes, 4);
            assert_eq!(files[1].class, DataFileClass::References);
            assert_eq!(files[2].class, DataFileClass::Other);
        }
    }

    #[test]
    fn missing_data_dir_lists_nothing() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok());
        if let Ok(dir) = dir {
            let files = list_data_files(&dir.path().join("data"));
            assert!(matches!(files, Ok(ref found) if found.is_empty()));
        }
    }
}
