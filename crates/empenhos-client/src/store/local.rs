use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::store::{DocumentStore, Revision, StoredDocument, validate_key};
use crate::{ClientError, ClientResult};

/// Documents as plain files under a root directory.
///
/// The revision of a document is the SHA-256 of its bytes, so identical
/// content always carries the same revision.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> ClientResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn current_revision(&self, key: &str, path: &Path) -> ClientResult<Option<Revision>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(revision_of(&bytes))),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ClientError::store_unavailable(key, &error.to_string())),
        }
    }
}

pub fn revision_of(bytes: &[u8]) -> Revision {
    Revision::new(format!("{:x}", Sha256::digest(bytes)))
}

impl DocumentStore for LocalStore {
    fn get(&self, key: &str) -> ClientResult<Option<StoredDocument>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => {
                let revision = revision_of(&bytes);
                Ok(Some(StoredDocument { bytes, revision }))
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ClientError::store_unavailable(key, &error.to_string())),
        }
    }

    fn put(&self, key: &str, bytes: &[u8], expected: Option<&Revision>) -> ClientResult<Revision> {
        let path = self.path_for(key)?;
        let current = self.current_revision(key, &path)?;
        if current.as_ref() != expected {
            debug!(key, ?current, ?expected, "local revision mismatch");
            return Err(ClientError::store_conflict(key));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| ClientError::store_unavailable(key, &error.to_string()))?;
        }

        let staging = staging_path(&path);
        fs::write(&staging, bytes)
            .map_err(|error| ClientError::store_unavailable(key, &error.to_string()))?;
        if let Err(error) = fs::rename(&staging, &path) {
            let _ = fs::remove_file(&staging);
            return Err(ClientError::store_unavailable(key, &error.to_string()));
        }

        Ok(revision_of(bytes))
    }

    fn delete(&self, key: &str, expected: &Revision) -> ClientResult<()> {
        let path = self.path_for(key)?;
        match self.current_revision(key, &path)? {
            Some(current) if &current == expected => fs::remove_file(&path)
                .map_err(|error| ClientError::store_unavailable(key, &error.to_string())),
            _ => Err(ClientError::store_conflict(key)),
        }
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|value| value.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}
