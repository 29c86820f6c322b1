pub mod local;
pub mod remote;

use std::fmt;
use std::path::{Component, Path};

use serde::Serialize;

use crate::config::{Settings, StoreSettings};
use crate::{ClientError, ClientResult};

/// Opaque version token for one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub bytes: Vec<u8>,
    pub revision: Revision,
}

/// Key-value document storage with optimistic concurrency.
///
/// Keys are relative slash-separated paths such as `data/usuarios.json`.
pub trait DocumentStore {
    fn get(&self, key: &str) -> ClientResult<Option<StoredDocument>>;

    /// Writes `bytes` under `key`.
    ///
    /// `expected` is the revision the caller read; `None` means the key must
    /// not exist yet. Any mismatch fails with `store_conflict`.
    fn put(&self, key: &str, bytes: &[u8], expected: Option<&Revision>) -> ClientResult<Revision>;

    fn delete(&self, key: &str, expected: &Revision) -> ClientResult<()>;

    /// Short backend name for logs and command output.
    fn backend(&self) -> &'static str;
}

pub fn open_store(settings: &Settings) -> ClientResult<Box<dyn DocumentStore>> {
    match &settings.store {
        StoreSettings::Local => Ok(Box::new(local::LocalStore::new(&settings.home))),
        StoreSettings::Remote(remote) => Ok(Box::new(remote::RemoteStore::new(remote.clone())?)),
    }
}

/// Rejects keys that are empty, absolute or climb out of the store root.
pub(crate) fn validate_key(key: &str) -> ClientResult<()> {
    let path = Path::new(key);
    let well_formed = !key.trim().is_empty()
        && !key.contains('\\')
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if well_formed {
        Ok(())
    } else {
        Err(ClientError::invalid_argument(&format!(
            "Document key `{key}` must be a relative path without `..`."
        )))
    }
}
