use std::path::{Path, PathBuf};
use std::sync::Arc;

use moka::sync::Cache;
use tracing::debug;

use crate::ledger::loader::{LoadedTable, load_dir};

/// Data directories kept in memory at once.
const DEFAULT_CAPACITY: u64 = 8;

/// Loader output keyed by data directory.
///
/// The caller owns the cache and decides when it goes stale; nothing here
/// watches the file system. Call [`LedgerCache::invalidate_all`] after any
/// change to the data files.
#[derive(Clone)]
pub struct LedgerCache {
    tables: Cache<PathBuf, Arc<LoadedTable>>,
}

impl LedgerCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            tables: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub fn get_or_load(&self, dir: &Path) -> Arc<LoadedTable> {
        let key = dir.to_path_buf();
        if let Some(table) = self.tables.get(&key) {
            debug!(dir = %dir.display(), "ledger cache hit");
            return table;
        }

        debug!(dir = %dir.display(), "ledger cache miss; loading data files");
        let table = Arc::new(load_dir(dir));
        self.tables.insert(key, Arc::clone(&table));
        table
    }

    pub fn invalidate(&self, dir: &Path) {
        self.tables.invalidate(&dir.to_path_buf());
    }

    pub fn invalidate_all(&self) {
        self.tables.invalidate_all();
    }
}

impl Default for LedgerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LedgerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerCache")
            .field("entries", &self.tables.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use super::LedgerCache;

    const BODY: &str = "nomeEntidade;valorEmpenhadoBruto\nACME;10,00\n";

    #[test]
    fn serves_cached_table_until_invalidated() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok());
        let Ok(dir) = dir else {
            return;
        };
        assert!(fs::write(dir.path().join("2024_empenhos.csv"), BODY).is_ok());

        let cache = LedgerCache::new();
        let first = cache.get_or_load(dir.path());
        assert_eq!(first.transaction_rows(), 1);

        assert!(fs::write(dir.path().join("2023_empenhos.csv"), BODY).is_ok());
        let stale = cache.get_or_load(dir.path());
        assert!(Arc::ptr_eq(&first, &stale));
        assert_eq!(stale.transaction_rows(), 1);

        cache.invalidate_all();
        let fresh = cache.get_or_load(dir.path());
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(fresh.transaction_rows(), 2);
    }

    #[test]
    fn clones_share_entries() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok());
        let Ok(dir) = dir else {
            return;
        };
        let cache = LedgerCache::new();
        let other = cache.clone();
        let first = cache.get_or_load(dir.path());
        let second = other.get_or_load(dir.path());
        assert!(Arc::ptr_eq(&first, &second));

        other.invalidate(dir.path());
        let third = cache.get_or_load(dir.path());
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
