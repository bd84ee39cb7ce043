//! Test database helper: a real `Store` over a throwaway SQLite file.
//!
//! `Store::new` opens a file-backed pool (it runs `PRAGMA` setup that an
//! in-memory connection doesn't survive across pooled connections), so tests
//! get a tempdir-backed path rather than `sqlite::memory:`.

use std::sync::Arc;

use remediator::Store;
use tempfile::TempDir;

pub struct TestDatabase {
    store: Arc<Store>,
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join("remediator-test.db");
        let store = Store::new(path.to_str().unwrap()).await?;
        Ok(Self { store: Arc::new(store), _dir: dir })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_arc(&self) -> Arc<Store> {
        self.store.clone()
    }
}
