//! Persistent metadata store backed by redb.
//!
//! Records are stored as JSON keyed by their time-ordered id, so a table
//! scan yields natural order. A second table maps each uniqueness key to the
//! record holding it; `insert` checks and writes both in one transaction.

use crate::error::{StoreError, StoreResult};
use crate::query::{self, MetadataQuery};
use crate::store::MetadataStore;
use crate::tables;
use async_trait::async_trait;
use redb::{Database, ReadableTable};
use resmeta_common::{MetadataPatch, MetadataRecord};
use std::path::Path;
use tracing::{debug, error};

/// Persistent metadata store backed by redb.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create all tables eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::METADATA)?;
            let _t = write_txn.open_table(tables::METADATA_KEYS)?;
        }
        write_txn.commit()?;

        debug!("Opened metadata store at {}", path.display());
        Ok(Self { db })
    }

    fn load_all(&self) -> StoreResult<Vec<MetadataRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::METADATA)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            // Unreadable records are skipped on reads and fail writes
            if let Ok(record) = decode(key.value(), value.value()) {
                result.push(record);
            }
        }
        Ok(result)
    }
}

fn decode(id: &str, bytes: &[u8]) -> StoreResult<MetadataRecord> {
    serde_json::from_slice(bytes).map_err(|e| {
        error!("Failed to decode metadata record '{}': {}", id, e);
        StoreError::Json(e)
    })
}

#[async_trait]
impl MetadataStore for RedbStore {
    async fn find(&self, query: &MetadataQuery) -> StoreResult<Vec<MetadataRecord>> {
        let records = self.load_all()?;
        Ok(query::execute(records.iter(), query))
    }

    async fn insert(&self, record: MetadataRecord) -> StoreResult<MetadataRecord> {
        let key = record.key();
        let index_key = key.index_key();
        let id = record.id.to_string();
        let bytes = serde_json::to_vec(&record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut keys = write_txn.open_table(tables::METADATA_KEYS)?;
            if keys.get(index_key.as_str())?.is_some() {
                return Err(StoreError::DuplicateKey(key));
            }
            keys.insert(index_key.as_str(), id.as_str())?;

            let mut records = write_txn.open_table(tables::METADATA)?;
            records.insert(id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(record)
    }

    async fn update_fields(
        &self,
        query: &MetadataQuery,
        patch: &MetadataPatch,
    ) -> StoreResult<Vec<MetadataRecord>> {
        let write_txn = self.db.begin_write()?;
        let mut updated = Vec::new();
        {
            let mut table = write_txn.open_table(tables::METADATA)?;

            // Collect first, then write back
            let mut matching = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let record = decode(key.value(), value.value())?;
                if query.matches(&record) {
                    matching.push(record);
                }
            }

            for mut record in matching {
                patch.apply(&mut record);
                let bytes = serde_json::to_vec(&record)?;
                table.insert(record.id.to_string().as_str(), bytes.as_slice())?;
                updated.push(record);
            }
        }
        write_txn.commit()?;
        Ok(updated)
    }

    async fn delete_matching(&self, query: &MetadataQuery) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(tables::METADATA)?;
            let mut keys = write_txn.open_table(tables::METADATA_KEYS)?;

            let mut doomed = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let record = decode(key.value(), value.value())?;
                if query.matches(&record) {
                    doomed.push((record.id.to_string(), record.key().index_key()));
                }
            }

            for (id, index_key) in &doomed {
                table.remove(id.as_str())?;
                keys.remove(index_key.as_str())?;
            }
            doomed.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
