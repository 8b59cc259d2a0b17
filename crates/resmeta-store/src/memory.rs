//! In-memory store, used for development and tests.

use crate::error::{StoreError, StoreResult};
use crate::query::{self, MetadataQuery};
use crate::store::MetadataStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use resmeta_common::{MetadataPatch, MetadataRecord};

/// Vector-backed store. Insertion order is natural order.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<MetadataRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn find(&self, query: &MetadataQuery) -> StoreResult<Vec<MetadataRecord>> {
        let records = self.records.read();
        Ok(query::execute(records.iter(), query))
    }

    async fn insert(&self, record: MetadataRecord) -> StoreResult<MetadataRecord> {
        let mut records = self.records.write();
        let key = record.key();
        if records.iter().any(|r| r.key() == key) {
            return Err(StoreError::DuplicateKey(key));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn update_fields(
        &self,
        query: &MetadataQuery,
        patch: &MetadataPatch,
    ) -> StoreResult<Vec<MetadataRecord>> {
        let mut records = self.records.write();
        let mut updated = Vec::new();
        for record in records.iter_mut().filter(|r| query.matches(r)) {
            patch.apply(record);
            updated.push(record.clone());
        }
        Ok(updated)
    }

    async fn delete_matching(&self, query: &MetadataQuery) -> StoreResult<usize> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| !query.matches(r));
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resmeta_common::{MetadataKey, RecordOwner, Resource};

    fn key(lang: &str) -> MetadataKey {
        MetadataKey::new("d1", Resource::dataset("d1"), "rw", lang)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_key() {
        let store = MemoryStore::new();
        store
            .insert(MetadataRecord::new(key("en"), RecordOwner::user("u1")))
            .await
            .unwrap();

        let mut again = MetadataRecord::new(key("en"), RecordOwner::user("u2"));
        again.name = Some("different".into());
        let err = store.insert(again).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_query() {
        let store = MemoryStore::new();
        for lang in ["en", "es", "fr"] {
            store
                .insert(MetadataRecord::new(key(lang), RecordOwner::user("u1")))
                .await
                .unwrap();
        }

        let patch = MetadataPatch {
            name: Some("renamed".into()),
            ..Default::default()
        };
        let updated = store
            .update_fields(&MetadataQuery::for_key(&key("es")), &patch)
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].name.as_deref(), Some("renamed"));

        let removed = store
            .delete_matching(&MetadataQuery::for_resource("d1", &Resource::dataset("d1")))
            .await
            .unwrap();
        assert_eq!(removed, 3);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_find_one_returns_first_in_natural_order() {
        let store = MemoryStore::new();
        store
            .insert(MetadataRecord::new(key("en"), RecordOwner::user("u1")))
            .await
            .unwrap();
        store
            .insert(MetadataRecord::new(key("es"), RecordOwner::user("u1")))
            .await
            .unwrap();

        let found = store
            .find_one(&MetadataQuery::for_resource("d1", &Resource::dataset("d1")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.language, "en");
    }
}
