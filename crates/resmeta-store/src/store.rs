//! The store abstraction the service layer talks to.

use crate::error::StoreResult;
use crate::query::MetadataQuery;
use async_trait::async_trait;
use resmeta_common::{MetadataPatch, MetadataRecord};

/// Persistence for metadata records.
///
/// Implementations must enforce the uniqueness key on [`insert`] and return
/// matches in natural (creation) order unless the query sorts.
///
/// [`insert`]: MetadataStore::insert
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// All records matching `query`, sorted and limited as it requests
    async fn find(&self, query: &MetadataQuery) -> StoreResult<Vec<MetadataRecord>>;

    /// First record matching `query`
    async fn find_one(&self, query: &MetadataQuery) -> StoreResult<Option<MetadataRecord>> {
        let query = query.clone().with_limit(Some(1));
        Ok(self.find(&query).await?.into_iter().next())
    }

    /// Insert a new record; fails with `DuplicateKey` if its key is taken
    async fn insert(&self, record: MetadataRecord) -> StoreResult<MetadataRecord>;

    /// Apply `patch` to every record matching `query`; returns the updated records
    async fn update_fields(
        &self,
        query: &MetadataQuery,
        patch: &MetadataPatch,
    ) -> StoreResult<Vec<MetadataRecord>>;

    /// Remove every record matching `query`; returns how many were removed
    async fn delete_matching(&self, query: &MetadataQuery) -> StoreResult<usize>;
}
