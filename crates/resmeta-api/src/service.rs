//! Metadata service
//!
//! Orchestrates reads and writes over a [`MetadataStore`], enforcing the
//! uniqueness invariant on create and existence on update, delete and clone.

use crate::validation::MetadataBody;
use resmeta_common::{
    Error, MetadataKey, MetadataRecord, RecordOwner, Resource, ResourceType, Result,
};
use resmeta_store::{MetadataFilter, MetadataQuery, MetadataStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info};

fn missing(resource: &Resource) -> Error {
    Error::not_found(format!("Metadata of resource {resource} doesn't exist"))
}

pub struct MetadataService {
    store: Arc<dyn MetadataStore>,
}

impl MetadataService {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Records of one resource, narrowed by `filter`
    pub async fn get(
        &self,
        dataset: &str,
        resource: &Resource,
        filter: &MetadataFilter,
    ) -> Result<Vec<MetadataRecord>> {
        debug!("Getting metadata of {} in dataset {}", resource, dataset);
        let query = MetadataQuery::for_resource(dataset, resource).with_filter(filter);
        Ok(self.store.find(&query).await?)
    }

    pub async fn create(
        &self,
        user_id: &str,
        dataset: &str,
        resource: &Resource,
        body: &MetadataBody,
    ) -> Result<MetadataRecord> {
        let key = MetadataKey::new(
            dataset,
            resource.clone(),
            body.application.as_str(),
            body.language.as_str(),
        );
        info!("Creating metadata of {}", key);

        let mut record = MetadataRecord::new(key, RecordOwner::user(user_id));
        body.fill(&mut record);
        self.insert_unique(record).await
    }

    /// Insert after an explicit duplicate check; the store re-checks on insert
    async fn insert_unique(&self, record: MetadataRecord) -> Result<MetadataRecord> {
        let key = record.key();
        if self.store.find_one(&MetadataQuery::for_key(&key)).await?.is_some() {
            return Err(StoreError::DuplicateKey(key).into());
        }
        Ok(self.store.insert(record).await?)
    }

    /// Overwrite the fields explicitly present in `body`
    pub async fn update(
        &self,
        dataset: &str,
        resource: &Resource,
        body: &MetadataBody,
    ) -> Result<MetadataRecord> {
        let key = MetadataKey::new(
            dataset,
            resource.clone(),
            body.application.as_str(),
            body.language.as_str(),
        );
        info!("Updating metadata of {}", key);

        let query = MetadataQuery::for_key(&key);
        if self.store.find_one(&query).await?.is_none() {
            return Err(missing(resource));
        }
        self.store
            .update_fields(&query, &body.to_patch())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| missing(resource))
    }

    /// Remove every record of the resource matching `filter`, returning the
    /// first one removed
    pub async fn delete(
        &self,
        dataset: &str,
        resource: &Resource,
        filter: &MetadataFilter,
    ) -> Result<MetadataRecord> {
        info!("Deleting metadata of {} in dataset {}", resource, dataset);
        let query = MetadataQuery::for_resource(dataset, resource)
            .with_filter(filter)
            .with_limit(None);

        let Some(found) = self.store.find_one(&query).await? else {
            return Err(missing(resource));
        };
        let removed = self.store.delete_matching(&query).await?;
        debug!("Deleted {} metadata records of {}", removed, resource);
        Ok(found)
    }

    /// Records across every dataset
    pub async fn get_all(
        &self,
        resource_type: Option<ResourceType>,
        filter: &MetadataFilter,
    ) -> Result<Vec<MetadataRecord>> {
        debug!("Getting all metadata of type {:?}", resource_type);
        let query = MetadataQuery::all().of_type(resource_type).with_filter(filter);
        Ok(self.store.find(&query).await?)
    }

    pub async fn get_by_ids(
        &self,
        ids: Vec<String>,
        resource_type: ResourceType,
        filter: &MetadataFilter,
    ) -> Result<Vec<MetadataRecord>> {
        debug!("Getting {} metadata by {} ids", resource_type, ids.len());
        let query = MetadataQuery::for_resource_ids(ids, resource_type).with_filter(filter);
        Ok(self.store.find(&query).await?)
    }

    /// Copy every record of `resource` into `new_dataset`, owned by `user_id`.
    ///
    /// Records are created one by one; a duplicate aborts the clone and the
    /// copies made so far stay.
    pub async fn clone_metadata(
        &self,
        user_id: &str,
        dataset: &str,
        resource: &Resource,
        new_dataset: &str,
    ) -> Result<Vec<MetadataRecord>> {
        info!("Cloning metadata of {} into dataset {}", resource, new_dataset);
        let sources = self
            .store
            .find(&MetadataQuery::for_resource(dataset, resource))
            .await?;
        if sources.is_empty() {
            return Err(Error::not_found(format!("No metadata of resource {resource}")));
        }

        let target = Resource::new(resource.resource_type, rebase(resource, dataset, new_dataset));
        for source in sources {
            let key = MetadataKey::new(
                new_dataset,
                target.clone(),
                source.application.as_str(),
                source.language.as_str(),
            );
            let record = copy_fields(&source, MetadataRecord::new(key, RecordOwner::user(user_id)));
            self.insert_unique(record).await?;
        }

        self.get(new_dataset, &target, &MetadataFilter::default()).await
    }
}

/// The dataset describing itself moves with the clone; layers and widgets
/// keep their ids
fn rebase(resource: &Resource, dataset: &str, new_dataset: &str) -> String {
    if resource.resource_type == ResourceType::Dataset && resource.id == dataset {
        new_dataset.to_string()
    } else {
        resource.id.clone()
    }
}

fn copy_fields(source: &MetadataRecord, fresh: MetadataRecord) -> MetadataRecord {
    MetadataRecord {
        name: source.name.clone(),
        description: source.description.clone(),
        source: source.source.clone(),
        citation: source.citation.clone(),
        license: source.license.clone(),
        units: source.units.clone(),
        info: source.info.clone(),
        columns: source.columns.clone(),
        application_properties: source.application_properties.clone(),
        status: source.status,
        ..fresh
    }
}
