//! Core type definitions for the metadata service
//!
//! This module defines the metadata record, the resource it describes and
//! the small value types (identifiers, ownership, status) built around it.

use chrono::{DateTime, Utc};
use derive_more::{From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sentinel `userId` for records migrated before ownership was tracked.
pub const LEGACY_USER_ID: &str = "legacy";

/// Unique identifier for a metadata record
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct MetadataId(Uuid);

impl MetadataId {
    /// Generate a new time-ordered ID (creation order == key order)
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MetadataId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetadataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetadataId({})", self.0)
    }
}

impl fmt::Display for MetadataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of entity a metadata record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Dataset,
    Layer,
    Widget,
}

impl ResourceType {
    /// All resource types, in routing order
    pub const ALL: [Self; 3] = [Self::Dataset, Self::Layer, Self::Widget];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Layer => "layer",
            Self::Widget => "widget",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown resource type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type: {0}")]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dataset" => Ok(Self::Dataset),
            "layer" => Ok(Self::Layer),
            "widget" => Ok(Self::Widget),
            other => Err(UnknownResourceType(other.to_string())),
        }
    }
}

/// The exact entity (dataset, layer or widget) a record describes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

impl Resource {
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type,
        }
    }

    /// A dataset describing itself (`resource.id == dataset`)
    pub fn dataset(id: impl Into<String>) -> Self {
        Self::new(ResourceType::Dataset, id)
    }

    pub fn layer(id: impl Into<String>) -> Self {
        Self::new(ResourceType::Layer, id)
    }

    pub fn widget(id: impl Into<String>) -> Self {
        Self::new(ResourceType::Widget, id)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource_type, self.id)
    }
}

/// Publication status of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataStatus {
    #[default]
    Published,
    Unpublished,
}

impl MetadataStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Unpublished => "unpublished",
        }
    }
}

impl FromStr for MetadataStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(Self::Published),
            "unpublished" => Ok(Self::Unpublished),
            _ => Err(()),
        }
    }
}

/// Who created a stored record.
///
/// Serialized as the plain `userId` string, with `"legacy"` mapping to
/// [`RecordOwner::Legacy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordOwner {
    User(String),
    Legacy,
}

impl RecordOwner {
    pub fn user(id: impl Into<String>) -> Self {
        Self::from(id.into())
    }

    /// Whether `user_id` may modify a record with this owner
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        match self {
            Self::User(id) => id == user_id,
            Self::Legacy => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User(id) => id,
            Self::Legacy => LEGACY_USER_ID,
        }
    }
}

impl From<String> for RecordOwner {
    fn from(id: String) -> Self {
        if id == LEGACY_USER_ID {
            Self::Legacy
        } else {
            Self::User(id)
        }
    }
}

impl From<RecordOwner> for String {
    fn from(owner: RecordOwner) -> Self {
        match owner {
            RecordOwner::User(id) => id,
            RecordOwner::Legacy => LEGACY_USER_ID.to_string(),
        }
    }
}

/// Uniqueness key: at most one record per
/// `(dataset, resource.id, resource.type, application, language)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    pub dataset: String,
    pub resource: Resource,
    pub application: String,
    pub language: String,
}

impl MetadataKey {
    pub fn new(
        dataset: impl Into<String>,
        resource: Resource,
        application: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            resource,
            application: application.into(),
            language: language.into(),
        }
    }

    /// Flat string form used as a unique-index key by persistent stores.
    /// Components are separated by U+001F, which never appears in ids.
    #[must_use]
    pub fn index_key(&self) -> String {
        format!(
            "{}\x1F{}\x1F{}\x1F{}\x1F{}",
            self.dataset, self.resource.resource_type, self.resource.id, self.application, self.language
        )
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resource {}, application: {} and language: {}",
            self.resource, self.application, self.language
        )
    }
}

/// A descriptive record attached to a dataset, layer or widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub id: MetadataId,
    pub dataset: String,
    pub application: String,
    pub resource: Resource,
    pub language: String,
    pub user_id: RecordOwner,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_properties: Option<Value>,
    #[serde(default)]
    pub status: MetadataStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetadataRecord {
    /// Create an empty record for `key`, stamped now
    #[must_use]
    pub fn new(key: MetadataKey, owner: RecordOwner) -> Self {
        let now = Utc::now();
        Self {
            id: MetadataId::new(),
            dataset: key.dataset,
            application: key.application,
            resource: key.resource,
            language: key.language,
            user_id: owner,
            name: None,
            description: None,
            source: None,
            citation: None,
            license: None,
            units: None,
            info: None,
            columns: None,
            application_properties: None,
            status: MetadataStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The uniqueness key of this record
    #[must_use]
    pub fn key(&self) -> MetadataKey {
        MetadataKey {
            dataset: self.dataset.clone(),
            resource: self.resource.clone(),
            application: self.application.clone(),
            language: self.language.clone(),
        }
    }
}

/// Partial update of the mutable fields of a record.
///
/// `Some` means "explicitly present in the request" and always overwrites,
/// including `Some(String::new())`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub citation: Option<String>,
    pub license: Option<String>,
    pub units: Option<Value>,
    pub info: Option<Value>,
    pub columns: Option<Value>,
    pub application_properties: Option<Value>,
    pub status: Option<MetadataStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MetadataPatch {
    /// Apply the present fields onto `record`
    pub fn apply(&self, record: &mut MetadataRecord) {
        fn set<T: Clone>(target: &mut Option<T>, value: Option<&T>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }

        set(&mut record.name, self.name.as_ref());
        set(&mut record.description, self.description.as_ref());
        set(&mut record.source, self.source.as_ref());
        set(&mut record.citation, self.citation.as_ref());
        set(&mut record.license, self.license.as_ref());
        set(&mut record.units, self.units.as_ref());
        set(&mut record.info, self.info.as_ref());
        set(&mut record.columns, self.columns.as_ref());
        set(
            &mut record.application_properties,
            self.application_properties.as_ref(),
        );
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(updated_at) = self.updated_at {
            record.updated_at = updated_at;
        }
    }
}
