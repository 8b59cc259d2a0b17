//! Request and response shapes.

use resmeta_common::{MetadataId, MetadataRecord, Resource, Result};
use resmeta_store::MetadataFilter;
use serde::{Deserialize, Serialize};

/// Query of the per-resource endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ResourceParams {
    pub application: Option<String>,
    pub language: Option<String>,
    pub limit: Option<String>,
}

impl ResourceParams {
    pub fn filter(&self) -> Result<MetadataFilter> {
        MetadataFilter::from_params(
            self.application.as_deref(),
            self.language.as_deref(),
            None,
            None,
            self.limit.as_deref(),
        )
    }
}

/// Query of `GET /metadata`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub application: Option<String>,
    pub language: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl ListParams {
    pub fn filter(&self) -> Result<MetadataFilter> {
        MetadataFilter::from_params(
            self.application.as_deref(),
            self.language.as_deref(),
            self.search.as_deref(),
            self.sort.as_deref(),
            self.limit.as_deref(),
        )
    }
}

/// `ids` as a JSON array or a comma-separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResourceIds {
    List(Vec<String>),
    Joined(String),
}

impl ResourceIds {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        let ids = match self {
            Self::List(ids) => ids,
            Self::Joined(joined) => joined.split(',').map(String::from).collect(),
        };
        ids.into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FindByIdsBody {
    pub ids: Option<ResourceIds>,
}

/// One record in the JSON-API envelope
#[derive(Debug, Clone, Serialize)]
pub struct MetadataResource {
    pub id: MetadataId,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: MetadataAttributes,
}

/// Record fields without the id
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataAttributes {
    pub dataset: String,
    pub application: String,
    pub resource: Resource,
    pub language: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_properties: Option<serde_json::Value>,
    pub status: &'static str,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<MetadataRecord> for MetadataResource {
    fn from(record: MetadataRecord) -> Self {
        Self {
            id: record.id,
            kind: "metadata",
            attributes: MetadataAttributes {
                user_id: record.user_id.as_str().to_string(),
                status: record.status.as_str(),
                dataset: record.dataset,
                application: record.application,
                resource: record.resource,
                language: record.language,
                name: record.name,
                description: record.description,
                source: record.source,
                citation: record.citation,
                license: record.license,
                units: record.units,
                info: record.info,
                columns: record.columns,
                application_properties: record.application_properties,
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
        }
    }
}

/// `{"data": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct MetadataDocument {
    pub data: Vec<MetadataResource>,
}

impl From<Vec<MetadataRecord>> for MetadataDocument {
    fn from(records: Vec<MetadataRecord>) -> Self {
        Self {
            data: records.into_iter().map(MetadataResource::from).collect(),
        }
    }
}

impl From<MetadataRecord> for MetadataDocument {
    fn from(record: MetadataRecord) -> Self {
        Self::from(vec![record])
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub uptime: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use resmeta_common::{MetadataKey, RecordOwner};
    use serde_json::json;

    #[test]
    fn test_ids_forms() {
        let ids: FindByIdsBody = serde_json::from_value(json!({"ids": "a, b,,c "})).unwrap();
        assert_eq!(ids.ids.unwrap().into_vec(), vec!["a", "b", "c"]);

        let ids: FindByIdsBody = serde_json::from_value(json!({"ids": ["a", " b "]})).unwrap();
        assert_eq!(ids.ids.unwrap().into_vec(), vec!["a", "b"]);

        let ids: FindByIdsBody = serde_json::from_value(json!({})).unwrap();
        assert!(ids.ids.is_none());
    }

    #[test]
    fn test_document_shape() {
        let mut record = MetadataRecord::new(
            MetadataKey::new("d1", Resource::dataset("d1"), "rw", "en"),
            RecordOwner::Legacy,
        );
        record.name = Some("Foo".into());
        let id = record.id;

        let value = serde_json::to_value(MetadataDocument::from(record)).unwrap();
        let item = &value["data"][0];
        assert_eq!(item["id"], json!(id.to_string()));
        assert_eq!(item["type"], "metadata");
        assert_eq!(item["attributes"]["userId"], "legacy");
        assert_eq!(item["attributes"]["status"], "published");
        assert_eq!(item["attributes"]["resource"], json!({"id": "d1", "type": "dataset"}));
        assert!(item["attributes"].get("description").is_none());
        assert!(item["attributes"].get("id").is_none());
    }
}
