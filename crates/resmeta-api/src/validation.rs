//! Validation of metadata write bodies
//!
//! Checks are a fixed, ordered list of named rules. Every rule runs and all
//! failures accumulate into one [`ValidationReport`]. Once a body passes it
//! is normalized into a [`MetadataBody`].

use chrono::Utc;
use resmeta_common::{
    Error, FieldError, MetadataPatch, MetadataRecord, MetadataStatus, Result, ValidationReport,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::info;

type Check = fn(&'static str, Option<&Value>) -> std::result::Result<(), FieldError>;

const RULES: [(&str, Check); 12] = [
    ("language", required_code),
    ("application", required_ascii_code),
    ("name", optional_string),
    ("description", optional_string),
    ("source", optional_string),
    ("citation", optional_string),
    ("license", optional_string),
    ("units", optional_object),
    ("info", optional_object),
    ("columns", optional_object),
    ("applicationProperties", optional_object),
    ("status", optional_status),
];

/// `null` counts as absent
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn required_code(field: &'static str, value: Option<&Value>) -> std::result::Result<(), FieldError> {
    match present(value) {
        None => Err(FieldError::new(field, format!("{field} can not be empty."))),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(FieldError::new(field, format!("{field} can not be empty.")))
        }
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(FieldError::new(field, format!("{field} check failed."))),
    }
}

fn required_ascii_code(
    field: &'static str,
    value: Option<&Value>,
) -> std::result::Result<(), FieldError> {
    required_code(field, value)?;
    match present(value) {
        Some(Value::String(s)) if !s.is_ascii() => {
            Err(FieldError::new(field, format!("{field} check failed.")))
        }
        _ => Ok(()),
    }
}

fn optional_string(field: &'static str, value: Option<&Value>) -> std::result::Result<(), FieldError> {
    match present(value) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(FieldError::new(field, "should be a valid string")),
    }
}

fn optional_object(field: &'static str, value: Option<&Value>) -> std::result::Result<(), FieldError> {
    match present(value) {
        None | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(FieldError::new(field, "should be a valid object")),
    }
}

fn optional_status(field: &'static str, value: Option<&Value>) -> std::result::Result<(), FieldError> {
    match present(value) {
        None => Ok(()),
        Some(Value::String(s)) if s.parse::<MetadataStatus>().is_ok() => Ok(()),
        Some(_) => Err(FieldError::new(field, "should be published or unpublished")),
    }
}

/// Declared type of a required `applicationProperties` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
}

impl FieldType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
        }
    }

    const fn message(self) -> &'static str {
        match self {
            Self::String => "should be a valid string",
        }
    }
}

/// Required `applicationProperties` fields of one application
#[derive(Debug, Clone, Default)]
pub struct ApplicationSchema {
    fields: Vec<(String, FieldType)>,
}

impl ApplicationSchema {
    /// Schema where every listed field is a required string
    pub fn strings<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|f| (f.into(), FieldType::String))
                .collect(),
        }
    }

    fn check(&self, properties: &Map<String, Value>, report: &mut ValidationReport) {
        for (name, field_type) in &self.fields {
            let field = format!("applicationProperties.{name}");
            match present(properties.get(name)) {
                None => report.push(FieldError::new(field, "is required")),
                Some(value) if !field_type.accepts(value) => {
                    report.push(FieldError::new(field, field_type.message()));
                }
                Some(_) => {}
            }
        }
    }
}

const FOREST_ATLAS_FIELDS: [&str; 17] = [
    "agol_id",
    "agol_link",
    "amazon_link",
    "sql_api",
    "carto_link",
    "map_service",
    "download_data",
    "cautions",
    "date_of_content",
    "frequency_of_updates",
    "function",
    "geographic_coverage",
    "learn_more",
    "other",
    "resolution",
    "subtitle",
    "tags",
];

/// Registry of application-specific `applicationProperties` schemas
#[derive(Debug, Clone)]
pub struct ApplicationSchemas {
    schemas: HashMap<String, ApplicationSchema>,
}

impl Default for ApplicationSchemas {
    fn default() -> Self {
        Self::empty().with_schema("forest-atlas", ApplicationSchema::strings(FOREST_ATLAS_FIELDS))
    }
}

impl ApplicationSchemas {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, application: impl Into<String>, schema: ApplicationSchema) -> Self {
        self.schemas.insert(application.into(), schema);
        self
    }

    #[must_use]
    pub fn get(&self, application: &str) -> Option<&ApplicationSchema> {
        self.schemas.get(application)
    }
}

/// A validated, normalized create/update body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataBody {
    pub application: String,
    pub language: String,
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
}

impl MetadataBody {
    /// Fields explicitly present in the body, stamped with `updatedAt = now`
    #[must_use]
    pub fn to_patch(&self) -> MetadataPatch {
        MetadataPatch {
            updated_at: Some(Utc::now()),
            ..self.fields()
        }
    }

    /// Copy the body's fields onto a freshly created record
    pub fn fill(&self, record: &mut MetadataRecord) {
        self.fields().apply(record);
    }

    fn fields(&self) -> MetadataPatch {
        MetadataPatch {
            name: self.name.clone(),
            description: self.description.clone(),
            source: self.source.clone(),
            citation: self.citation.clone(),
            license: self.license.clone(),
            units: self.units.clone(),
            info: self.info.clone(),
            columns: self.columns.clone(),
            application_properties: self.application_properties.clone(),
            status: self.status,
            updated_at: None,
        }
    }
}

fn code(object: &Map<String, Value>, field: &str) -> String {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default()
}

fn text(object: &Map<String, Value>, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

fn structured(object: &Map<String, Value>, field: &str) -> Option<Value> {
    present(object.get(field)).cloned()
}

/// Validate a create/update body and normalize it
pub fn validate_metadata(body: &Value, schemas: &ApplicationSchemas) -> Result<MetadataBody> {
    let empty = Map::new();
    let object = body.as_object().unwrap_or(&empty);

    let mut report = ValidationReport::new();
    for (field, check) in RULES {
        if let Err(e) = check(field, object.get(field)) {
            report.push(e);
        }
    }

    let application = code(object, "application");
    if let Some(schema) = schemas.get(&application)
        && let Some(Value::Object(properties)) = object.get("applicationProperties")
    {
        schema.check(properties, &mut report);
    }

    if !report.is_empty() {
        info!("Metadata body rejected: {}", report);
        return Err(Error::Validation(report));
    }

    Ok(MetadataBody {
        application,
        language: code(object, "language"),
        name: text(object, "name"),
        description: text(object, "description"),
        source: text(object, "source"),
        citation: text(object, "citation"),
        license: text(object, "license"),
        units: structured(object, "units"),
        info: structured(object, "info"),
        columns: structured(object, "columns"),
        application_properties: structured(object, "applicationProperties"),
        status: object
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
    })
}

/// Validate a clone body, returning the normalized `newDataset`
pub fn validate_clone(body: &Value) -> Result<String> {
    let new_dataset = body.get("newDataset");
    let mut report = ValidationReport::new();
    if let Err(e) = required_code("newDataset", new_dataset) {
        report.push(e);
    }
    report.into_result()?;

    Ok(new_dataset
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(body: &Value) -> String {
        validate_metadata(body, &ApplicationSchemas::default())
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_valid_body_is_normalized() {
        let body = validate_metadata(
            &json!({
                "application": " RW ",
                "language": "EN",
                "name": "  Tree cover ",
                "description": "",
                "units": {"area": "ha"},
                "status": "unpublished"
            }),
            &ApplicationSchemas::default(),
        )
        .unwrap();

        assert_eq!(body.application, "rw");
        assert_eq!(body.language, "en");
        assert_eq!(body.name.as_deref(), Some("Tree cover"));
        assert_eq!(body.description.as_deref(), Some(""));
        assert_eq!(body.source, None);
        assert_eq!(body.status, Some(MetadataStatus::Unpublished));
    }

    #[test]
    fn test_missing_codes() {
        assert_eq!(
            detail(&json!({})),
            "- language: language can not be empty. - application: application can not be empty. - "
        );
        assert_eq!(
            detail(&json!({"application": "rw", "language": "  "})),
            "- language: language can not be empty. - "
        );
    }

    #[test]
    fn test_wrong_types() {
        assert_eq!(
            detail(&json!({"application": "rw", "language": 123})),
            "- language: language check failed. - "
        );
        assert_eq!(
            detail(&json!({"application": {}, "language": "en"})),
            "- application: application check failed. - "
        );
        assert_eq!(
            detail(&json!({"application": "rwé", "language": "en"})),
            "- application: application check failed. - "
        );
        for field in ["name", "description", "source", "citation", "license"] {
            let mut body = json!({"application": "rw", "language": "en"});
            body[field] = json!(123);
            assert_eq!(detail(&body), format!("- {field}: should be a valid string - "));
        }
        for field in ["units", "info", "columns", "applicationProperties"] {
            let mut body = json!({"application": "rw", "language": "en"});
            body[field] = json!([]);
            assert_eq!(detail(&body), format!("- {field}: should be a valid object - "));
        }
        assert_eq!(
            detail(&json!({"application": "rw", "language": "en", "status": "draft"})),
            "- status: should be published or unpublished - "
        );
    }

    #[test]
    fn test_errors_accumulate() {
        let detail = detail(&json!({"language": 1, "name": 2, "units": "x"}));
        assert!(detail.contains("language: language check failed."));
        assert!(detail.contains("application: application can not be empty."));
        assert!(detail.contains("name: should be a valid string"));
        assert!(detail.contains("units: should be a valid object"));
    }

    #[test]
    fn test_null_is_absent() {
        let body = validate_metadata(
            &json!({"application": "rw", "language": "en", "name": null, "units": null}),
            &ApplicationSchemas::default(),
        )
        .unwrap();
        assert_eq!(body.name, None);
        assert_eq!(body.units, None);
    }

    #[test]
    fn test_application_schema() {
        let schemas = ApplicationSchemas::empty().with_schema(
            "forest-atlas",
            ApplicationSchema::strings(["subtitle", "tags"]),
        );
        let err = validate_metadata(
            &json!({
                "application": "forest-atlas",
                "language": "en",
                "applicationProperties": {"subtitle": 3}
            }),
            &schemas,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "- applicationProperties.subtitle: should be a valid string - applicationProperties.tags: is required - "
        );

        // Other applications are unconstrained
        validate_metadata(
            &json!({"application": "rw", "language": "en", "applicationProperties": {}}),
            &schemas,
        )
        .unwrap();

        // No properties, nothing to check
        validate_metadata(
            &json!({"application": "forest-atlas", "language": "en"}),
            &schemas,
        )
        .unwrap();
    }

    #[test]
    fn test_builtin_forest_atlas_schema() {
        let properties: Map<String, Value> = FOREST_ATLAS_FIELDS
            .iter()
            .map(|f| ((*f).to_string(), json!("x")))
            .collect();
        validate_metadata(
            &json!({
                "application": "Forest-Atlas",
                "language": "en",
                "applicationProperties": properties
            }),
            &ApplicationSchemas::default(),
        )
        .unwrap();
    }

    #[test]
    fn test_patch_keeps_explicit_empty() {
        let body = validate_metadata(
            &json!({"application": "rw", "language": "en", "description": ""}),
            &ApplicationSchemas::default(),
        )
        .unwrap();
        let patch = body.to_patch();
        assert_eq!(patch.description.as_deref(), Some(""));
        assert_eq!(patch.name, None);
        assert!(patch.updated_at.is_some());
    }

    #[test]
    fn test_validate_clone() {
        assert_eq!(validate_clone(&json!({"newDataset": " ABC "})).unwrap(), "abc");
        assert_eq!(
            validate_clone(&json!({})).unwrap_err().to_string(),
            "- newDataset: newDataset can not be empty. - "
        );
        assert_eq!(validate_clone(&json!({"newDataset": 5})).unwrap_err().http_status_code(), 400);
    }
}
