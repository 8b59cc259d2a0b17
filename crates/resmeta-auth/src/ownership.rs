//! Resource ownership gateway
//!
//! The resource registry is authoritative for whether a dataset, layer or
//! widget exists and who owns it. Lookups are a single best-effort call per
//! authorization decision, with no retry.

use async_trait::async_trait;
use resmeta_common::Resource;
use resmeta_common::config::GatewayConfig;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Owner of a resource as reported by the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOwner {
    pub user_id: Option<String>,
}

impl ResourceOwner {
    #[must_use]
    pub fn is(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// Error from ownership resolution
#[derive(Debug, thiserror::Error)]
pub enum OwnershipError {
    #[error("Resource {0} doesn't exist")]
    ResourceNotFound(Resource),
    #[error("Resource registry unavailable: {0}")]
    Unavailable(String),
    #[error("Timeout")]
    Timeout,
    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Trait for resource owner lookups
#[async_trait]
pub trait OwnershipGateway: Send + Sync {
    /// Gateway name for logging
    fn name(&self) -> &str;

    /// Resolve the owner of `resource` as seen by `application`
    async fn get_owner(
        &self,
        application: Option<&str>,
        resource: &Resource,
    ) -> Result<ResourceOwner, OwnershipError>;
}

/// Unwrap a JSON-API envelope (`data` object, or first element of a `data`
/// array) into its attribute map.
#[must_use]
pub fn deserialize_attributes(body: Value) -> Option<Map<String, Value>> {
    let data = match body {
        Value::Object(mut envelope) => envelope.remove("data")?,
        _ => return None,
    };
    let item = match data {
        Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    match item {
        Value::Object(mut object) => match object.remove("attributes") {
            Some(Value::Object(attributes)) => Some(attributes),
            _ => None,
        },
        _ => None,
    }
}

/// Ownership gateway calling `GET {url}/{type}/{id}?application=...`
pub struct HttpOwnershipGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl HttpOwnershipGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, OwnershipError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let http_client = builder
            .build()
            .map_err(|e| OwnershipError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn resource_url(&self, resource: &Resource) -> String {
        format!(
            "{}/{}/{}",
            self.config.url.trim_end_matches('/'),
            resource.resource_type,
            resource.id
        )
    }
}

#[async_trait]
impl OwnershipGateway for HttpOwnershipGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn get_owner(
        &self,
        application: Option<&str>,
        resource: &Resource,
    ) -> Result<ResourceOwner, OwnershipError> {
        let url = self.resource_url(resource);
        debug!("Resolving owner of {} via {}", resource, url);

        let mut request = self.http_client.get(&url);
        if let Some(application) = application {
            request = request.query(&[("application", application)]);
        }
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                OwnershipError::Timeout
            } else {
                OwnershipError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OwnershipError::ResourceNotFound(resource.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OwnershipError::Unavailable(format!(
                "resource registry returned status {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| OwnershipError::InvalidResponse(e.to_string()))?;
        let attributes = deserialize_attributes(body)
            .ok_or_else(|| OwnershipError::ResourceNotFound(resource.clone()))?;

        Ok(ResourceOwner {
            user_id: attributes
                .get("userId")
                .and_then(Value::as_str)
                .map(String::from),
        })
    }
}

/// Fixed ownership table, for development and tests.
///
/// Resources not in the table resolve to `ResourceNotFound`.
#[derive(Default)]
pub struct StaticOwnershipGateway {
    owners: HashMap<Resource, String>,
}

impl StaticOwnershipGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_owner(mut self, resource: Resource, user_id: impl Into<String>) -> Self {
        self.owners.insert(resource, user_id.into());
        self
    }
}

#[async_trait]
impl OwnershipGateway for StaticOwnershipGateway {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_owner(
        &self,
        _application: Option<&str>,
        resource: &Resource,
    ) -> Result<ResourceOwner, OwnershipError> {
        self.owners
            .get(resource)
            .map(|owner| ResourceOwner {
                user_id: Some(owner.clone()),
            })
            .ok_or_else(|| OwnershipError::ResourceNotFound(resource.clone()))
    }
}
