//! Axum handlers for the metadata API.
//!
//! Resource routes are generic over a [`ResourcePath`]: the path shape
//! decides once whether a request targets a dataset, a layer or a widget.
//!
//! Writes run in a fixed order: authenticate, validate the body, authorize,
//! then call the service.

use crate::error::ApiError;
use crate::service::MetadataService;
use crate::types::{
    FindByIdsBody, HealthResponse, ListParams, MetadataDocument, ResourceParams,
};
use crate::validation::{ApplicationSchemas, MetadataBody, validate_clone, validate_metadata};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::Method;
use resmeta_auth::{AccessRequest, Actor, Authorizer, LoggedUser};
use resmeta_common::{Environment, Resource, ResourceType};
use resmeta_store::MetadataFilter;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

type Result<T> = std::result::Result<T, ApiError>;

/// Shared state for the metadata handlers.
pub struct ApiState {
    pub service: MetadataService,
    pub authorizer: Authorizer,
    pub schemas: ApplicationSchemas,
    pub environment: Environment,
    pub started: Instant,
}

impl ApiState {
    pub fn new(service: MetadataService, authorizer: Authorizer) -> Self {
        Self {
            service,
            authorizer,
            schemas: ApplicationSchemas::default(),
            environment: Environment::default(),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_schemas(mut self, schemas: ApplicationSchemas) -> Self {
        self.schemas = schemas;
        self
    }

    #[must_use]
    pub const fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Authenticate, validate, authorize
    async fn admit_write(
        &self,
        method: &Method,
        dataset: &str,
        resource: &Resource,
        params: &ResourceParams,
        user: Option<&LoggedUser>,
        body: &Bytes,
    ) -> Result<(Actor, MetadataBody)> {
        let actor = self.authorizer.authenticate(
            method,
            params.application.as_deref(),
            params.language.as_deref(),
            user,
        )?;
        let body = validate_metadata(&parse_body(body)?, &self.schemas)?;
        self.authorizer
            .authorize(
                &actor,
                &AccessRequest {
                    method,
                    dataset,
                    resource,
                    application: Some(body.application.as_str()),
                    language: Some(body.language.as_str()),
                },
            )
            .await?;
        Ok((actor, body))
    }
}

/// Path parameters naming the target resource
pub trait ResourcePath: DeserializeOwned + Send + 'static {
    fn dataset(&self) -> &str;
    fn resource(&self) -> Resource;
}

#[derive(Debug, Deserialize)]
pub struct DatasetPath {
    pub dataset: String,
}

impl ResourcePath for DatasetPath {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    fn resource(&self) -> Resource {
        Resource::dataset(self.dataset.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct LayerPath {
    pub dataset: String,
    pub layer: String,
}

impl ResourcePath for LayerPath {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    fn resource(&self) -> Resource {
        Resource::layer(self.layer.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct WidgetPath {
    pub dataset: String,
    pub widget: String,
}

impl ResourcePath for WidgetPath {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    fn resource(&self) -> Resource {
        Resource::widget(self.widget.as_str())
    }
}

/// An empty body reads as `{}`
fn parse_body(body: &Bytes) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

fn user_of(user: Option<&Extension<LoggedUser>>) -> Option<&LoggedUser> {
    user.map(|Extension(user)| user)
}

pub async fn get_metadata<P: ResourcePath>(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<P>,
    Query(params): Query<ResourceParams>,
) -> Result<Json<MetadataDocument>> {
    let records = state
        .service
        .get(path.dataset(), &path.resource(), &params.filter()?)
        .await?;
    Ok(Json(records.into()))
}

pub async fn create_metadata<P: ResourcePath>(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<P>,
    Query(params): Query<ResourceParams>,
    user: Option<Extension<LoggedUser>>,
    body: Bytes,
) -> Result<Json<MetadataDocument>> {
    let resource = path.resource();
    let (actor, body) = state
        .admit_write(
            &Method::POST,
            path.dataset(),
            &resource,
            &params,
            user_of(user.as_ref()),
            &body,
        )
        .await?;
    let record = state
        .service
        .create(actor.user_id(), path.dataset(), &resource, &body)
        .await?;
    Ok(Json(record.into()))
}

pub async fn update_metadata<P: ResourcePath>(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<P>,
    Query(params): Query<ResourceParams>,
    user: Option<Extension<LoggedUser>>,
    body: Bytes,
) -> Result<Json<MetadataDocument>> {
    let resource = path.resource();
    let (_, body) = state
        .admit_write(
            &Method::PATCH,
            path.dataset(),
            &resource,
            &params,
            user_of(user.as_ref()),
            &body,
        )
        .await?;
    let record = state.service.update(path.dataset(), &resource, &body).await?;
    Ok(Json(record.into()))
}

pub async fn delete_metadata<P: ResourcePath>(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<P>,
    Query(params): Query<ResourceParams>,
    user: Option<Extension<LoggedUser>>,
) -> Result<Json<MetadataDocument>> {
    let resource = path.resource();
    state
        .authorizer
        .evaluate(
            user_of(user.as_ref()),
            &AccessRequest {
                method: &Method::DELETE,
                dataset: path.dataset(),
                resource: &resource,
                application: params.application.as_deref(),
                language: params.language.as_deref(),
            },
        )
        .await?;

    let filter = MetadataFilter::from_params(
        params.application.as_deref(),
        params.language.as_deref(),
        None,
        None,
        None,
    )?;
    let record = state.service.delete(path.dataset(), &resource, &filter).await?;
    Ok(Json(record.into()))
}

pub async fn clone_metadata(
    State(state): State<Arc<ApiState>>,
    Path(path): Path<DatasetPath>,
    Query(params): Query<ResourceParams>,
    user: Option<Extension<LoggedUser>>,
    body: Bytes,
) -> Result<Json<MetadataDocument>> {
    let resource = path.resource();
    let actor = state.authorizer.authenticate(
        &Method::POST,
        params.application.as_deref(),
        params.language.as_deref(),
        user_of(user.as_ref()),
    )?;
    let body = parse_body(&body)?;
    let new_dataset = validate_clone(&body)?;

    let application = params
        .application
        .as_deref()
        .or_else(|| body.get("application").and_then(Value::as_str));
    state
        .authorizer
        .authorize(
            &actor,
            &AccessRequest {
                method: &Method::POST,
                dataset: &path.dataset,
                resource: &resource,
                application,
                language: None,
            },
        )
        .await?;

    let records = state
        .service
        .clone_metadata(actor.user_id(), &path.dataset, &resource, &new_dataset)
        .await?;
    Ok(Json(records.into()))
}

/// `GET /metadata`; an unknown `type` matches nothing
pub async fn list_metadata(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<MetadataDocument>> {
    let filter = params.filter()?;
    let resource_type = match params
        .resource_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        None => None,
        Some(name) => match name.parse::<ResourceType>() {
            Ok(resource_type) => Some(resource_type),
            Err(e) => {
                debug!("Listing metadata: {}", e);
                return Ok(Json(MetadataDocument { data: Vec::new() }));
            }
        },
    };

    let records = state.service.get_all(resource_type, &filter).await?;
    Ok(Json(records.into()))
}

/// `find-by-ids` / `get-by-ids`; the resource type comes from the route
pub async fn find_by_ids(
    state: Arc<ApiState>,
    resource_type: ResourceType,
    params: ResourceParams,
    body: Bytes,
) -> Result<Json<MetadataDocument>> {
    let body: FindByIdsBody = serde_json::from_value(parse_body(&body)?)
        .map_err(|e| ApiError::bad_request(format!("Invalid body: {e}")))?;
    let Some(ids) = body.ids else {
        return Err(ApiError::bad_request(
            "Bad request - Missing 'ids' from request body",
        ));
    };

    let filter = MetadataFilter::from_params(
        params.application.as_deref(),
        params.language.as_deref(),
        None,
        None,
        None,
    )?;
    let records = state
        .service
        .get_by_ids(ids.into_vec(), resource_type, &filter)
        .await?;
    Ok(Json(records.into()))
}

pub async fn healthcheck(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        uptime: state.started.elapsed().as_secs(),
    })
}
