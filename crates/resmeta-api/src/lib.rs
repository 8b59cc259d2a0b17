//! HTTP API for the resource metadata service.
//!
//! Serves metadata of datasets, layers and widgets under `/api/v1`, plus an
//! uptime probe at `/healthcheck`. Callers are identified by the identity
//! middleware; every write then goes through the authorization engine.

pub mod error;
pub mod handlers;
pub mod identity;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::middleware;
use axum::routing::{MethodRouter, get, post};
use handlers::{ApiState, DatasetPath, LayerPath, ResourcePath, WidgetPath};
use resmeta_auth::UserResolver;
use resmeta_common::ResourceType;
use std::sync::Arc;
use types::ResourceParams;

pub use error::ApiError;
pub use service::MetadataService;
pub use validation::{ApplicationSchema, ApplicationSchemas};

fn resource_routes<P: ResourcePath>() -> MethodRouter<Arc<ApiState>> {
    get(handlers::get_metadata::<P>)
        .post(handlers::create_metadata::<P>)
        .patch(handlers::update_metadata::<P>)
        .delete(handlers::delete_metadata::<P>)
}

fn find_by_ids_route(resource_type: ResourceType) -> MethodRouter<Arc<ApiState>> {
    post(
        move |State(state): State<Arc<ApiState>>,
              Query(params): Query<ResourceParams>,
              body: Bytes| async move {
            handlers::find_by_ids(state, resource_type, params, body).await
        },
    )
}

fn metadata_routes() -> Router<Arc<ApiState>> {
    let mut router = Router::new()
        .route("/metadata", get(handlers::list_metadata))
        .route("/dataset/{dataset}/metadata", resource_routes::<DatasetPath>())
        .route(
            "/dataset/{dataset}/metadata/clone",
            post(handlers::clone_metadata),
        )
        .route(
            "/dataset/{dataset}/layer/{layer}/metadata",
            resource_routes::<LayerPath>(),
        )
        .route(
            "/dataset/{dataset}/widget/{widget}/metadata",
            resource_routes::<WidgetPath>(),
        );

    for action in ["find-by-ids", "get-by-ids"] {
        router = router
            .route(
                &format!("/dataset/metadata/{action}"),
                find_by_ids_route(ResourceType::Dataset),
            )
            .route(
                &format!("/dataset/{{dataset}}/layer/metadata/{action}"),
                find_by_ids_route(ResourceType::Layer),
            )
            .route(
                &format!("/dataset/{{dataset}}/widget/metadata/{action}"),
                find_by_ids_route(ResourceType::Widget),
            );
    }
    router
}

/// Build the API router.
///
/// In production, 500 responses carry a generic detail.
pub fn router(state: Arc<ApiState>, resolver: Arc<dyn UserResolver>) -> Router {
    let production = state.environment.is_production();

    let router = Router::new()
        .nest("/api/v1", metadata_routes())
        .route("/healthcheck", get(handlers::healthcheck))
        .layer(middleware::from_fn_with_state(
            resolver,
            identity::identity_layer,
        ))
        .with_state(state);

    if production {
        router.layer(middleware::map_response(error::mask_internal_errors))
    } else {
        router
    }
}
