//! Resmeta server - metadata service for datasets, layers and widgets
//!
//! Wires the store, the identity resolver, the ownership gateway and the
//! authorization engine into the HTTP API.

mod settings;

use anyhow::{Context, Result, anyhow};
use axum::extract::DefaultBodyLimit;
use clap::Parser;
use resmeta_api::handlers::ApiState;
use resmeta_api::{MetadataService, router};
use resmeta_auth::{
    Authorizer, HttpOwnershipGateway, HttpUserResolver, StaticUserResolver, UserResolver,
};
use resmeta_common::config::{IdentityConfig, LoggingConfig, StoreConfig};
use resmeta_common::StoreBackend;
use resmeta_store::{MemoryStore, MetadataStore, RedbStore};
use settings::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Open the configured store, retrying the redb file a bounded number of times
async fn open_store(config: &StoreConfig) -> Result<Arc<dyn MetadataStore>> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; metadata is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redb => {
            let mut attempt = 0;
            loop {
                attempt += 1;
                match RedbStore::open(&config.path) {
                    Ok(store) => {
                        info!("Opened metadata store at {}", config.path.display());
                        return Ok(Arc::new(store));
                    }
                    Err(e) if attempt <= config.open_retries => {
                        warn!(
                            "Failed to open {} (attempt {}/{}): {}",
                            config.path.display(),
                            attempt,
                            config.open_retries + 1,
                            e
                        );
                        tokio::time::sleep(config.retry_backoff()).await;
                    }
                    Err(e) => {
                        return Err(anyhow!(
                            "failed to open metadata store at {}: {}",
                            config.path.display(),
                            e
                        ));
                    }
                }
            }
        }
    }
}

fn identity_resolver(config: &IdentityConfig) -> Result<Arc<dyn UserResolver>> {
    if let Some(url) = &config.url {
        info!("Resolving callers via {}{}", url, config.path);
        let resolver =
            HttpUserResolver::new(url, &config.path, config.timeout_ms.map(Duration::from_millis))
                .context("failed to build identity client")?;
        Ok(Arc::new(resolver))
    } else {
        warn!("No identity service configured; every caller is anonymous");
        Ok(Arc::new(StaticUserResolver::new()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = settings::load(&args)?;

    init_logging(&config.logging);
    info!("Starting resmeta server");
    info!("Resource registry: {}", config.gateway.url);

    let store = open_store(&config.store).await?;
    let gateway = HttpOwnershipGateway::new(config.gateway.clone())
        .context("failed to build resource registry client")?;
    let resolver = identity_resolver(&config.identity)?;

    let authorizer = Authorizer::new(Arc::new(gateway), store.clone())
        .with_delete_requires_application(config.authorization.delete_requires_application);
    let state = ApiState::new(MetadataService::new(store), authorizer)
        .with_environment(config.server.environment);

    let app = router(Arc::new(state), resolver)
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config
        .server
        .listen
        .parse()
        .map_err(|e| anyhow!("Invalid listen address {}: {}", config.server.listen, e))?;

    info!(
        "Listening on {} ({:?})",
        addr, config.server.environment
    );
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    info!("Resmeta server shut down gracefully");
    Ok(())
}
