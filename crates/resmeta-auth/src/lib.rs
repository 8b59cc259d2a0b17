//! Resource Metadata Authentication and Authorization
//!
//! This crate provides:
//! - The logged-user model and role set
//! - Pluggable identity resolution (HTTP identity service, static tokens)
//! - The resource ownership gateway (HTTP resource registry)
//! - The authorization engine combining roles, application membership,
//!   resource ownership and record ownership
//!
//! # Example
//!
//! ```rust,ignore
//! use resmeta_auth::{Authorizer, HttpOwnershipGateway};
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(HttpOwnershipGateway::new(config.gateway.clone())?);
//! let authorizer = Authorizer::new(gateway, store.clone());
//!
//! // Phase one needs only the method, query scope and caller
//! let actor = authorizer.authenticate(&method, application, language, user)?;
//! // Phase two runs once the target application is known
//! authorizer.authorize(&actor, &request).await?;
//! ```

pub mod authorize;
pub mod ownership;
pub mod provider;
pub mod user;

pub use authorize::{AccessRequest, Actor, Authorizer, RecordOwnership};
pub use ownership::{
    HttpOwnershipGateway, OwnershipError, OwnershipGateway, ResourceOwner,
    StaticOwnershipGateway,
};
pub use provider::{
    AuthProviderError, HttpUserResolver, StaticUserResolver, UserResolver, bearer_token,
};
pub use user::{ExtraUserData, LoggedUser, MICROSERVICE_ID, Role};
