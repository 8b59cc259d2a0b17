//! Authorization engine
//!
//! Decisions run in two phases so that cheap structural checks happen
//! before the request body is validated and before any external call:
//!
//! 1. [`Authorizer::authenticate`]: DELETE scope parameters, the trusted
//!    service account, a known role, and the read-only `USER` role.
//! 2. [`Authorizer::authorize`]: application membership for `MANAGER` and
//!    `ADMIN`, then for a `MANAGER` modifying (not creating) metadata, the
//!    resource owner from the ownership gateway followed by the owner of any
//!    existing record in scope.
//!
//! `SUPERADMIN` passes phase two unconditionally.

use crate::ownership::OwnershipGateway;
use crate::user::{LoggedUser, Role};
use http::Method;
use resmeta_common::{Error, MetadataRecord, RecordOwner, Resource, Result};
use resmeta_store::MetadataStore;
use resmeta_store::query::{MetadataQuery, parse_list, parse_scope};
use std::sync::Arc;
use tracing::{debug, warn};

/// Who is acting, once authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Trusted internal caller
    Service,
    User { user: LoggedUser, role: Role },
}

impl Actor {
    /// Identity recorded as `userId` on records this actor creates
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::Service => crate::user::MICROSERVICE_ID,
            Self::User { user, .. } => &user.id,
        }
    }
}

/// The target of a write
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub method: &'a Method,
    pub dataset: &'a str,
    pub resource: &'a Resource,
    /// From the query string on DELETE, from the body otherwise
    pub application: Option<&'a str>,
    pub language: Option<&'a str>,
}

/// Ownership of an existing record, as far as a modifying `MANAGER` cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOwnership {
    Absent,
    Legacy,
    Owned(String),
}

impl RecordOwnership {
    #[must_use]
    pub fn of(record: Option<&MetadataRecord>) -> Self {
        match record.map(|r| &r.user_id) {
            None => Self::Absent,
            Some(RecordOwner::Legacy) => Self::Legacy,
            Some(RecordOwner::User(id)) => Self::Owned(id.clone()),
        }
    }

    /// Absent and legacy records are open to any manager of the application
    #[must_use]
    pub fn permits(&self, user_id: &str) -> bool {
        match self {
            Self::Absent | Self::Legacy => true,
            Self::Owned(owner) => owner == user_id,
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Role-based authorization over metadata writes
pub struct Authorizer {
    gateway: Arc<dyn OwnershipGateway>,
    store: Arc<dyn MetadataStore>,
    delete_requires_application: bool,
}

impl Authorizer {
    pub fn new(gateway: Arc<dyn OwnershipGateway>, store: Arc<dyn MetadataStore>) -> Self {
        Self {
            gateway,
            store,
            delete_requires_application: false,
        }
    }

    /// Also reject a DELETE without `application` in the query
    #[must_use]
    pub const fn with_delete_requires_application(mut self, required: bool) -> Self {
        self.delete_requires_application = required;
        self
    }

    /// Phase one. `application` and `language` are the query-string values;
    /// on DELETE a value without any code counts as missing.
    pub fn authenticate(
        &self,
        method: &Method,
        application: Option<&str>,
        language: Option<&str>,
        user: Option<&LoggedUser>,
    ) -> Result<Actor> {
        let missing = |value: Option<&str>| value.and_then(parse_list).is_none();
        if *method == Method::DELETE
            && (missing(language) || (self.delete_requires_application && missing(application)))
        {
            return Err(Error::bad_request("Bad request"));
        }

        let Some(user) = user else {
            debug!("Rejecting anonymous {} request", method);
            return Err(Error::Unauthorized);
        };
        if user.is_microservice() {
            return Ok(Actor::Service);
        }
        let Some(role) = user.role() else {
            debug!("Rejecting user {} with role '{}'", user.id, user.role);
            return Err(Error::Unauthorized);
        };
        if role == Role::User {
            return Err(Error::forbidden(format!("user {} has read-only access", user.id)));
        }

        Ok(Actor::User {
            user: user.clone(),
            role,
        })
    }

    /// Phase two
    pub async fn authorize(&self, actor: &Actor, request: &AccessRequest<'_>) -> Result<()> {
        let Actor::User { user, role } = actor else {
            return Ok(());
        };

        if role.is_app_scoped() {
            let member = present(request.application).is_some_and(|app| user.has_app(app));
            if !member {
                return Err(Error::forbidden(format!(
                    "{} {} is not a member of application {:?}",
                    role, user.id, request.application
                )));
            }
        }

        if *role == Role::Manager && request.method != Method::POST {
            self.check_resource_owner(user, request).await?;
            self.check_record_owner(user, request).await?;
        }

        debug!(
            "Authorized {} {} on {} of dataset {}",
            role, user.id, request.resource, request.dataset
        );
        Ok(())
    }

    /// Both phases back to back
    pub async fn evaluate(
        &self,
        user: Option<&LoggedUser>,
        request: &AccessRequest<'_>,
    ) -> Result<Actor> {
        let actor = self.authenticate(
            request.method,
            request.application,
            request.language,
            user,
        )?;
        self.authorize(&actor, request).await?;
        Ok(actor)
    }

    /// Any gateway failure is a denial
    async fn check_resource_owner(&self, user: &LoggedUser, request: &AccessRequest<'_>) -> Result<()> {
        match self
            .gateway
            .get_owner(present(request.application), request.resource)
            .await
        {
            Ok(owner) if owner.is(&user.id) => Ok(()),
            Ok(owner) => Err(Error::forbidden(format!(
                "{} is owned by {:?}, not {}",
                request.resource, owner.user_id, user.id
            ))),
            Err(e) => {
                warn!(
                    "Ownership lookup via {} failed for {}: {}",
                    self.gateway.name(),
                    request.resource,
                    e
                );
                Err(Error::forbidden(e.to_string()))
            }
        }
    }

    async fn check_record_owner(&self, user: &LoggedUser, request: &AccessRequest<'_>) -> Result<()> {
        let mut query = MetadataQuery::for_resource(request.dataset, request.resource);
        query.applications = request.application.and_then(parse_scope);
        query.languages = request.language.and_then(parse_scope);

        let records = self.store.find(&query).await?;
        if records.is_empty() {
            return Ok(());
        }
        for record in &records {
            let ownership = RecordOwnership::of(Some(record));
            if !ownership.permits(&user.id) {
                return Err(Error::forbidden(format!(
                    "record {} belongs to {:?}",
                    record.id, ownership
                )));
            }
        }
        Ok(())
    }
}
