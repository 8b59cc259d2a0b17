//! Pluggable identity resolution
//!
//! A resolver turns the bearer token of a request into the [`LoggedUser`]
//! the authorization engine works with. The HTTP resolver asks the identity
//! service; the static resolver serves a fixed token table.

use crate::user::LoggedUser;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Identity resolution errors
#[derive(Debug, thiserror::Error)]
pub enum AuthProviderError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Extract the token from an `Authorization: Bearer <token>` value
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Trait for pluggable identity resolvers
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Resolver name for logging
    fn name(&self) -> &str;

    /// Resolve a bearer token to the user it belongs to
    async fn resolve(&self, token: &str) -> Result<LoggedUser, AuthProviderError>;
}

/// Resolves tokens through the identity service's "current user" endpoint
pub struct HttpUserResolver {
    url: String,
    http_client: reqwest::Client,
}

impl HttpUserResolver {
    /// `base_url` + `path` is called with the token forwarded as a bearer credential
    pub fn new(
        base_url: &str,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, AuthProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| AuthProviderError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            http_client,
        })
    }
}

#[async_trait]
impl UserResolver for HttpUserResolver {
    fn name(&self) -> &str {
        "http"
    }

    async fn resolve(&self, token: &str) -> Result<LoggedUser, AuthProviderError> {
        let response = self
            .http_client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthProviderError::Timeout
                } else {
                    AuthProviderError::ProviderUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthProviderError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthProviderError::ProviderUnavailable(format!(
                "identity service returned status {status}"
            )));
        }

        response
            .json::<LoggedUser>()
            .await
            .map_err(|e| AuthProviderError::Internal(e.to_string()))
    }
}

/// Fixed token table, for development and tests
#[derive(Default)]
pub struct StaticUserResolver {
    users: HashMap<String, LoggedUser>,
}

impl StaticUserResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user` under `token`
    #[must_use]
    pub fn with_user(mut self, token: impl Into<String>, user: LoggedUser) -> Self {
        self.users.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl UserResolver for StaticUserResolver {
    fn name(&self) -> &str {
        "static"
    }

    async fn resolve(&self, token: &str) -> Result<LoggedUser, AuthProviderError> {
        self.users
            .get(token)
            .cloned()
            .ok_or(AuthProviderError::InvalidCredentials)
    }
}
