//! Logged-user model and roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of trusted internal callers; bypasses every role check
pub const MICROSERVICE_ID: &str = "microservice";

/// Roles that may reach the write endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Manager,
    Admin,
    Superadmin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
            Self::Superadmin => "SUPERADMIN",
        }
    }

    /// Whether this role is bound to the applications listed on the user
    #[must_use]
    pub const fn is_app_scoped(self) -> bool {
        matches!(self, Self::Manager | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "MANAGER" => Ok(Self::Manager),
            "ADMIN" => Ok(Self::Admin),
            "SUPERADMIN" => Ok(Self::Superadmin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraUserData {
    #[serde(default)]
    pub apps: Vec<String>,
}

/// The caller as reported by the identity service.
///
/// `role` stays a raw string: an unknown role must reach the authorization
/// engine (and yield 401) rather than fail deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedUser {
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub extra_user_data: ExtraUserData,
}

impl LoggedUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role: role.as_str().to_string(),
            email: None,
            provider: None,
            extra_user_data: ExtraUserData::default(),
        }
    }

    /// The internal service account
    #[must_use]
    pub fn microservice() -> Self {
        Self {
            id: MICROSERVICE_ID.to_string(),
            role: String::new(),
            email: None,
            provider: None,
            extra_user_data: ExtraUserData::default(),
        }
    }

    /// Set the applications this user may manage
    #[must_use]
    pub fn with_apps<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_user_data.apps = apps.into_iter().map(Into::into).collect();
        self
    }

    /// Parsed role, `None` if unknown
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    #[must_use]
    pub fn is_microservice(&self) -> bool {
        self.id == MICROSERVICE_ID
    }

    #[must_use]
    pub fn has_app(&self, application: &str) -> bool {
        self.extra_user_data.apps.iter().any(|a| a == application)
    }
}
