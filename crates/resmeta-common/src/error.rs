//! Error types for the metadata service
//!
//! This module defines the error taxonomy shared by the store, the
//! authorization engine and the HTTP layer.

use std::fmt;
use thiserror::Error;

/// Common result type for metadata operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Accumulated validation failures for one payload.
///
/// Displays as `- field: message - field2: message2 - `.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was reported, otherwise the report as an error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("- ")?;
        for error in &self.errors {
            write!(f, "{}: {} - ", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Common error type for the metadata service
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(ValidationReport),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// The reason is kept for logging; clients only see `Forbidden`.
    #[error("Forbidden")]
    Forbidden { reason: String },

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidSortParameter(String),

    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get the HTTP status code this error maps to
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::BadRequest(_)
            | Self::Duplicate(_)
            | Self::InvalidSortParameter(_) => 400,
            Self::Unauthorized => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound(_) => 404,
            Self::Store(_) => 500,
        }
    }
}
