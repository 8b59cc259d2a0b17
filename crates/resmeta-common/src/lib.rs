//! Resource Metadata Common - Shared types and utilities
//!
//! This crate provides the metadata data model, the error taxonomy and the
//! configuration structures used across all service components.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, Environment, StoreBackend};
pub use error::{Error, FieldError, Result, ValidationReport};
pub use types::*;
