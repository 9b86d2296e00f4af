//! # DomainError
//!
//! Centralized error handling for the forum core.
//! Stores and services share one taxonomy so the consuming layer can map
//! failures to responses without knowing which adapter produced them.

use thiserror::Error;

/// The primary error type for all forum operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed payload or unique-constraint violation (e.g., duplicate category slug)
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (e.g., Category, Post, Reply)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Access tier, lock or ownership check failed
    #[error("unauthorized: {0}")]
    Authorization(String),

    /// Underlying database or connection failure. Never retried by the core.
    #[error("store error: {0}")]
    TransientStore(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::TransientStore(msg.into())
    }

    /// True when the caller, not the infrastructure, is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::TransientStore(_))
    }

    /// HTTP status a consuming layer should answer with.
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::NotFound { .. } => 404,
            Self::Authorization(_) => 403,
            Self::TransientStore(_) => 503,
        }
    }
}

/// A specialized Result type for forum logic.
pub type Result<T> = std::result::Result<T, DomainError>;
