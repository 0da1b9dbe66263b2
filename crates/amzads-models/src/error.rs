//! Model validation errors.

use thiserror::Error;

use crate::tier::OperationTier;

/// Result type for model construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while constructing or validating models.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown region: {0} (expected NA, EU or FE)")]
    UnknownRegion(String),

    #[error("Missing credential field: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid profile id: {0}")]
    InvalidProfileId(String),

    #[error("Invalid endpoint URL {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Operation {id} registered twice with conflicting tiers ({existing} vs {conflicting})")]
    ConflictingTier {
        id: String,
        existing: OperationTier,
        conflicting: OperationTier,
    },

    #[error("Operation {id} registered twice with different endpoints ({existing} vs {conflicting})")]
    ConflictingOperation {
        id: String,
        existing: String,
        conflicting: String,
    },
}
