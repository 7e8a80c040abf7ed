//! Error types for the warden system.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type WardenResult<T> = Result<T, WardenError>;

/// Parse a caller-supplied identifier, rejecting blank or malformed input
/// before any storage call is made.
pub fn parse_id(field: &str, raw: &str) -> WardenResult<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WardenError::validation(format!("{field} is required")));
    }
    Uuid::parse_str(raw)
        .map_err(|e| WardenError::validation(format!("{field} is not a valid id: {e}")))
}
