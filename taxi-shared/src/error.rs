/// Storage error type
///
/// Every store backend reports failures through [`StoreError`]. Constraint
/// violations are reported against the form field that caused them so the
/// API layer can surface them as field-level validation messages.

use crate::models::page::PageError;
use uuid::Uuid;

/// Result alias used by every store operation
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// A unique constraint rejected the write
    #[error("{field}: {message}")]
    Conflict { field: &'static str, message: String },

    /// The write referenced a record that does not exist
    #[error("{field}: {message}")]
    InvalidReference { field: &'static str, message: String },

    /// The requested page does not exist
    #[error(transparent)]
    InvalidPage(#[from] PageError),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Shorthand for a missing record
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        StoreError::NotFound { entity, id }
    }

    /// Shorthand for a unique constraint violation on `field`
    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        StoreError::Conflict {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a dangling reference on `field`
    pub fn invalid_reference(field: &'static str, message: impl Into<String>) -> Self {
        StoreError::InvalidReference {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::nil();
        let err = StoreError::not_found("car", id);
        assert_eq!(err.to_string(), format!("car {} not found", id));

        let err = StoreError::conflict("license_number", "Driver with this license number already exists.");
        assert_eq!(
            err.to_string(),
            "license_number: Driver with this license number already exists."
        );
    }
}
