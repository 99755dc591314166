/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`; the error converts itself into the
/// matching HTTP response. Store constraint violations surface as field
/// errors so clients can show them next to the offending input.
///
/// # Example
///
/// ```
/// use taxi_api::error::{ApiError, ApiResult};
///
/// fn parse_id(raw: &str) -> ApiResult<uuid::Uuid> {
///     raw.parse()
///         .map_err(|_| ApiError::NotFound(format!("No record matches {}", raw)))
/// }
///
/// assert!(parse_id("nope").is_err());
/// ```

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taxi_shared::auth::{jwt::JwtError, password::PasswordError};
use taxi_shared::store::StoreError;
use url::form_urlencoded;

/// Where unauthenticated browsers are sent
pub const LOGIN_URL: &str = "/accounts/login/";

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad credentials or token (401)
    Unauthorized(String),

    /// Not logged in (302 to the login page, keeping the requested path)
    AuthenticationRequired { next: String },

    /// Not found (404)
    NotFound(String),

    /// Unprocessable entity (422) - field errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found", "validation_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single field error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.into(),
            message: message.into(),
        }])
    }

    /// Login page URL carrying `next`, percent-encoded as one query value
    pub fn login_location(next: &str) -> String {
        let next: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
        format!("{}?next={}", LOGIN_URL, next)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::AuthenticationRequired { next } => {
                write!(f, "Authentication required for {}", next)
            }
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::AuthenticationRequired { next } => {
                return (
                    StatusCode::FOUND,
                    [(header::LOCATION, ApiError::login_location(&next))],
                )
                    .into_response();
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Logged here, never sent to the client
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Conflict { field, message }
            | StoreError::InvalidReference { field, message } => ApiError::field(field, message),
            StoreError::InvalidPage(page) => ApiError::NotFound(format!("Invalid page: {}", page)),
            StoreError::Database(db) => ApiError::InternalError(format!("Database error: {}", db)),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Invalid(_) => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::InternalError(format!("Session error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display() {
        let err = ApiError::Unauthorized("Token expired".to_string());
        assert_eq!(err.to_string(), "Unauthorized: Token expired");

        let err = ApiError::NotFound("car not found".to_string());
        assert_eq!(err.to_string(), "Not found: car not found");
    }

    #[test]
    fn test_store_conflict_becomes_field_error() {
        let err: ApiError = StoreError::conflict("license_number", "taken").into();
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details[0].field, "license_number");
                assert_eq!(details[0].message, "taken");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_store_not_found() {
        let err: ApiError = StoreError::not_found("car", Uuid::nil()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_authentication_required_redirects() {
        let response = ApiError::AuthenticationRequired {
            next: "/cars/".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/accounts/login/?next=%2Fcars%2F"
        );
    }

    #[test]
    fn test_login_location_keeps_whole_query() {
        assert_eq!(
            ApiError::login_location("/cars/?model=a&page=2"),
            "/accounts/login/?next=%2Fcars%2F%3Fmodel%3Da%26page%3D2"
        );
    }

    #[test]
    fn test_validation_status() {
        let response = ApiError::field("drivers", "Select at least one driver").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
