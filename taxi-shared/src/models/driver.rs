/// Driver model
///
/// Drivers are also the service's user accounts: they log in with their
/// username and password, and can assign themselves to cars.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE drivers (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     email VARCHAR(254),
///     license_number VARCHAR(8) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT drivers_username_key UNIQUE (username),
///     CONSTRAINT drivers_license_number_key UNIQUE (license_number)
/// );
/// ```

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use super::car::CarWithManufacturer;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A driver account
///
/// The password hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Driver {
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,

    /// Unique license number, `AAA99999`
    pub license_number: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    /// Canonical URL of the driver's detail page
    pub fn absolute_url(&self) -> String {
        format!("/drivers/{}/", self.id)
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.username, self.first_name, self.last_name)
    }
}

/// Driver as shown in listings and on car pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DriverSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub license_number: String,
}

impl From<&Driver> for DriverSummary {
    fn from(driver: &Driver) -> Self {
        Self {
            id: driver.id,
            username: driver.username.clone(),
            first_name: driver.first_name.clone(),
            last_name: driver.last_name.clone(),
            license_number: driver.license_number.clone(),
        }
    }
}

/// Driver detail: the driver with every assigned car and its manufacturer
#[derive(Debug, Clone, Serialize)]
pub struct DriverDetail {
    #[serde(flatten)]
    pub driver: Driver,

    pub cars: Vec<CarWithManufacturer>,
}

/// Store input for a new driver, password already hashed
#[derive(Debug, Clone)]
pub struct NewDriver {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub license_number: String,
}

/// Registration form
///
/// `password1` and `password2` must match; the password is hashed by the
/// caller once the form validates.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DriverRegistration {
    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Username must be between 1 and 150 characters"))]
    pub username: String,

    #[serde(default)]
    pub password1: String,

    #[serde(default)]
    pub password2: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: String,

    /// Optional; blank is the same as absent
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_license_number"))]
    pub license_number: String,
}

impl DriverRegistration {
    /// Validates every field, including the password rules
    ///
    /// # Errors
    ///
    /// Returns all field errors at once.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let Err(message) = validate_password(&self.password1) {
            errors.add("password1", field_error("password_invalid", message));
        }
        if let Err(error) = validate_optional_email(self.email.as_deref()) {
            errors.add("email", error);
        }
        if self.password1 != self.password2 {
            errors.add(
                "password2",
                field_error("password_mismatch", "The two password fields didn't match."),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Converts a validated form into store input
    pub fn into_new_driver(self, password_hash: String) -> NewDriver {
        NewDriver {
            username: self.username.trim().to_string(),
            password_hash,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            license_number: self.license_number,
        }
    }
}

/// License number update form, the only editable driver field
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LicenseForm {
    #[serde(default)]
    #[validate(custom(function = "validate_license_number"))]
    pub license_number: String,
}

fn license_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z]{3}[0-9]{5}$").expect("license number pattern is valid")
    })
}

fn field_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Checks that a license number is three uppercase letters followed by five digits
///
/// # Example
///
/// ```
/// use taxi_shared::models::driver::validate_license_number;
///
/// assert!(validate_license_number("ABC12345").is_ok());
/// assert!(validate_license_number("ab123").is_err());
/// ```
pub fn validate_license_number(value: &str) -> Result<(), ValidationError> {
    if value.len() != 8 {
        return Err(field_error(
            "license_length",
            "License number should consist of 8 characters",
        ));
    }
    if !license_pattern().is_match(value) {
        return Err(field_error(
            "license_format",
            "License number should be 3 uppercase letters followed by 5 digits",
        ));
    }
    Ok(())
}

/// Checks an optional email address; missing or blank input passes
pub fn validate_optional_email(value: Option<&str>) -> Result<(), ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(email) if email.to_string().validate_email() => Ok(()),
        Some(_) => Err(field_error("email", "Enter a valid email address")),
    }
}

/// Checks a password against the registration rules
///
/// Rules:
/// - At least 8 characters
/// - Not entirely numeric
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("This password is entirely numeric.".to_string());
    }
    Ok(())
}
