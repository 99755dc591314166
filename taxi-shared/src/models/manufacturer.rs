/// Manufacturer model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE manufacturers (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     country VARCHAR(255) NOT NULL,
///     CONSTRAINT manufacturers_name_key UNIQUE (name)
/// );
/// ```
///
/// Deleting a manufacturer cascades to its cars.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// A car manufacturer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Manufacturer {
    pub id: Uuid,

    /// Unique manufacturer name
    pub name: String,

    pub country: String,
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.country)
    }
}

/// Create/update form for a manufacturer
///
/// Missing fields deserialize as empty strings so they are reported as
/// field errors rather than body rejections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ManufacturerForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Country must be between 1 and 255 characters"))]
    pub country: String,
}

impl ManufacturerForm {
    /// Returns the form with surrounding whitespace removed
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let manufacturer = Manufacturer {
            id: Uuid::new_v4(),
            name: "KIA".to_string(),
            country: "South Korea".to_string(),
        };
        assert_eq!(manufacturer.to_string(), "KIA South Korea");
    }

    #[test]
    fn test_form_requires_name() {
        let form = ManufacturerForm {
            name: "   ".to_string(),
            country: "Japan".to_string(),
        }
        .normalized();

        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(!errors.field_errors().contains_key("country"));
    }
}
