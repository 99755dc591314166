/// Car model and the driver assignment relation
///
/// # Schema
///
/// ```sql
/// CREATE TABLE cars (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     model VARCHAR(255) NOT NULL,
///     manufacturer_id UUID NOT NULL REFERENCES manufacturers (id) ON DELETE CASCADE
/// );
///
/// CREATE TABLE cars_drivers (
///     car_id UUID NOT NULL REFERENCES cars (id) ON DELETE CASCADE,
///     driver_id UUID NOT NULL REFERENCES drivers (id) ON DELETE CASCADE,
///     PRIMARY KEY (car_id, driver_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::driver::DriverSummary;
use super::manufacturer::Manufacturer;

/// A car owned by exactly one manufacturer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Car {
    pub id: Uuid,
    pub model: String,
    pub manufacturer_id: Uuid,
}

impl fmt::Display for Car {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.model)
    }
}

/// A car together with its manufacturer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarWithManufacturer {
    pub id: Uuid,
    pub model: String,
    pub manufacturer: Manufacturer,
}

/// Car detail: the car, its manufacturer and its drivers
#[derive(Debug, Clone, Serialize)]
pub struct CarDetail {
    pub id: Uuid,
    pub model: String,
    pub manufacturer: Manufacturer,
    pub drivers: Vec<DriverSummary>,
}

/// Create/update form for a car
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CarForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Model must be between 1 and 255 characters"))]
    pub model: String,

    #[serde(default)]
    #[validate(required(message = "Select a manufacturer"))]
    pub manufacturer: Option<Uuid>,

    #[serde(default)]
    #[validate(length(min = 1, message = "Select at least one driver"))]
    pub drivers: Vec<Uuid>,
}

/// Validated store input for a car
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarData {
    pub model: String,
    pub manufacturer_id: Uuid,

    /// Assigned drivers, deduplicated, never empty
    pub driver_ids: Vec<Uuid>,
}

impl TryFrom<CarForm> for CarData {
    type Error = ValidationErrors;

    fn try_from(form: CarForm) -> Result<Self, Self::Error> {
        let form = CarForm {
            model: form.model.trim().to_string(),
            ..form
        };
        form.validate()?;

        let mut driver_ids = form.drivers;
        driver_ids.sort();
        driver_ids.dedup();

        match form.manufacturer {
            Some(manufacturer_id) => Ok(Self {
                model: form.model,
                manufacturer_id,
                driver_ids,
            }),
            // `required` above already rejects a missing manufacturer
            None => Err(ValidationErrors::new()),
        }
    }
}

/// Assignment state of a (driver, car) pair after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentState {
    Assigned,
    Unassigned,
}

impl AssignmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentState::Assigned => "assigned",
            AssignmentState::Unassigned => "unassigned",
        }
    }
}
