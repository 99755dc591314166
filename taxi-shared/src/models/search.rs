/// Search forms for the record listings
///
/// Each listing accepts one optional search field. The raw form is validated
/// first; an absent, blank or invalid value produces an empty filter, which
/// means "no filtering" rather than "match nothing".
///
/// # Example
///
/// ```
/// use taxi_shared::models::search::CarSearch;
///
/// let search = CarSearch { model: Some("corolla".to_string()) };
/// let filter = search.filter();
/// assert!(filter.model.unwrap().matches("Toyota Corolla"));
///
/// let blank = CarSearch { model: Some("   ".to_string()) };
/// assert!(blank.filter().model.is_none());
/// ```

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Longest accepted search string
pub const MAX_SEARCH_LENGTH: u64 = 255;

/// A validated, non-empty, case-insensitive substring search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Builds a term from raw input, trimming surrounding whitespace
    ///
    /// Returns `None` for missing or blank input.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The term as typed (trimmed)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring match
    pub fn matches(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.0.to_lowercase())
    }

    /// `ILIKE` pattern matching the term anywhere in a column
    ///
    /// `%`, `_` and the escape character itself match literally.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.0.len() + 2);
        pattern.push('%');
        for c in self.0.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

/// Filter over manufacturers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManufacturerFilter {
    pub name: Option<SearchTerm>,
}

/// Filter over cars
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarFilter {
    pub model: Option<SearchTerm>,
}

/// Filter over drivers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverFilter {
    pub username: Option<SearchTerm>,
}

/// Manufacturer search form (`?name=`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ManufacturerSearch {
    #[validate(length(max = 255, message = "Ensure this value has at most 255 characters"))]
    pub name: Option<String>,
}

/// Car search form (`?model=`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CarSearch {
    #[validate(length(max = 255, message = "Ensure this value has at most 255 characters"))]
    pub model: Option<String>,
}

/// Driver search form (`?username=`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DriverSearch {
    #[validate(length(max = 255, message = "Ensure this value has at most 255 characters"))]
    pub username: Option<String>,
}

impl ManufacturerSearch {
    /// Converts the form into a storage filter, ignoring invalid input
    pub fn filter(&self) -> ManufacturerFilter {
        if self.validate().is_err() {
            return ManufacturerFilter::default();
        }
        ManufacturerFilter {
            name: SearchTerm::parse(self.name.as_deref()),
        }
    }
}

impl CarSearch {
    /// Converts the form into a storage filter, ignoring invalid input
    pub fn filter(&self) -> CarFilter {
        if self.validate().is_err() {
            return CarFilter::default();
        }
        CarFilter {
            model: SearchTerm::parse(self.model.as_deref()),
        }
    }
}

impl DriverSearch {
    /// Converts the form into a storage filter, ignoring invalid input
    pub fn filter(&self) -> DriverFilter {
        if self.validate().is_err() {
            return DriverFilter::default();
        }
        DriverFilter {
            username: SearchTerm::parse(self.username.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_is_case_insensitive() {
        let term = SearchTerm::parse(Some("CoRoL")).unwrap();
        assert!(term.matches("Corolla"));
        assert!(!term.matches("Camry"));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let term = SearchTerm::parse(Some("50%_off\\")).unwrap();
        assert_eq!(term.like_pattern(), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_missing_input_means_no_filter() {
        assert_eq!(ManufacturerSearch::default().filter(), ManufacturerFilter::default());
        let empty = DriverSearch {
            username: Some(String::new()),
        };
        assert!(empty.filter().username.is_none());
    }

    #[test]
    fn test_invalid_input_means_no_filter() {
        let search = ManufacturerSearch {
            name: Some("x".repeat(MAX_SEARCH_LENGTH as usize + 1)),
        };
        assert!(search.filter().name.is_none());
    }

    #[test]
    fn test_valid_input_is_trimmed() {
        let search = ManufacturerSearch {
            name: Some("  toy ".to_string()),
        };
        assert_eq!(search.filter().name.unwrap().as_str(), "toy");
    }
}
