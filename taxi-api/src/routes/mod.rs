/// Route handlers
///
/// - `health`: Health check
/// - `accounts`: Session login/logout and bearer token issue
/// - `index`: Home page counts and visit counter
/// - `manufacturers`, `cars`, `drivers`: Fleet record management
///
/// Listings answer with JSON pages; successful writes answer with a
/// `303 See Other` to the record type's listing.

pub mod accounts;
pub mod cars;
pub mod drivers;
pub mod health;
pub mod index;
pub mod manufacturers;

use serde::{Deserialize, Serialize};
use taxi_shared::models::{Page, PageRequest};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// `?page=` query parameter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

impl PageParams {
    /// Parses the page number; a malformed page is a 404
    pub fn request(&self) -> ApiResult<PageRequest> {
        PageRequest::parse(self.page.as_deref())
            .map_err(|e| ApiError::NotFound(format!("Invalid page: {}", e)))
    }
}

/// One listing page plus the search form that produced it
#[derive(Debug, Serialize)]
pub struct ListResponse<T, S> {
    #[serde(flatten)]
    pub page: Page<T>,

    pub search: S,
}

/// Parses a record id from the path; anything but a UUID matches no record
pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("No record with id {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert!(parse_id("42").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_page_params() {
        assert_eq!(PageParams::default().request().unwrap(), PageRequest::default());
        let bad = PageParams {
            page: Some("zero".to_string()),
        };
        assert!(matches!(bad.request(), Err(ApiError::NotFound(_))));
    }
}
