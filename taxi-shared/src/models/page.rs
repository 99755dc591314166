/// Pagination for record listings
///
/// Every listing is served in fixed-size pages. Page numbers are 1-based and
/// the literal `last` selects the final page. Page 1 of an empty listing is
/// valid; any other page outside `1..=num_pages` is an error.

use serde::Serialize;

/// Number of records per listing page
pub const PAGE_SIZE: u32 = 2;

/// Error raised for a page number that cannot be served
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// The page parameter is not a number (nor `last`)
    #[error("Page is not a number: {0}")]
    NotANumber(String),

    /// Page numbers start at 1
    #[error("That page number is less than 1")]
    LessThanOne,

    /// The page lies past the end of the listing
    #[error("Page {requested} is out of range ({num_pages} pages)")]
    OutOfRange { requested: u32, num_pages: u32 },
}

/// Which page of a listing to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    /// A specific 1-based page
    Number(u32),

    /// The final page, whatever its number
    Last,
}

/// A page request: which page, and how many records per page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: PageNumber,
    pub size: u32,
}

/// Concrete slice of a listing, resolved against the total record count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub offset: u64,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            number: PageNumber::Number(1),
            size: PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Parses the raw `page` query parameter
    ///
    /// A missing or empty parameter means the first page.
    ///
    /// # Example
    ///
    /// ```
    /// use taxi_shared::models::page::{PageNumber, PageRequest};
    ///
    /// assert_eq!(PageRequest::parse(None).unwrap().number, PageNumber::Number(1));
    /// assert_eq!(PageRequest::parse(Some("3")).unwrap().number, PageNumber::Number(3));
    /// assert_eq!(PageRequest::parse(Some("last")).unwrap().number, PageNumber::Last);
    /// assert!(PageRequest::parse(Some("0")).is_err());
    /// ```
    pub fn parse(raw: Option<&str>) -> Result<Self, PageError> {
        let raw = raw.map(str::trim).unwrap_or_default();

        let number = match raw {
            "" => PageNumber::Number(1),
            "last" => PageNumber::Last,
            other => {
                let n: i64 = other
                    .parse()
                    .map_err(|_| PageError::NotANumber(other.to_string()))?;
                if n < 1 {
                    return Err(PageError::LessThanOne);
                }
                let n = u32::try_from(n).map_err(|_| PageError::NotANumber(other.to_string()))?;
                PageNumber::Number(n)
            }
        };

        Ok(Self {
            number,
            size: PAGE_SIZE,
        })
    }

    /// Resolves the request against the total number of matching records
    pub fn window(&self, total: u64) -> Result<PageWindow, PageError> {
        let size = u64::from(self.size.max(1));
        let num_pages = u32::try_from(total.div_ceil(size).max(1)).unwrap_or(u32::MAX);

        let number = match self.number {
            PageNumber::Last => num_pages,
            PageNumber::Number(n) if n <= num_pages => n,
            PageNumber::Number(n) => {
                return Err(PageError::OutOfRange {
                    requested: n,
                    num_pages,
                })
            }
        };

        Ok(PageWindow {
            number,
            num_pages,
            offset: u64::from(number - 1) * size,
            limit: self.size,
        })
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,

    /// 1-based page number
    pub page: u32,

    /// Total number of pages (at least 1)
    pub num_pages: u32,

    /// Total number of matching records
    pub total: u64,

    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Assembles a page from its records and resolved window
    pub fn new(items: Vec<T>, window: PageWindow, total: u64) -> Self {
        Self {
            items,
            page: window.number,
            num_pages: window.num_pages,
            total,
            has_previous: window.number > 1,
            has_next: window.number < window.num_pages,
        }
    }

    /// Slices an already ordered, already filtered collection
    pub fn from_sorted(records: Vec<T>, request: PageRequest) -> Result<Self, PageError> {
        let total = records.len() as u64;
        let window = request.window(total)?;

        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let items = records
            .into_iter()
            .skip(offset)
            .take(window.limit as usize)
            .collect();

        Ok(Self::new(items, window, total))
    }

    /// Maps the records on this page, keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            num_pages: self.num_pages,
            total: self.total,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            PageRequest::parse(Some("abc")),
            Err(PageError::NotANumber("abc".to_string()))
        );
        assert_eq!(PageRequest::parse(Some("-2")), Err(PageError::LessThanOne));
        assert_eq!(PageRequest::parse(Some("")).unwrap(), PageRequest::default());
    }

    #[test]
    fn test_window_for_empty_listing() {
        let window = PageRequest::default().window(0).unwrap();
        assert_eq!(window.number, 1);
        assert_eq!(window.num_pages, 1);
        assert_eq!(window.offset, 0);
    }

    #[test]
    fn test_window_out_of_range() {
        let request = PageRequest::parse(Some("3")).unwrap();
        assert_eq!(
            request.window(4),
            Err(PageError::OutOfRange {
                requested: 3,
                num_pages: 2
            })
        );
    }

    #[test]
    fn test_last_page() {
        let request = PageRequest::parse(Some("last")).unwrap();
        let window = request.window(5).unwrap();
        assert_eq!(window.number, 3);
        assert_eq!(window.offset, 4);
    }

    #[test]
    fn test_from_sorted_slices_and_flags() {
        let page = Page::from_sorted(vec![1, 2, 3], PageRequest::parse(Some("2")).unwrap()).unwrap();
        assert_eq!(page.items, vec![3]);
        assert_eq!(page.total, 3);
        assert!(page.has_previous);
        assert!(!page.has_next);

        let first = Page::from_sorted(vec![1, 2, 3], PageRequest::default()).unwrap();
        assert_eq!(first.items, vec![1, 2]);
        assert!(first.has_next);
    }
}
