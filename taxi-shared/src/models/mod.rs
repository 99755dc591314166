/// Data model for the taxi fleet
///
/// # Models
///
/// - `manufacturer`: Car manufacturers
/// - `car`: Cars and the driver assignment relation
/// - `driver`: Driver accounts, registration and license forms
/// - `search`: Per-listing search forms and storage filters
/// - `page`: Listing pagination

pub mod car;
pub mod driver;
pub mod manufacturer;
pub mod page;
pub mod search;

pub use car::{AssignmentState, Car, CarData, CarDetail, CarForm, CarWithManufacturer};
pub use driver::{Driver, DriverDetail, DriverRegistration, DriverSummary, LicenseForm, NewDriver};
pub use manufacturer::{Manufacturer, ManufacturerForm};
pub use page::{Page, PageRequest, PAGE_SIZE};
pub use search::{CarFilter, CarSearch, DriverFilter, DriverSearch, ManufacturerFilter, ManufacturerSearch};
