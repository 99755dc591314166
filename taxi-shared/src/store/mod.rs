/// Storage layer
///
/// Record management is expressed as a small set of per-operation traits,
/// each implemented once per record type by every backend:
///
/// - [`Lister`]: filtered, paginated listing
/// - [`Fetcher`]: lookup by id
/// - [`Creator`]: validated insert
/// - [`Updater`]: validated update
/// - [`Deleter`]: removal
///
/// The traits are generic over the record type, so call sites name the
/// record explicitly (`Fetcher::<Car>::fetch(store, id)`).
///
/// [`FleetStore`] composes them for all three record types and adds the
/// operations that do not fit the CRUD shape (assignment toggle, detail
/// joins, counts, login lookup).
///
/// # Backends
///
/// - [`postgres::PgFleetStore`]: PostgreSQL via sqlx
/// - [`memory::MemoryStore`]: in-process maps, for development and tests
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taxi_shared::models::{Manufacturer, ManufacturerForm, ManufacturerFilter, PageRequest};
/// use taxi_shared::store::{memory::MemoryStore, Creator, FleetStore, Lister};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn FleetStore> = Arc::new(MemoryStore::new());
///
/// let form = ManufacturerForm { name: "Toyota".to_string(), country: "Japan".to_string() };
/// let toyota = Creator::<Manufacturer, ManufacturerForm>::create(store.as_ref(), form).await?;
///
/// let filter = ManufacturerFilter::default();
/// let page = Lister::<Manufacturer, ManufacturerFilter>::list(store.as_ref(), &filter, PageRequest::default()).await?;
/// assert_eq!(page.items, vec![toyota]);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

pub use crate::error::{StoreError, StoreResult};
use crate::models::{
    AssignmentState, Car, CarData, CarDetail, CarFilter, Driver, DriverDetail, DriverFilter,
    LicenseForm, Manufacturer, ManufacturerFilter, ManufacturerForm, NewDriver, Page, PageRequest,
};

/// Filtered, paginated listing of `R`
#[async_trait]
pub trait Lister<R, F>: Send + Sync
where
    F: Sync,
{
    async fn list(&self, filter: &F, page: PageRequest) -> StoreResult<Page<R>>;
}

/// Lookup of a single `R` by id
#[async_trait]
pub trait Fetcher<R>: Send + Sync {
    /// # Errors
    ///
    /// `StoreError::NotFound` if no record has this id
    async fn fetch(&self, id: Uuid) -> StoreResult<R>;
}

/// Insert of a new `R` from input `I`
#[async_trait]
pub trait Creator<R, I>: Send + Sync
where
    I: Send + 'static,
{
    /// # Errors
    ///
    /// `StoreError::Conflict` on unique violations,
    /// `StoreError::InvalidReference` on dangling references
    async fn create(&self, input: I) -> StoreResult<R>;
}

/// Update of an existing `R` from input `I`
#[async_trait]
pub trait Updater<R, I>: Send + Sync
where
    I: Send + 'static,
{
    /// # Errors
    ///
    /// As [`Creator::create`], plus `StoreError::NotFound`
    async fn update(&self, id: Uuid, input: I) -> StoreResult<R>;
}

/// Removal of an `R`
#[async_trait]
pub trait Deleter<R>: Send + Sync {
    /// # Errors
    ///
    /// `StoreError::NotFound` if no record has this id
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// Record counts shown on the home page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetCounts {
    pub drivers: u64,
    pub cars: u64,
    pub manufacturers: u64,
}

/// Complete storage interface of the fleet service
#[async_trait]
pub trait FleetStore:
    Lister<Manufacturer, ManufacturerFilter>
    + Fetcher<Manufacturer>
    + Creator<Manufacturer, ManufacturerForm>
    + Updater<Manufacturer, ManufacturerForm>
    + Deleter<Manufacturer>
    + Lister<Car, CarFilter>
    + Fetcher<Car>
    + Creator<Car, CarData>
    + Updater<Car, CarData>
    + Deleter<Car>
    + Lister<Driver, DriverFilter>
    + Fetcher<Driver>
    + Creator<Driver, NewDriver>
    + Updater<Driver, LicenseForm>
    + Deleter<Driver>
{
    /// Flips the assignment of `driver_id` to `car_id` as one atomic unit
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the car or the driver does not exist
    async fn toggle_assignment(&self, driver_id: Uuid, car_id: Uuid)
        -> StoreResult<AssignmentState>;

    /// Driver with all assigned cars and their manufacturers, fetched in one batch
    async fn driver_detail(&self, id: Uuid) -> StoreResult<DriverDetail>;

    /// Car with its manufacturer and drivers
    async fn car_detail(&self, id: Uuid) -> StoreResult<CarDetail>;

    /// Finds a driver by exact username (login)
    async fn find_driver_by_username(&self, username: &str) -> StoreResult<Option<Driver>>;

    /// Number of drivers, cars and manufacturers
    async fn counts(&self) -> StoreResult<FleetCounts>;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}
