/// PostgreSQL store
///
/// Implements [`FleetStore`] with runtime-checked sqlx queries. Writes that
/// touch several tables (car + assignments, the assignment toggle) run in a
/// transaction; the toggle additionally holds a row lock on the car so that
/// concurrent toggles of the same pair are serialized.
///
/// Constraint names from the migrations are mapped back to form fields:
///
/// | Constraint | Field |
/// |---|---|
/// | `manufacturers_name_key` | `name` |
/// | `drivers_username_key` | `username` |
/// | `drivers_license_number_key` | `license_number` |
/// | `cars_manufacturer_id_fkey` | `manufacturer` |
/// | `cars_drivers_driver_id_fkey` | `drivers` |
///
/// # Example
///
/// ```no_run
/// use taxi_shared::db::pool::{create_pool, PoolConfig};
/// use taxi_shared::store::postgres::PgFleetStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
/// let store = PgFleetStore::new(pool);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::{error::ErrorKind, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Creator, Deleter, Fetcher, FleetCounts, FleetStore, Lister, Updater};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    search::SearchTerm, AssignmentState, Car, CarData, CarDetail, CarFilter, CarWithManufacturer,
    Driver, DriverDetail, DriverFilter, DriverSummary, LicenseForm, Manufacturer,
    ManufacturerFilter, ManufacturerForm, NewDriver, Page, PageRequest,
};

const DRIVER_COLUMNS: &str = "id, username, password_hash, first_name, last_name, email, \
                              license_number, created_at, updated_at";

/// PostgreSQL-backed fleet store
#[derive(Debug, Clone)]
pub struct PgFleetStore {
    pool: PgPool,
}

impl PgFleetStore {
    /// Wraps an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps constraint violations to the form field that caused them
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let mapped = match (db_err.kind(), db_err.constraint()) {
            (ErrorKind::UniqueViolation, Some("manufacturers_name_key")) => Some(
                StoreError::conflict("name", "Manufacturer with this name already exists."),
            ),
            (ErrorKind::UniqueViolation, Some("drivers_username_key")) => Some(
                StoreError::conflict("username", "A user with that username already exists."),
            ),
            (ErrorKind::UniqueViolation, Some("drivers_license_number_key")) => Some(
                StoreError::conflict(
                    "license_number",
                    "Driver with this license number already exists.",
                ),
            ),
            (ErrorKind::ForeignKeyViolation, Some("cars_manufacturer_id_fkey")) => Some(
                StoreError::invalid_reference("manufacturer", "Select a valid manufacturer."),
            ),
            (ErrorKind::ForeignKeyViolation, Some("cars_drivers_driver_id_fkey")) => Some(
                StoreError::invalid_reference("drivers", "Select valid drivers."),
            ),
            _ => None,
        };
        if let Some(mapped) = mapped {
            warn!(error = %mapped, "Write rejected by constraint");
            return mapped;
        }
    }
    StoreError::Database(err)
}

fn pattern(term: Option<&SearchTerm>) -> Option<String> {
    term.map(SearchTerm::like_pattern)
}

fn to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Row of the driver-detail join
#[derive(sqlx::FromRow)]
struct AssignedCarRow {
    id: Uuid,
    model: String,
    manufacturer_id: Uuid,
    manufacturer_name: String,
    manufacturer_country: String,
}

impl From<AssignedCarRow> for CarWithManufacturer {
    fn from(row: AssignedCarRow) -> Self {
        Self {
            id: row.id,
            model: row.model,
            manufacturer: Manufacturer {
                id: row.manufacturer_id,
                name: row.manufacturer_name,
                country: row.manufacturer_country,
            },
        }
    }
}

// Manufacturers

#[async_trait]
impl Lister<Manufacturer, ManufacturerFilter> for PgFleetStore {
    async fn list(
        &self,
        filter: &ManufacturerFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Manufacturer>> {
        let name = pattern(filter.name.as_ref());

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM manufacturers WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;

        let total = to_u64(total);
        let window = page.window(total)?;

        let items = sqlx::query_as::<_, Manufacturer>(
            r#"
            SELECT id, name, country
            FROM manufacturers
            WHERE ($1::text IS NULL OR name ILIKE $1)
            ORDER BY name, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&name)
        .bind(i64::from(window.limit))
        .bind(to_i64(window.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, window, total))
    }
}

#[async_trait]
impl Fetcher<Manufacturer> for PgFleetStore {
    async fn fetch(&self, id: Uuid) -> StoreResult<Manufacturer> {
        sqlx::query_as::<_, Manufacturer>("SELECT id, name, country FROM manufacturers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("manufacturer", id))
    }
}

#[async_trait]
impl Creator<Manufacturer, ManufacturerForm> for PgFleetStore {
    async fn create(&self, input: ManufacturerForm) -> StoreResult<Manufacturer> {
        let manufacturer = sqlx::query_as::<_, Manufacturer>(
            r#"
            INSERT INTO manufacturers (name, country)
            VALUES ($1, $2)
            RETURNING id, name, country
            "#,
        )
        .bind(input.name)
        .bind(input.country)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        debug!(manufacturer_id = %manufacturer.id, "Manufacturer created");
        Ok(manufacturer)
    }
}

#[async_trait]
impl Updater<Manufacturer, ManufacturerForm> for PgFleetStore {
    async fn update(&self, id: Uuid, input: ManufacturerForm) -> StoreResult<Manufacturer> {
        sqlx::query_as::<_, Manufacturer>(
            r#"
            UPDATE manufacturers
            SET name = $2, country = $3
            WHERE id = $1
            RETURNING id, name, country
            "#,
        )
        .bind(id)
        .bind(input.name)
        .bind(input.country)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| StoreError::not_found("manufacturer", id))
    }
}

#[async_trait]
impl Deleter<Manufacturer> for PgFleetStore {
    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        // cars (and their assignments) go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM manufacturers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("manufacturer", id));
        }
        Ok(())
    }
}

// Cars

#[async_trait]
impl Lister<Car, CarFilter> for PgFleetStore {
    async fn list(&self, filter: &CarFilter, page: PageRequest) -> StoreResult<Page<Car>> {
        let model = pattern(filter.model.as_ref());

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM cars WHERE ($1::text IS NULL OR model ILIKE $1)")
                .bind(&model)
                .fetch_one(&self.pool)
                .await?;

        let total = to_u64(total);
        let window = page.window(total)?;

        let items = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, model, manufacturer_id
            FROM cars
            WHERE ($1::text IS NULL OR model ILIKE $1)
            ORDER BY model, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&model)
        .bind(i64::from(window.limit))
        .bind(to_i64(window.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, window, total))
    }
}

#[async_trait]
impl Fetcher<Car> for PgFleetStore {
    async fn fetch(&self, id: Uuid) -> StoreResult<Car> {
        sqlx::query_as::<_, Car>("SELECT id, model, manufacturer_id FROM cars WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("car", id))
    }
}

#[async_trait]
impl Creator<Car, CarData> for PgFleetStore {
    async fn create(&self, input: CarData) -> StoreResult<Car> {
        let mut tx = self.pool.begin().await?;

        let car = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars (model, manufacturer_id)
            VALUES ($1, $2)
            RETURNING id, model, manufacturer_id
            "#,
        )
        .bind(&input.model)
        .bind(input.manufacturer_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        sqlx::query(
            "INSERT INTO cars_drivers (car_id, driver_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(car.id)
        .bind(&input.driver_ids)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;

        debug!(car_id = %car.id, drivers = input.driver_ids.len(), "Car created");
        Ok(car)
    }
}

#[async_trait]
impl Updater<Car, CarData> for PgFleetStore {
    async fn update(&self, id: Uuid, input: CarData) -> StoreResult<Car> {
        let mut tx = self.pool.begin().await?;

        let car = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars
            SET model = $2, manufacturer_id = $3
            WHERE id = $1
            RETURNING id, model, manufacturer_id
            "#,
        )
        .bind(id)
        .bind(&input.model)
        .bind(input.manufacturer_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| StoreError::not_found("car", id))?;

        sqlx::query("DELETE FROM cars_drivers WHERE car_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO cars_drivers (car_id, driver_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(id)
        .bind(&input.driver_ids)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok(car)
    }
}

#[async_trait]
impl Deleter<Car> for PgFleetStore {
    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("car", id));
        }
        Ok(())
    }
}

// Drivers

#[async_trait]
impl Lister<Driver, DriverFilter> for PgFleetStore {
    async fn list(&self, filter: &DriverFilter, page: PageRequest) -> StoreResult<Page<Driver>> {
        let username = pattern(filter.username.as_ref());

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM drivers WHERE ($1::text IS NULL OR username ILIKE $1)",
        )
        .bind(&username)
        .fetch_one(&self.pool)
        .await?;

        let total = to_u64(total);
        let window = page.window(total)?;

        let query = format!(
            "SELECT {} FROM drivers \
             WHERE ($1::text IS NULL OR username ILIKE $1) \
             ORDER BY username, id LIMIT $2 OFFSET $3",
            DRIVER_COLUMNS
        );
        let items = sqlx::query_as::<_, Driver>(&query)
            .bind(&username)
            .bind(i64::from(window.limit))
            .bind(to_i64(window.offset))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, window, total))
    }
}

#[async_trait]
impl Fetcher<Driver> for PgFleetStore {
    async fn fetch(&self, id: Uuid) -> StoreResult<Driver> {
        let query = format!("SELECT {} FROM drivers WHERE id = $1", DRIVER_COLUMNS);
        sqlx::query_as::<_, Driver>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("driver", id))
    }
}

#[async_trait]
impl Creator<Driver, NewDriver> for PgFleetStore {
    async fn create(&self, input: NewDriver) -> StoreResult<Driver> {
        let query = format!(
            "INSERT INTO drivers \
             (username, password_hash, first_name, last_name, email, license_number) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            DRIVER_COLUMNS
        );
        let driver = sqlx::query_as::<_, Driver>(&query)
            .bind(input.username)
            .bind(input.password_hash)
            .bind(input.first_name)
            .bind(input.last_name)
            .bind(input.email)
            .bind(input.license_number)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        debug!(driver_id = %driver.id, "Driver created");
        Ok(driver)
    }
}

#[async_trait]
impl Updater<Driver, LicenseForm> for PgFleetStore {
    async fn update(&self, id: Uuid, input: LicenseForm) -> StoreResult<Driver> {
        let query = format!(
            "UPDATE drivers SET license_number = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            DRIVER_COLUMNS
        );
        sqlx::query_as::<_, Driver>(&query)
            .bind(id)
            .bind(input.license_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| StoreError::not_found("driver", id))
    }
}

#[async_trait]
impl Deleter<Driver> for PgFleetStore {
    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM drivers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("driver", id));
        }
        Ok(())
    }
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn toggle_assignment(
        &self,
        driver_id: Uuid,
        car_id: Uuid,
    ) -> StoreResult<AssignmentState> {
        let mut tx = self.pool.begin().await?;

        // serializes concurrent toggles on this car until commit
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM cars WHERE id = $1 FOR UPDATE")
            .bind(car_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StoreError::not_found("car", car_id));
        }

        let removed = sqlx::query("DELETE FROM cars_drivers WHERE car_id = $1 AND driver_id = $2")
            .bind(car_id)
            .bind(driver_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let state = if removed > 0 {
            AssignmentState::Unassigned
        } else {
            sqlx::query("INSERT INTO cars_drivers (car_id, driver_id) VALUES ($1, $2)")
                .bind(car_id)
                .bind(driver_id)
                .execute(&mut *tx)
                .await
                .map_err(|err| match map_write_error(err) {
                    StoreError::InvalidReference { .. } => {
                        StoreError::not_found("driver", driver_id)
                    }
                    other => other,
                })?;
            AssignmentState::Assigned
        };

        tx.commit().await?;
        Ok(state)
    }

    async fn driver_detail(&self, id: Uuid) -> StoreResult<DriverDetail> {
        let driver = Fetcher::<Driver>::fetch(self, id).await?;

        let cars = sqlx::query_as::<_, AssignedCarRow>(
            r#"
            SELECT c.id, c.model,
                   m.id AS manufacturer_id,
                   m.name AS manufacturer_name,
                   m.country AS manufacturer_country
            FROM cars_drivers cd
            JOIN cars c ON c.id = cd.car_id
            JOIN manufacturers m ON m.id = c.manufacturer_id
            WHERE cd.driver_id = $1
            ORDER BY c.model, c.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(CarWithManufacturer::from)
        .collect();

        Ok(DriverDetail { driver, cars })
    }

    async fn car_detail(&self, id: Uuid) -> StoreResult<CarDetail> {
        let row = sqlx::query_as::<_, AssignedCarRow>(
            r#"
            SELECT c.id, c.model,
                   m.id AS manufacturer_id,
                   m.name AS manufacturer_name,
                   m.country AS manufacturer_country
            FROM cars c
            JOIN manufacturers m ON m.id = c.manufacturer_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("car", id))?;

        let drivers = sqlx::query_as::<_, DriverSummary>(
            r#"
            SELECT d.id, d.username, d.first_name, d.last_name, d.license_number
            FROM cars_drivers cd
            JOIN drivers d ON d.id = cd.driver_id
            WHERE cd.car_id = $1
            ORDER BY d.username, d.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let car = CarWithManufacturer::from(row);
        Ok(CarDetail {
            id: car.id,
            model: car.model,
            manufacturer: car.manufacturer,
            drivers,
        })
    }

    async fn find_driver_by_username(&self, username: &str) -> StoreResult<Option<Driver>> {
        let query = format!("SELECT {} FROM drivers WHERE username = $1", DRIVER_COLUMNS);
        let driver = sqlx::query_as::<_, Driver>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }

    async fn counts(&self) -> StoreResult<FleetCounts> {
        let (drivers, cars, manufacturers): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM drivers),
                   (SELECT COUNT(*) FROM cars),
                   (SELECT COUNT(*) FROM manufacturers)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(FleetCounts {
            drivers: to_u64(drivers),
            cars: to_u64(cars),
            manufacturers: to_u64(manufacturers),
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }
}
