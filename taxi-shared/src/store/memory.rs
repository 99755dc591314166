/// In-memory store
///
/// Keeps every record in process memory behind a single `RwLock`, enforcing
/// the same uniqueness, reference and cascade rules as the PostgreSQL schema.
/// Used for local development (`STORAGE_BACKEND=memory`) and by the router
/// tests, which run without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Creator, Deleter, Fetcher, FleetCounts, FleetStore, Lister, Updater};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    AssignmentState, Car, CarData, CarDetail, CarFilter, CarWithManufacturer, Driver,
    DriverDetail, DriverFilter, DriverSummary, LicenseForm, Manufacturer, ManufacturerFilter,
    ManufacturerForm, NewDriver, Page, PageRequest,
};

#[derive(Debug, Default)]
struct State {
    manufacturers: HashMap<Uuid, Manufacturer>,
    cars: HashMap<Uuid, Car>,
    drivers: HashMap<Uuid, Driver>,

    /// (car_id, driver_id)
    assignments: BTreeSet<(Uuid, Uuid)>,
}

impl State {
    fn check_manufacturer_name(&self, name: &str, except: Option<Uuid>) -> StoreResult<()> {
        let taken = self
            .manufacturers
            .values()
            .any(|m| m.name == name && Some(m.id) != except);
        if taken {
            return Err(StoreError::conflict(
                "name",
                "Manufacturer with this name already exists.",
            ));
        }
        Ok(())
    }

    fn check_license(&self, license_number: &str, except: Option<Uuid>) -> StoreResult<()> {
        let taken = self
            .drivers
            .values()
            .any(|d| d.license_number == license_number && Some(d.id) != except);
        if taken {
            return Err(StoreError::conflict(
                "license_number",
                "Driver with this license number already exists.",
            ));
        }
        Ok(())
    }

    fn check_car_references(&self, data: &CarData) -> StoreResult<()> {
        if !self.manufacturers.contains_key(&data.manufacturer_id) {
            return Err(StoreError::invalid_reference(
                "manufacturer",
                "Select a valid manufacturer.",
            ));
        }
        if data.driver_ids.iter().any(|id| !self.drivers.contains_key(id)) {
            return Err(StoreError::invalid_reference(
                "drivers",
                "Select valid drivers.",
            ));
        }
        Ok(())
    }

    fn set_car_drivers(&mut self, car_id: Uuid, driver_ids: &[Uuid]) {
        self.assignments.retain(|(car, _)| *car != car_id);
        self.assignments
            .extend(driver_ids.iter().map(|driver| (car_id, *driver)));
    }

    fn with_manufacturer(&self, car: &Car) -> StoreResult<CarWithManufacturer> {
        let manufacturer = self
            .manufacturers
            .get(&car.manufacturer_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("manufacturer", car.manufacturer_id))?;
        Ok(CarWithManufacturer {
            id: car.id,
            model: car.model.clone(),
            manufacturer,
        })
    }
}

/// Process-local fleet store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Manufacturers

#[async_trait]
impl Lister<Manufacturer, ManufacturerFilter> for MemoryStore {
    async fn list(
        &self,
        filter: &ManufacturerFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Manufacturer>> {
        let state = self.state.read().await;
        let mut records: Vec<Manufacturer> = state
            .manufacturers
            .values()
            .filter(|m| filter.name.as_ref().map_or(true, |term| term.matches(&m.name)))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(Page::from_sorted(records, page)?)
    }
}

#[async_trait]
impl Fetcher<Manufacturer> for MemoryStore {
    async fn fetch(&self, id: Uuid) -> StoreResult<Manufacturer> {
        self.state
            .read()
            .await
            .manufacturers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("manufacturer", id))
    }
}

#[async_trait]
impl Creator<Manufacturer, ManufacturerForm> for MemoryStore {
    async fn create(&self, input: ManufacturerForm) -> StoreResult<Manufacturer> {
        let mut state = self.state.write().await;
        state.check_manufacturer_name(&input.name, None)?;

        let manufacturer = Manufacturer {
            id: Uuid::new_v4(),
            name: input.name,
            country: input.country,
        };
        state
            .manufacturers
            .insert(manufacturer.id, manufacturer.clone());
        Ok(manufacturer)
    }
}

#[async_trait]
impl Updater<Manufacturer, ManufacturerForm> for MemoryStore {
    async fn update(&self, id: Uuid, input: ManufacturerForm) -> StoreResult<Manufacturer> {
        let mut state = self.state.write().await;
        if !state.manufacturers.contains_key(&id) {
            return Err(StoreError::not_found("manufacturer", id));
        }
        state.check_manufacturer_name(&input.name, Some(id))?;

        let manufacturer = Manufacturer {
            id,
            name: input.name,
            country: input.country,
        };
        state.manufacturers.insert(id, manufacturer.clone());
        Ok(manufacturer)
    }
}

#[async_trait]
impl Deleter<Manufacturer> for MemoryStore {
    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.manufacturers.remove(&id).is_none() {
            return Err(StoreError::not_found("manufacturer", id));
        }

        let orphaned: Vec<Uuid> = state
            .cars
            .values()
            .filter(|car| car.manufacturer_id == id)
            .map(|car| car.id)
            .collect();
        for car_id in &orphaned {
            state.cars.remove(car_id);
        }
        state
            .assignments
            .retain(|(car_id, _)| !orphaned.contains(car_id));
        Ok(())
    }
}

// Cars

#[async_trait]
impl Lister<Car, CarFilter> for MemoryStore {
    async fn list(&self, filter: &CarFilter, page: PageRequest) -> StoreResult<Page<Car>> {
        let state = self.state.read().await;
        let mut records: Vec<Car> = state
            .cars
            .values()
            .filter(|c| filter.model.as_ref().map_or(true, |term| term.matches(&c.model)))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.model.cmp(&b.model).then(a.id.cmp(&b.id)));

        Ok(Page::from_sorted(records, page)?)
    }
}

#[async_trait]
impl Fetcher<Car> for MemoryStore {
    async fn fetch(&self, id: Uuid) -> StoreResult<Car> {
        self.state
            .read()
            .await
            .cars
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("car", id))
    }
}

#[async_trait]
impl Creator<Car, CarData> for MemoryStore {
    async fn create(&self, input: CarData) -> StoreResult<Car> {
        let mut state = self.state.write().await;
        state.check_car_references(&input)?;

        let car = Car {
            id: Uuid::new_v4(),
            model: input.model,
            manufacturer_id: input.manufacturer_id,
        };
        state.cars.insert(car.id, car.clone());
        state.set_car_drivers(car.id, &input.driver_ids);
        Ok(car)
    }
}

#[async_trait]
impl Updater<Car, CarData> for MemoryStore {
    async fn update(&self, id: Uuid, input: CarData) -> StoreResult<Car> {
        let mut state = self.state.write().await;
        if !state.cars.contains_key(&id) {
            return Err(StoreError::not_found("car", id));
        }
        state.check_car_references(&input)?;

        let car = Car {
            id,
            model: input.model,
            manufacturer_id: input.manufacturer_id,
        };
        state.cars.insert(id, car.clone());
        state.set_car_drivers(id, &input.driver_ids);
        Ok(car)
    }
}

#[async_trait]
impl Deleter<Car> for MemoryStore {
    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.cars.remove(&id).is_none() {
            return Err(StoreError::not_found("car", id));
        }
        state.assignments.retain(|(car_id, _)| *car_id != id);
        Ok(())
    }
}

// Drivers

#[async_trait]
impl Lister<Driver, DriverFilter> for MemoryStore {
    async fn list(&self, filter: &DriverFilter, page: PageRequest) -> StoreResult<Page<Driver>> {
        let state = self.state.read().await;
        let mut records: Vec<Driver> = state
            .drivers
            .values()
            .filter(|d| {
                filter
                    .username
                    .as_ref()
                    .map_or(true, |term| term.matches(&d.username))
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));

        Ok(Page::from_sorted(records, page)?)
    }
}

#[async_trait]
impl Fetcher<Driver> for MemoryStore {
    async fn fetch(&self, id: Uuid) -> StoreResult<Driver> {
        self.state
            .read()
            .await
            .drivers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("driver", id))
    }
}

#[async_trait]
impl Creator<Driver, NewDriver> for MemoryStore {
    async fn create(&self, input: NewDriver) -> StoreResult<Driver> {
        let mut state = self.state.write().await;
        if state.drivers.values().any(|d| d.username == input.username) {
            return Err(StoreError::conflict(
                "username",
                "A user with that username already exists.",
            ));
        }
        state.check_license(&input.license_number, None)?;

        let now = Utc::now();
        let driver = Driver {
            id: Uuid::new_v4(),
            username: input.username,
            password_hash: input.password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            license_number: input.license_number,
            created_at: now,
            updated_at: now,
        };
        state.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }
}

#[async_trait]
impl Updater<Driver, LicenseForm> for MemoryStore {
    async fn update(&self, id: Uuid, input: LicenseForm) -> StoreResult<Driver> {
        let mut state = self.state.write().await;
        if !state.drivers.contains_key(&id) {
            return Err(StoreError::not_found("driver", id));
        }
        state.check_license(&input.license_number, Some(id))?;

        let driver = state
            .drivers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("driver", id))?;
        driver.license_number = input.license_number;
        driver.updated_at = Utc::now();
        Ok(driver.clone())
    }
}

#[async_trait]
impl Deleter<Driver> for MemoryStore {
    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.drivers.remove(&id).is_none() {
            return Err(StoreError::not_found("driver", id));
        }
        state.assignments.retain(|(_, driver_id)| *driver_id != id);
        Ok(())
    }
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn toggle_assignment(
        &self,
        driver_id: Uuid,
        car_id: Uuid,
    ) -> StoreResult<AssignmentState> {
        let mut state = self.state.write().await;
        if !state.cars.contains_key(&car_id) {
            return Err(StoreError::not_found("car", car_id));
        }
        if !state.drivers.contains_key(&driver_id) {
            return Err(StoreError::not_found("driver", driver_id));
        }

        if state.assignments.remove(&(car_id, driver_id)) {
            Ok(AssignmentState::Unassigned)
        } else {
            state.assignments.insert((car_id, driver_id));
            Ok(AssignmentState::Assigned)
        }
    }

    async fn driver_detail(&self, id: Uuid) -> StoreResult<DriverDetail> {
        let state = self.state.read().await;
        let driver = state
            .drivers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("driver", id))?;

        let mut cars = state
            .assignments
            .iter()
            .filter(|(_, driver_id)| *driver_id == id)
            .filter_map(|(car_id, _)| state.cars.get(car_id))
            .map(|car| state.with_manufacturer(car))
            .collect::<StoreResult<Vec<_>>>()?;
        cars.sort_by(|a, b| a.model.cmp(&b.model).then(a.id.cmp(&b.id)));

        Ok(DriverDetail { driver, cars })
    }

    async fn car_detail(&self, id: Uuid) -> StoreResult<CarDetail> {
        let state = self.state.read().await;
        let car = state
            .cars
            .get(&id)
            .ok_or_else(|| StoreError::not_found("car", id))?;
        let car = state.with_manufacturer(car)?;

        let mut drivers: Vec<DriverSummary> = state
            .assignments
            .iter()
            .filter(|(car_id, _)| *car_id == id)
            .filter_map(|(_, driver_id)| state.drivers.get(driver_id))
            .map(DriverSummary::from)
            .collect();
        drivers.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));

        Ok(CarDetail {
            id: car.id,
            model: car.model,
            manufacturer: car.manufacturer,
            drivers,
        })
    }

    async fn find_driver_by_username(&self, username: &str) -> StoreResult<Option<Driver>> {
        let state = self.state.read().await;
        Ok(state
            .drivers
            .values()
            .find(|d| d.username == username)
            .cloned())
    }

    async fn counts(&self) -> StoreResult<FleetCounts> {
        let state = self.state.read().await;
        Ok(FleetCounts {
            drivers: state.drivers.len() as u64,
            cars: state.cars.len() as u64,
            manufacturers: state.manufacturers.len() as u64,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
