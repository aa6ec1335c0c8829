//! Store en memoria
//!
//! Un único escritor a la vez: `begin` toma el mutex global y trabaja sobre
//! una copia del estado que solo se publica en `commit`. Se usa en tests y
//! con `LEDGER_STORE=memory` en desarrollo.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::ledger_store::{Store, TripFilter, UnitOfWork};
use crate::models::{ConsultantRate, Driver, EntryType, RateStatus, Trip, TripStatus, Vehicle};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    vehicles: HashMap<Uuid, Vehicle>,
    drivers: HashMap<Uuid, Driver>,
    trips: HashMap<Uuid, Trip>,
    rates: HashMap<Uuid, ConsultantRate>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_vehicle_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hace fallar las escrituras de estado de vehículo, para simular una
    /// proyección que no se puede actualizar tras confirmar el viaje.
    pub fn set_fail_vehicle_writes(&self, fail: bool) {
        self.fail_vehicle_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            fail_vehicle_writes: self.fail_vehicle_writes.load(Ordering::SeqCst),
        }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_vehicle_writes: bool,
}

/// Orden de listado: inicio más reciente primero
fn sort_trips(trips: &mut [Trip]) {
    trips.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.created_at.cmp(&a.created_at)));
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_vehicle(&mut self, vehicle: &Vehicle) -> AppResult<()> {
        let duplicated = self
            .working
            .vehicles
            .values()
            .any(|v| v.license_plate.eq_ignore_ascii_case(&vehicle.license_plate));
        if duplicated {
            return Err(conflict_error("Vehicle", "license plate", &vehicle.license_plate));
        }
        self.working.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn find_vehicle(&mut self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.working.vehicles.get(&id).cloned())
    }

    async fn lock_vehicle(&mut self, id: Uuid) -> AppResult<Option<Vehicle>> {
        // El mutex global ya da exclusividad
        self.find_vehicle(id).await
    }

    async fn find_vehicle_by_plate(&mut self, license_plate: &str) -> AppResult<Option<Vehicle>> {
        Ok(self
            .working
            .vehicles
            .values()
            .find(|v| v.license_plate.eq_ignore_ascii_case(license_plate.trim()))
            .cloned())
    }

    async fn list_vehicles(&mut self) -> AppResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self.working.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
        Ok(vehicles)
    }

    async fn save_vehicle_state(&mut self, vehicle: &Vehicle) -> AppResult<()> {
        if self.fail_vehicle_writes {
            return Err(AppError::Internal(format!(
                "vehicle {} is not writable",
                vehicle.id
            )));
        }
        let stored = self
            .working
            .vehicles
            .get_mut(&vehicle.id)
            .ok_or_else(|| not_found_error("Vehicle", vehicle.id))?;
        stored.status = vehicle.status;
        stored.current_odometer = vehicle.current_odometer;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_driver(&mut self, driver: &Driver) -> AppResult<()> {
        let duplicated = self
            .working
            .drivers
            .values()
            .any(|d| d.email.eq_ignore_ascii_case(&driver.email));
        if duplicated {
            return Err(conflict_error("Driver", "email", &driver.email));
        }
        self.working.drivers.insert(driver.id, driver.clone());
        Ok(())
    }

    async fn find_driver(&mut self, id: Uuid) -> AppResult<Option<Driver>> {
        Ok(self.working.drivers.get(&id).cloned())
    }

    async fn find_driver_by_email(&mut self, email: &str) -> AppResult<Option<Driver>> {
        Ok(self
            .working
            .drivers
            .values()
            .find(|d| d.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    async fn insert_trip(&mut self, trip: &Trip) -> AppResult<()> {
        if !self.working.vehicles.contains_key(&trip.vehicle_id) {
            return Err(not_found_error("Vehicle", trip.vehicle_id));
        }
        self.working.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn update_trip(&mut self, trip: &Trip) -> AppResult<()> {
        match self.working.trips.get_mut(&trip.id) {
            Some(stored) => {
                *stored = trip.clone();
                Ok(())
            }
            None => Err(not_found_error("Trip", trip.id)),
        }
    }

    async fn find_trip(&mut self, id: Uuid) -> AppResult<Option<Trip>> {
        Ok(self.working.trips.get(&id).cloned())
    }

    async fn lock_trip(&mut self, id: Uuid) -> AppResult<Option<Trip>> {
        self.find_trip(id).await
    }

    async fn find_trips(&mut self, filter: &TripFilter) -> AppResult<Vec<Trip>> {
        let mut trips: Vec<Trip> = self
            .working
            .trips
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        sort_trips(&mut trips);
        Ok(trips)
    }

    async fn highest_completed_end_odometer(
        &mut self,
        vehicle_id: Uuid,
        excluding: Option<Uuid>,
    ) -> AppResult<Option<i64>> {
        Ok(self
            .working
            .trips
            .values()
            .filter(|t| t.vehicle_id == vehicle_id)
            .filter(|t| t.status == TripStatus::Completed && !t.is_deleted())
            .filter(|t| Some(t.id) != excluding)
            .filter_map(|t| t.end_odometer)
            .max())
    }

    async fn driver_has_ongoing_real_time_trip(&mut self, driver_id: Uuid) -> AppResult<bool> {
        Ok(self.working.trips.values().any(|t| {
            t.driver_id == driver_id
                && t.status == TripStatus::Ongoing
                && t.entry_type == EntryType::RealTime
                && !t.is_deleted()
        }))
    }

    async fn insert_rate(&mut self, rate: &ConsultantRate) -> AppResult<()> {
        // Misma restricción que el índice único parcial de PostgreSQL
        let clash = rate.is_active()
            && self.working.rates.values().any(|r| {
                r.is_active() && r.driver_id == rate.driver_id && r.vehicle_id == rate.vehicle_id
            });
        if clash {
            return Err(AppError::Conflict(
                "an active rate already exists for this driver and vehicle".to_string(),
            ));
        }
        self.working.rates.insert(rate.id, rate.clone());
        Ok(())
    }

    async fn find_rate(&mut self, id: Uuid) -> AppResult<Option<ConsultantRate>> {
        Ok(self.working.rates.get(&id).cloned())
    }

    async fn active_rate(
        &mut self,
        driver_id: Uuid,
        vehicle_id: Uuid,
    ) -> AppResult<Option<ConsultantRate>> {
        Ok(self
            .working
            .rates
            .values()
            .find(|r| r.is_active() && r.driver_id == driver_id && r.vehicle_id == vehicle_id)
            .cloned())
    }

    async fn deactivate_rates_for_pair(
        &mut self,
        driver_id: Uuid,
        vehicle_id: Uuid,
        keep: Option<Uuid>,
    ) -> AppResult<u64> {
        let now = Utc::now();
        let mut changed = 0;
        for rate in self.working.rates.values_mut() {
            if rate.is_active()
                && rate.driver_id == driver_id
                && rate.vehicle_id == vehicle_id
                && Some(rate.id) != keep
            {
                rate.status = RateStatus::Inactive;
                rate.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn set_rate_status(&mut self, id: Uuid, status: RateStatus) -> AppResult<()> {
        let rate = self.working.rates.get(&id).cloned().ok_or_else(|| not_found_error("ConsultantRate", id))?;
        if status == RateStatus::Active && !rate.is_active() {
            let clash = self.working.rates.values().any(|r| {
                r.id != id
                    && r.is_active()
                    && r.driver_id == rate.driver_id
                    && r.vehicle_id == rate.vehicle_id
            });
            if clash {
                return Err(AppError::Conflict(
                    "an active rate already exists for this driver and vehicle".to_string(),
                ));
            }
        }
        if let Some(stored) = self.working.rates.get_mut(&id) {
            stored.status = status;
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_rates(&mut self, status: Option<RateStatus>) -> AppResult<Vec<ConsultantRate>> {
        let mut rates: Vec<ConsultantRate> = self
            .working
            .rates
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        rates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rates)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
