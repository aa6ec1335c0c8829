//! Contrato de persistencia del ledger
//!
//! Toda transición se ejecuta dentro de una `UnitOfWork`: o se confirma
//! entera (viaje + vehículo) con `commit`, o se descarta al soltarla.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{ConsultantRate, Driver, EntryType, RateStatus, Trip, TripStatus, Vehicle};
use crate::utils::errors::AppResult;

/// Cómo tratar los viajes borrados en una consulta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedFilter {
    #[default]
    Exclude,
    Include,
    Only,
}

impl DeletedFilter {
    pub fn matches(&self, is_deleted: bool) -> bool {
        match self {
            DeletedFilter::Exclude => !is_deleted,
            DeletedFilter::Include => true,
            DeletedFilter::Only => is_deleted,
        }
    }
}

/// Filtros del contrato de consulta para colaboradores de reporting
#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: Option<TripStatus>,
    pub entry_type: Option<EntryType>,
    /// `start_time >= from`
    pub from: Option<DateTime<Utc>>,
    /// `start_time <= to`
    pub to: Option<DateTime<Utc>>,
    pub deleted: DeletedFilter,
}

impl TripFilter {
    pub fn for_vehicle(vehicle_id: Uuid) -> Self {
        Self {
            vehicle_id: Some(vehicle_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, trip: &Trip) -> bool {
        self.vehicle_id.map_or(true, |id| trip.vehicle_id == id)
            && self.driver_id.map_or(true, |id| trip.driver_id == id)
            && self.status.map_or(true, |s| trip.status == s)
            && self.entry_type.map_or(true, |e| trip.entry_type == e)
            && self.from.map_or(true, |from| trip.start_time >= from)
            && self.to.map_or(true, |to| trip.start_time <= to)
            && self.deleted.matches(trip.is_deleted())
    }
}

/// Fábrica de unidades de trabajo
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

/// Una transacción atómica sobre vehículos, conductores, viajes y tarifas
#[async_trait]
pub trait UnitOfWork: Send {
    // Vehículos
    async fn insert_vehicle(&mut self, vehicle: &Vehicle) -> AppResult<()>;
    async fn find_vehicle(&mut self, id: Uuid) -> AppResult<Option<Vehicle>>;
    /// Lee el vehículo con bloqueo exclusivo hasta el fin de la unidad de trabajo
    async fn lock_vehicle(&mut self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn find_vehicle_by_plate(&mut self, license_plate: &str) -> AppResult<Option<Vehicle>>;
    async fn list_vehicles(&mut self) -> AppResult<Vec<Vehicle>>;
    /// Escribe `status` y `current_odometer`. Si falla, la unidad de trabajo
    /// sigue siendo utilizable y no queda ningún cambio parcial del vehículo.
    async fn save_vehicle_state(&mut self, vehicle: &Vehicle) -> AppResult<()>;

    // Conductores
    async fn insert_driver(&mut self, driver: &Driver) -> AppResult<()>;
    async fn find_driver(&mut self, id: Uuid) -> AppResult<Option<Driver>>;
    async fn find_driver_by_email(&mut self, email: &str) -> AppResult<Option<Driver>>;

    // Viajes
    async fn insert_trip(&mut self, trip: &Trip) -> AppResult<()>;
    async fn update_trip(&mut self, trip: &Trip) -> AppResult<()>;
    async fn find_trip(&mut self, id: Uuid) -> AppResult<Option<Trip>>;
    async fn lock_trip(&mut self, id: Uuid) -> AppResult<Option<Trip>>;
    async fn find_trips(&mut self, filter: &TripFilter) -> AppResult<Vec<Trip>>;
    /// Marca de agua: mayor `end_odometer` entre viajes completados no borrados
    async fn highest_completed_end_odometer(
        &mut self,
        vehicle_id: Uuid,
        excluding: Option<Uuid>,
    ) -> AppResult<Option<i64>>;
    async fn driver_has_ongoing_real_time_trip(&mut self, driver_id: Uuid) -> AppResult<bool>;

    // Tarifas de consultores
    async fn insert_rate(&mut self, rate: &ConsultantRate) -> AppResult<()>;
    async fn find_rate(&mut self, id: Uuid) -> AppResult<Option<ConsultantRate>>;
    async fn active_rate(
        &mut self,
        driver_id: Uuid,
        vehicle_id: Uuid,
    ) -> AppResult<Option<ConsultantRate>>;
    /// Desactiva toda tarifa activa del par salvo `keep`; devuelve cuántas cambió
    async fn deactivate_rates_for_pair(
        &mut self,
        driver_id: Uuid,
        vehicle_id: Uuid,
        keep: Option<Uuid>,
    ) -> AppResult<u64>;
    async fn set_rate_status(&mut self, id: Uuid, status: RateStatus) -> AppResult<()>;
    async fn list_rates(&mut self, status: Option<RateStatus>) -> AppResult<Vec<ConsultantRate>>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
