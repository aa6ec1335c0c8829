//! Ledger de viajes
//!
//! Máquina de estados `ongoing → completed | cancelled` más el borrado
//! lógico. Cada transición abre una única `UnitOfWork`, bloquea el vehículo
//! antes de evaluar el reconciliador y confirma viaje + vehículo juntos.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{EntryType, Trip, TripStatus, Vehicle, VehicleStatus};
use crate::repositories::{Store, TripFilter, UnitOfWork};
use crate::services::reconciler::{needs_high_water_mark, reconcile, TripEvent};
use crate::utils::errors::{
    lookup_error, not_found_error, validation_error, AppResult, ConsistencyWarning,
};
use crate::utils::validation::{
    validate_destination, validate_not_empty, validate_odometer, validate_reading_order,
    validate_time_order,
};

/// Datos para abrir (o registrar ya cerrado) un viaje
#[derive(Debug, Clone)]
pub struct CreateTrip {
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub entry_type: EntryType,
    pub start_odometer: i64,
    pub origin: String,
    pub purpose: String,
    pub notes: String,
    /// Obligatoria para entradas manuales; ignorada en tiempo real
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub end_odometer: Option<i64>,
    pub destination: Option<String>,
}

impl CreateTrip {
    pub fn real_time(vehicle_id: Uuid, driver_id: Uuid, start_odometer: i64, origin: &str) -> Self {
        Self {
            vehicle_id,
            driver_id,
            entry_type: EntryType::RealTime,
            start_odometer,
            origin: origin.to_string(),
            purpose: String::new(),
            notes: String::new(),
            start_time: None,
            end_time: None,
            end_odometer: None,
            destination: None,
        }
    }

    pub fn manual(
        vehicle_id: Uuid,
        driver_id: Uuid,
        start_time: DateTime<Utc>,
        start_odometer: i64,
        origin: &str,
    ) -> Self {
        Self {
            entry_type: EntryType::Manual,
            start_time: Some(start_time),
            ..Self::real_time(vehicle_id, driver_id, start_odometer, origin)
        }
    }

    /// Completa los campos de cierre de una entrada manual
    pub fn ended(mut self, end_time: DateTime<Utc>, end_odometer: i64, destination: &str) -> Self {
        self.end_time = Some(end_time);
        self.end_odometer = Some(end_odometer);
        self.destination = Some(destination.to_string());
        self
    }

    pub fn with_purpose(mut self, purpose: &str) -> Self {
        self.purpose = purpose.to_string();
        self
    }
}

/// Datos de cierre de un viaje en curso
#[derive(Debug, Clone)]
pub struct EndTrip {
    pub end_odometer: i64,
    pub destination: Option<String>,
    pub notes: Option<String>,
}

/// Resultado de una transición confirmada
#[derive(Debug, Clone, Serialize)]
pub struct TripTransition {
    pub trip: Trip,
    /// Estado del vehículo tal como quedó tras la transición
    pub vehicle: Vehicle,
    pub warning: Option<ConsistencyWarning>,
}

#[derive(Clone)]
pub struct TripLedger {
    store: Arc<dyn Store>,
}

impl TripLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: CreateTrip) -> AppResult<TripTransition> {
        let mut uow = self.store.begin().await?;
        let transition = self.create_in(uow.as_mut(), input).await?;
        uow.commit().await?;
        log_transition("created", &transition);
        Ok(transition)
    }

    /// Crea el viaje dentro de una unidad de trabajo ya abierta. El llamador
    /// decide si la confirma (el importador la descarta en modo `dry_run`).
    pub async fn create_in(
        &self,
        uow: &mut dyn UnitOfWork,
        input: CreateTrip,
    ) -> AppResult<TripTransition> {
        validate_odometer("start_odometer", input.start_odometer)?;
        validate_not_empty("origin", &input.origin)?;

        let driver = uow
            .find_driver(input.driver_id)
            .await?
            .ok_or_else(|| lookup_error("driver", input.driver_id))?;
        let vehicle = uow
            .lock_vehicle(input.vehicle_id)
            .await?
            .ok_or_else(|| lookup_error("vehicle", input.vehicle_id))?;

        let now = Utc::now();
        let destination = input
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let (start_time, end_time, end_odometer, destination, status) = match input.entry_type {
            EntryType::RealTime => {
                if input.end_time.is_some() || input.end_odometer.is_some() {
                    return Err(validation_error(
                        "entry_type",
                        "Real-time trips are closed with end, not at creation",
                    ));
                }
                if uow.driver_has_ongoing_real_time_trip(driver.id).await? {
                    return Err(validation_error(
                        "driver_id",
                        format!("Driver {} already has an active trip", driver.email),
                    ));
                }
                if vehicle.status != VehicleStatus::Available {
                    return Err(validation_error(
                        "vehicle_id",
                        format!(
                            "Vehicle {} is not available (status: {})",
                            vehicle.license_plate,
                            vehicle.status.as_str()
                        ),
                    ));
                }
                (now, None, None, destination, TripStatus::Ongoing)
            }
            EntryType::Manual => {
                let start_time = input.start_time.ok_or_else(|| {
                    validation_error("start_time", "Start time is required for manual entries")
                })?;
                if let Some(end_time) = input.end_time {
                    validate_time_order(start_time, end_time)?;
                }
                if let Some(end_odometer) = input.end_odometer {
                    validate_odometer("end_odometer", end_odometer)?;
                    validate_reading_order(input.start_odometer, end_odometer)?;
                }
                match (input.end_time, input.end_odometer, destination) {
                    (Some(end_time), Some(end_odometer), Some(destination)) => {
                        let destination = validate_destination(Some(destination.as_str()))?;
                        (
                            start_time,
                            Some(end_time),
                            Some(end_odometer),
                            Some(destination),
                            TripStatus::Completed,
                        )
                    }
                    (end_time, end_odometer, destination) => {
                        (start_time, end_time, end_odometer, destination, TripStatus::Ongoing)
                    }
                }
            }
        };

        let trip = Trip {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            driver_id: driver.id,
            start_time,
            end_time,
            start_odometer: input.start_odometer,
            end_odometer,
            origin: input.origin.trim().to_string(),
            destination,
            purpose: input.purpose.trim().to_string(),
            notes: input.notes.trim().to_string(),
            status,
            entry_type: input.entry_type,
            deletion: None,
            created_at: now,
            updated_at: now,
        };
        uow.insert_trip(&trip).await?;

        let (vehicle, warning) = apply_reconciliation(uow, TripEvent::Created, &trip, vehicle).await?;
        Ok(TripTransition {
            trip,
            vehicle,
            warning,
        })
    }

    pub async fn end(&self, trip_id: Uuid, input: EndTrip) -> AppResult<TripTransition> {
        let mut uow = self.store.begin().await?;
        let (mut trip, vehicle) = lock_for_transition(uow.as_mut(), trip_id).await?;
        ensure_ongoing(&trip, "end")?;

        let destination = validate_destination(input.destination.as_deref())?;
        validate_odometer("end_odometer", input.end_odometer)?;
        validate_reading_order(trip.start_odometer, input.end_odometer)?;

        let now = Utc::now();
        // Una hora de fin informada de antemano (entrada manual) se respeta
        trip.end_time = Some(trip.end_time.unwrap_or(now));
        trip.end_odometer = Some(input.end_odometer);
        trip.destination = Some(destination);
        if let Some(notes) = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            trip.notes = notes.to_string();
        }
        trip.status = TripStatus::Completed;
        trip.updated_at = now;
        uow.update_trip(&trip).await?;

        let (vehicle, warning) =
            apply_reconciliation(uow.as_mut(), TripEvent::Ended, &trip, vehicle).await?;
        uow.commit().await?;

        let transition = TripTransition {
            trip,
            vehicle,
            warning,
        };
        log_transition("ended", &transition);
        Ok(transition)
    }

    pub async fn cancel(&self, trip_id: Uuid, reason: Option<&str>) -> AppResult<TripTransition> {
        let mut uow = self.store.begin().await?;
        let (mut trip, vehicle) = lock_for_transition(uow.as_mut(), trip_id).await?;
        ensure_ongoing(&trip, "cancel")?;

        let now = Utc::now();
        trip.end_time = Some(now);
        trip.status = TripStatus::Cancelled;
        if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
            let line = format!("Trip cancelled: {}", reason);
            trip.notes = if trip.notes.is_empty() {
                line
            } else {
                format!("{}\n{}", line, trip.notes)
            };
        }
        trip.updated_at = now;
        uow.update_trip(&trip).await?;

        let (vehicle, warning) =
            apply_reconciliation(uow.as_mut(), TripEvent::Cancelled, &trip, vehicle).await?;
        uow.commit().await?;

        let transition = TripTransition {
            trip,
            vehicle,
            warning,
        };
        log_transition("cancelled", &transition);
        Ok(transition)
    }

    /// Borrado lógico idempotente: la primera marca (actor y fecha) se conserva
    pub async fn soft_delete(&self, trip_id: Uuid, actor_id: Uuid) -> AppResult<TripTransition> {
        let mut uow = self.store.begin().await?;
        let (mut trip, vehicle) = lock_for_transition(uow.as_mut(), trip_id).await?;

        if !trip.mark_deleted(actor_id, Utc::now()) {
            debug!(trip_id = %trip.id, "Trip already deleted, keeping first marker");
            return Ok(TripTransition {
                trip,
                vehicle,
                warning: None,
            });
        }
        uow.update_trip(&trip).await?;

        let (vehicle, warning) =
            apply_reconciliation(uow.as_mut(), TripEvent::SoftDeleted, &trip, vehicle).await?;
        uow.commit().await?;

        let transition = TripTransition {
            trip,
            vehicle,
            warning,
        };
        log_transition("deleted", &transition);
        Ok(transition)
    }

    pub async fn get(&self, trip_id: Uuid) -> AppResult<Trip> {
        let mut uow = self.store.begin().await?;
        uow.find_trip(trip_id)
            .await?
            .ok_or_else(|| not_found_error("Trip", trip_id))
    }

    pub async fn list(&self, filter: &TripFilter) -> AppResult<Vec<Trip>> {
        let mut uow = self.store.begin().await?;
        uow.find_trips(filter).await
    }
}

/// Orden de bloqueo fijo: vehículo primero, luego el viaje
async fn lock_for_transition(uow: &mut dyn UnitOfWork, trip_id: Uuid) -> AppResult<(Trip, Vehicle)> {
    let vehicle_id = uow
        .find_trip(trip_id)
        .await?
        .ok_or_else(|| not_found_error("Trip", trip_id))?
        .vehicle_id;
    let vehicle = uow
        .lock_vehicle(vehicle_id)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;
    let trip = uow
        .lock_trip(trip_id)
        .await?
        .ok_or_else(|| not_found_error("Trip", trip_id))?;
    Ok((trip, vehicle))
}

fn ensure_ongoing(trip: &Trip, operation: &str) -> AppResult<()> {
    if trip.is_deleted() {
        return Err(validation_error("trip_id", "Trip has been deleted"));
    }
    if trip.status != TripStatus::Ongoing {
        return Err(validation_error(
            "status",
            format!("Can only {} ongoing trips", operation),
        ));
    }
    Ok(())
}

/// Evalúa la política con el vehículo ya bloqueado y escribe el resultado.
/// Un fallo al escribir el vehículo no aborta la transición del viaje.
async fn apply_reconciliation(
    uow: &mut dyn UnitOfWork,
    event: TripEvent,
    trip: &Trip,
    vehicle: Vehicle,
) -> AppResult<(Vehicle, Option<ConsistencyWarning>)> {
    let high_water = if needs_high_water_mark(event, trip) {
        uow.highest_completed_end_odometer(vehicle.id, Some(trip.id))
            .await?
    } else {
        None
    };

    let Some(mut next) = reconcile(event, trip, &vehicle, high_water) else {
        return Ok((vehicle, None));
    };
    next.updated_at = Utc::now();

    match uow.save_vehicle_state(&next).await {
        Ok(()) => {
            debug!(
                vehicle_id = %next.id,
                status = next.status.as_str(),
                odometer = ?next.current_odometer,
                "Vehicle reconciled"
            );
            Ok((next, None))
        }
        Err(e) => {
            let warning = ConsistencyWarning {
                trip_id: trip.id,
                vehicle_id: vehicle.id,
                message: e.to_string(),
            };
            warn!("⚠️ {}", warning);
            Ok((vehicle, Some(warning)))
        }
    }
}

fn log_transition(action: &str, transition: &TripTransition) {
    info!(
        trip_id = %transition.trip.id,
        vehicle_id = %transition.vehicle.id,
        status = ?transition.trip.status,
        odometer = ?transition.vehicle.current_odometer,
        "🚗 Trip {}",
        action
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Driver;
    use crate::repositories::MemoryStore;
    use crate::utils::errors::AppError;
    use chrono::Duration;

    struct Fixture {
        store: MemoryStore,
        ledger: TripLedger,
        vehicle: Vehicle,
        driver: Driver,
    }

    async fn fixture(odometer: Option<i64>) -> Fixture {
        let store = MemoryStore::new();
        let vehicle = Vehicle::new("KA-01-1234", odometer, None);
        let driver = Driver::new("driver@fleet.test", "Test Driver");
        let mut uow = store.begin().await.unwrap();
        uow.insert_vehicle(&vehicle).await.unwrap();
        uow.insert_driver(&driver).await.unwrap();
        uow.commit().await.unwrap();
        let ledger = TripLedger::new(Arc::new(store.clone()));
        Fixture {
            store,
            ledger,
            vehicle,
            driver,
        }
    }

    fn end_input(end_odometer: i64, destination: &str) -> EndTrip {
        EndTrip {
            end_odometer,
            destination: Some(destination.to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_real_time_lifecycle_updates_vehicle() {
        let f = fixture(Some(1_000)).await;
        let started = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 1_000, "Depot"))
            .await
            .unwrap();
        assert_eq!(started.trip.status, TripStatus::Ongoing);
        assert_eq!(started.vehicle.status, VehicleStatus::InUse);

        let ended = f
            .ledger
            .end(started.trip.id, end_input(1_120, "Airport"))
            .await
            .unwrap();
        assert_eq!(ended.trip.status, TripStatus::Completed);
        assert!(ended.trip.end_time.is_some());
        assert_eq!(ended.vehicle.status, VehicleStatus::Available);
        assert_eq!(ended.vehicle.current_odometer, Some(1_120));
        assert!(ended.warning.is_none());
    }

    #[tokio::test]
    async fn test_end_rejects_non_increasing_odometer_and_short_destination() {
        let f = fixture(Some(1_000)).await;
        let trip = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 1_000, "Depot"))
            .await
            .unwrap()
            .trip;

        let err = f.ledger.end(trip.id, end_input(1_000, "Airport")).await.unwrap_err();
        assert!(err.is_validation());
        let err = f.ledger.end(trip.id, end_input(1_050, "AB")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "destination", .. }));

        // El viaje sigue abierto tras los rechazos
        assert_eq!(f.ledger.get(trip.id).await.unwrap().status, TripStatus::Ongoing);
    }

    #[tokio::test]
    async fn test_real_time_create_requires_available_vehicle_and_idle_driver() {
        let f = fixture(Some(0)).await;
        f.ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 0, "Depot"))
            .await
            .unwrap();

        let err = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 0, "Depot"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already has an active trip"));

        // Otro conductor libre no puede tomar un vehículo en uso
        let second = Driver::new("second@fleet.test", "Second Driver");
        let mut uow = f.store.begin().await.unwrap();
        uow.insert_driver(&second).await.unwrap();
        uow.commit().await.unwrap();
        let err = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, second.id, 0, "Depot"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "vehicle_id", .. }));
        assert!(err.to_string().contains("is not available (status: in_use)"));
    }

    #[tokio::test]
    async fn test_real_time_create_rejects_vehicle_in_maintenance() {
        let f = fixture(Some(0)).await;
        let mut workshop = Vehicle::new("KA-02-5678", Some(300), None);
        workshop.status = VehicleStatus::Maintenance;
        let mut uow = f.store.begin().await.unwrap();
        uow.insert_vehicle(&workshop).await.unwrap();
        uow.commit().await.unwrap();

        let err = f
            .ledger
            .create(CreateTrip::real_time(workshop.id, f.driver.id, 300, "Depot"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "vehicle_id", .. }));
        assert!(err.to_string().contains("status: maintenance"));

        // El conductor sigue libre para otro vehículo
        let started = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 0, "Depot"))
            .await
            .unwrap();
        assert_eq!(started.vehicle.status, VehicleStatus::InUse);
    }

    #[tokio::test]
    async fn test_create_validates_origin_and_start_odometer() {
        let f = fixture(None).await;
        let err = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, -1, "Depot"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let err = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 10, "  "))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let err = f
            .ledger
            .create(CreateTrip::real_time(Uuid::new_v4(), f.driver.id, 10, "Depot"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Lookup { entity: "vehicle", .. }));
    }

    #[tokio::test]
    async fn test_out_of_order_manual_entries_keep_high_water_mark() {
        let f = fixture(Some(100)).await;
        let day = Utc::now() - Duration::days(2);

        // B (150 → 300) se guarda primero, A (100 → 150) después
        let b = CreateTrip::manual(f.vehicle.id, f.driver.id, day + Duration::hours(3), 150, "Office")
            .ended(day + Duration::hours(5), 300, "Warehouse");
        let a = CreateTrip::manual(f.vehicle.id, f.driver.id, day, 100, "Depot")
            .ended(day + Duration::hours(2), 150, "Office");

        let after_b = f.ledger.create(b).await.unwrap();
        assert_eq!(after_b.vehicle.current_odometer, Some(300));
        let after_a = f.ledger.create(a).await.unwrap();
        assert_eq!(after_a.trip.status, TripStatus::Completed);
        assert_eq!(after_a.vehicle.current_odometer, Some(300));
        assert_eq!(after_a.vehicle.status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn test_manual_entry_without_all_end_fields_stays_ongoing() {
        let f = fixture(Some(100)).await;
        let start = Utc::now() - Duration::hours(6);
        let mut input = CreateTrip::manual(f.vehicle.id, f.driver.id, start, 100, "Depot");
        input.end_time = Some(start + Duration::hours(1));

        let created = f.ledger.create(input).await.unwrap();
        assert_eq!(created.trip.status, TripStatus::Ongoing);
        assert_eq!(created.vehicle.status, VehicleStatus::Available);

        let ended = f
            .ledger
            .end(created.trip.id, end_input(180, "Harbour"))
            .await
            .unwrap();
        assert_eq!(ended.trip.end_time, Some(start + Duration::hours(1)));
        assert_eq!(ended.vehicle.current_odometer, Some(180));
        assert_eq!(ended.vehicle.status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn test_manual_entry_rejects_inverted_times() {
        let f = fixture(None).await;
        let start = Utc::now() - Duration::hours(2);
        let input = CreateTrip::manual(f.vehicle.id, f.driver.id, start, 100, "Depot")
            .ended(start - Duration::minutes(5), 150, "Office");
        let err = f.ledger.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "end_time", .. }));
    }

    #[tokio::test]
    async fn test_cancel_releases_vehicle_and_records_reason() {
        let f = fixture(Some(500)).await;
        let trip = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 500, "Depot"))
            .await
            .unwrap()
            .trip;

        let cancelled = f.ledger.cancel(trip.id, Some("flat tyre")).await.unwrap();
        assert_eq!(cancelled.trip.status, TripStatus::Cancelled);
        assert_eq!(cancelled.trip.notes, "Trip cancelled: flat tyre");
        assert_eq!(cancelled.vehicle.status, VehicleStatus::Available);
        assert_eq!(cancelled.vehicle.current_odometer, Some(500));
    }

    #[tokio::test]
    async fn test_cancel_on_completed_trip_fails() {
        let f = fixture(Some(0)).await;
        let trip = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 0, "Depot"))
            .await
            .unwrap()
            .trip;
        f.ledger.end(trip.id, end_input(25, "Airport")).await.unwrap();

        let err = f.ledger.cancel(trip.id, None).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Can only cancel ongoing trips"));
    }

    #[tokio::test]
    async fn test_soft_delete_is_idempotent() {
        let f = fixture(Some(0)).await;
        let trip = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 0, "Depot"))
            .await
            .unwrap()
            .trip;

        let first_actor = Uuid::new_v4();
        let first = f.ledger.soft_delete(trip.id, first_actor).await.unwrap();
        let second = f.ledger.soft_delete(trip.id, Uuid::new_v4()).await.unwrap();
        assert_eq!(first.trip.deletion, second.trip.deletion);
        assert_eq!(second.trip.deletion.unwrap().deleted_by, first_actor);

        let err = f.ledger.end(trip.id, end_input(10, "Airport")).await.unwrap_err();
        assert!(err.to_string().contains("deleted"));

        assert!(f.ledger.list(&TripFilter::for_vehicle(f.vehicle.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_soft_delete_of_ongoing_real_time_trip_frees_vehicle_and_driver() {
        let f = fixture(Some(700)).await;
        let trip = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 700, "Depot"))
            .await
            .unwrap()
            .trip;

        let deleted = f.ledger.soft_delete(trip.id, Uuid::new_v4()).await.unwrap();
        assert_eq!(deleted.vehicle.status, VehicleStatus::Available);
        assert_eq!(deleted.vehicle.current_odometer, Some(700));
        assert!(deleted.warning.is_none());

        let restarted = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 700, "Depot"))
            .await
            .unwrap();
        assert_eq!(restarted.vehicle.status, VehicleStatus::InUse);
    }

    #[tokio::test]
    async fn test_failed_vehicle_write_surfaces_consistency_warning() {
        let f = fixture(Some(0)).await;
        let trip = f
            .ledger
            .create(CreateTrip::real_time(f.vehicle.id, f.driver.id, 0, "Depot"))
            .await
            .unwrap()
            .trip;

        f.store.set_fail_vehicle_writes(true);
        let ended = f.ledger.end(trip.id, end_input(40, "Airport")).await.unwrap();
        let warning = ended.warning.expect("warning expected");
        assert_eq!(warning.trip_id, trip.id);
        // El viaje quedó confirmado; el vehículo conserva su estado previo
        assert_eq!(f.ledger.get(trip.id).await.unwrap().status, TripStatus::Completed);
        assert_eq!(ended.vehicle.status, VehicleStatus::InUse);
    }
}
