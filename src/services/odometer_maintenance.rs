//! Mantenimiento del odómetro
//!
//! Camino de reparación de la proyección del vehículo: recalcula la marca de
//! agua sobre los viajes completados no borrados y solo aplica subidas (las
//! bajadas se informan pero quedan como corrección administrativa), y vuelve
//! a derivar el estado `in_use`/`available` de los viajes en curso.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{EntryType, TripStatus, VehicleStatus};
use crate::repositories::{Store, TripFilter};
use crate::utils::errors::{not_found_error, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct OdometerOutcome {
    pub vehicle_id: Uuid,
    pub license_plate: String,
    pub old: Option<i64>,
    /// Marca de agua calculada sobre los viajes
    pub new: Option<i64>,
    pub old_status: VehicleStatus,
    /// Estado derivado de los viajes en tiempo real en curso
    pub new_status: VehicleStatus,
    pub changed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub completed_without_end_time: Vec<Uuid>,
    pub invalid_odometer_trips: Vec<Uuid>,
    pub vehicles_without_odometer: Vec<Uuid>,
    pub vehicles_in_use_without_trip: Vec<Uuid>,
}

impl IntegrityReport {
    pub fn issue_count(&self) -> usize {
        self.completed_without_end_time.len()
            + self.invalid_odometer_trips.len()
            + self.vehicles_without_odometer.len()
            + self.vehicles_in_use_without_trip.len()
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }
}

#[derive(Clone)]
pub struct OdometerMaintenance {
    store: Arc<dyn Store>,
}

impl OdometerMaintenance {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Recalcula un vehículo o toda la flota. Cada vehículo se repara en su
    /// propia unidad de trabajo con el vehículo bloqueado: el odómetro sube
    /// hasta la marca de agua y el estado `in_use`/`available` se deriva de
    /// los viajes en tiempo real en curso.
    pub async fn recompute_odometer(
        &self,
        vehicle_id: Option<Uuid>,
        dry_run: bool,
    ) -> AppResult<Vec<OdometerOutcome>> {
        let vehicle_ids = match vehicle_id {
            Some(id) => vec![id],
            None => {
                let mut uow = self.store.begin().await?;
                uow.list_vehicles().await?.into_iter().map(|v| v.id).collect()
            }
        };

        let mut outcomes = Vec::with_capacity(vehicle_ids.len());
        for id in vehicle_ids {
            let mut uow = self.store.begin().await?;
            let vehicle = uow
                .lock_vehicle(id)
                .await?
                .ok_or_else(|| not_found_error("Vehicle", id))?;
            let high_water = uow.highest_completed_end_odometer(id, None).await?;

            let (odometer_changed, odometer_reason) =
                match (high_water, vehicle.current_odometer) {
                    (None, _) => (false, "no completed trips"),
                    (Some(mark), Some(current)) if mark == current => (false, "in sync"),
                    (Some(mark), Some(current)) if mark < current => {
                        warn!(
                            vehicle_id = %id,
                            current,
                            mark,
                            "⚠️ Odometer above the trip high-water mark, left for manual correction"
                        );
                        (false, "high-water mark below current reading, not applied")
                    }
                    (Some(_), _) => (true, "raised to high-water mark"),
                };

            let ongoing = TripFilter {
                vehicle_id: Some(id),
                status: Some(TripStatus::Ongoing),
                entry_type: Some(EntryType::RealTime),
                ..Default::default()
            };
            let busy = !uow.find_trips(&ongoing).await?.is_empty();
            let status = derived_status(vehicle.status, busy);
            let status_changed = status != vehicle.status;

            let mut reason = odometer_reason.to_string();
            if status_changed {
                reason.push_str(&format!(
                    "; status {} -> {}",
                    vehicle.status.as_str(),
                    status.as_str()
                ));
            }

            let mut next = vehicle.clone();
            if odometer_changed {
                next.current_odometer = high_water;
            }
            next.status = status;

            let changed = odometer_changed || status_changed;
            if changed && !dry_run {
                next.updated_at = Utc::now();
                uow.save_vehicle_state(&next).await?;
                uow.commit().await?;
                info!(
                    vehicle_id = %id,
                    old = ?vehicle.current_odometer,
                    new = ?next.current_odometer,
                    status = next.status.as_str(),
                    "🔧 Vehicle projection recomputed"
                );
            }

            outcomes.push(OdometerOutcome {
                vehicle_id: id,
                license_plate: vehicle.license_plate,
                old: vehicle.current_odometer,
                new: high_water,
                old_status: vehicle.status,
                new_status: next.status,
                changed,
                reason,
            });
        }
        Ok(outcomes)
    }

    /// Auditoría de solo lectura sobre viajes vivos y vehículos
    pub async fn integrity_report(&self) -> AppResult<IntegrityReport> {
        let mut uow = self.store.begin().await?;
        let vehicles = uow.list_vehicles().await?;
        let trips = uow.find_trips(&TripFilter::default()).await?;

        let mut report = IntegrityReport::default();
        for trip in &trips {
            if trip.status == TripStatus::Completed && trip.end_time.is_none() {
                report.completed_without_end_time.push(trip.id);
            }
            if matches!(trip.end_odometer, Some(end) if end <= trip.start_odometer) {
                report.invalid_odometer_trips.push(trip.id);
            }
        }

        let busy: HashSet<Uuid> = trips
            .iter()
            .filter(|t| t.status == TripStatus::Ongoing && t.entry_type == EntryType::RealTime)
            .map(|t| t.vehicle_id)
            .collect();
        for vehicle in &vehicles {
            if vehicle.current_odometer.is_none() {
                report.vehicles_without_odometer.push(vehicle.id);
            }
            if vehicle.status == VehicleStatus::InUse && !busy.contains(&vehicle.id) {
                report.vehicles_in_use_without_trip.push(vehicle.id);
            }
        }

        if report.is_clean() {
            info!("✅ No data integrity issues found");
        } else {
            warn!("⚠️ Found {} data integrity issues", report.issue_count());
        }
        Ok(report)
    }
}

/// `maintenance` y `retired` son decisiones administrativas y no se tocan
fn derived_status(current: VehicleStatus, busy: bool) -> VehicleStatus {
    match current {
        VehicleStatus::Maintenance | VehicleStatus::Retired => current,
        _ if busy => VehicleStatus::InUse,
        _ => VehicleStatus::Available,
    }
}
