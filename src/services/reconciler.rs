//! Reconciliador de odómetro
//!
//! Política pura: dada una transición confirmada de un viaje y el estado
//! bloqueado del vehículo, decide el nuevo estado derivado del vehículo.
//! No toca almacenamiento; `trip_ledger` aplica el resultado.

use tracing::warn;

use crate::models::{EntryType, Trip, TripStatus, Vehicle, VehicleStatus};

/// Transición del viaje que dispara la reconciliación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripEvent {
    Created,
    Ended,
    Cancelled,
    SoftDeleted,
}

/// Solo las finalizaciones manuales comparan contra la marca de agua
pub fn needs_high_water_mark(event: TripEvent, trip: &Trip) -> bool {
    matches!(event, TripEvent::Created | TripEvent::Ended)
        && trip.entry_type == EntryType::Manual
        && trip.status == TripStatus::Completed
        && trip.end_odometer.is_some()
}

/// Devuelve el vehículo actualizado, o `None` si la transición no lo afecta.
///
/// `sibling_high_water` es el mayor `end_odometer` de los demás viajes
/// completados y no borrados del vehículo (solo se consulta para entradas
/// manuales, ver [`needs_high_water_mark`]).
pub fn reconcile(
    event: TripEvent,
    trip: &Trip,
    vehicle: &Vehicle,
    sibling_high_water: Option<i64>,
) -> Option<Vehicle> {
    let mut next = vehicle.clone();

    match trip.entry_type {
        EntryType::RealTime => match (event, trip.status) {
            (TripEvent::Created, TripStatus::Ongoing) => {
                next.status = VehicleStatus::InUse;
                if next.current_odometer.is_none() {
                    next.current_odometer = Some(trip.start_odometer);
                }
            }
            (TripEvent::Ended, TripStatus::Completed) => {
                next.status = VehicleStatus::Available;
                let reading = match trip.end_odometer {
                    Some(end) if end > 0 => end,
                    other => {
                        // Inalcanzable mientras `end` valide end > start >= 0
                        warn!(
                            trip_id = %trip.id,
                            end_odometer = ?other,
                            "⚠️ Lectura final no positiva, se usa el odómetro inicial"
                        );
                        trip.start_odometer
                    }
                };
                next.current_odometer = Some(match vehicle.current_odometer {
                    Some(current) if current > reading => {
                        warn!(
                            trip_id = %trip.id,
                            vehicle_id = %vehicle.id,
                            current,
                            reading,
                            "⚠️ Lectura en tiempo real por debajo de la marca de agua, no se retrocede"
                        );
                        current
                    }
                    _ => reading,
                });
            }
            (TripEvent::Cancelled, TripStatus::Cancelled) => {
                next.status = VehicleStatus::Available;
                if next.current_odometer.is_none() {
                    next.current_odometer = Some(trip.start_odometer);
                }
            }
            // Un viaje en curso borrado ya no puede cerrarse ni cancelarse
            (TripEvent::SoftDeleted, TripStatus::Ongoing) => {
                if vehicle.status != VehicleStatus::InUse {
                    return None;
                }
                next.status = VehicleStatus::Available;
            }
            _ => return None,
        },
        EntryType::Manual => {
            if !needs_high_water_mark(event, trip) {
                return None;
            }
            let end = trip.end_odometer?;
            let above_current = vehicle.current_odometer.map_or(true, |current| end > current);
            let above_siblings = sibling_high_water.map_or(true, |highest| end >= highest);
            if !(above_current && above_siblings) {
                return None;
            }
            next.current_odometer = Some(end);
        }
    }

    if next.status == vehicle.status && next.current_odometer == vehicle.current_odometer {
        return None;
    }
    Some(next)
}
