//! Modelo de Trip
//!
//! Entidad central del ledger. Las transiciones (`end`, `cancel`,
//! `soft_delete`) las orquesta `services::trip_ledger`; aquí solo viven los
//! tipos y los valores derivados de solo lectura.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use super::vehicle::Vehicle;

/// Estado del viaje - mapea al ENUM trip_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "trip_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Ongoing,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TripStatus::Ongoing)
    }
}

/// Canal por el que entró el viaje - mapea al ENUM trip_entry_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "trip_entry_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Abierto y cerrado por el conductor durante el uso real
    RealTime,
    /// Registrado a posteriori por un gestor, en cualquier orden
    Manual,
}

/// Marca de borrado lógico; una vez puesta no cambia
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub deleted_by: Uuid,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_odometer: i64,
    pub end_odometer: Option<i64>,
    pub origin: String,
    pub destination: Option<String>,
    pub purpose: String,
    pub notes: String,
    pub status: TripStatus,
    pub entry_type: EntryType,
    pub deletion: Option<Deletion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn is_deleted(&self) -> bool {
        self.deletion.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.status == TripStatus::Ongoing
    }

    /// Distancia recorrida en km; 0 si falta alguna lectura
    pub fn distance(&self) -> i64 {
        match self.end_odometer {
            Some(end) => (end - self.start_odometer).max(0),
            None => 0,
        }
    }

    /// Duración medida contra `now` cuando el viaje sigue abierto
    pub fn duration_at(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).max(Duration::zero())
    }

    pub fn duration(&self) -> Duration {
        self.duration_at(Utc::now())
    }

    /// Coste interno del viaje según la tarifa por km del vehículo
    pub fn trip_cost(&self, vehicle: &Vehicle) -> Decimal {
        match vehicle.rate_per_km {
            Some(rate) if self.distance() > 0 => rate * Decimal::from(self.distance()),
            _ => Decimal::ZERO,
        }
    }

    pub fn route_summary(&self) -> String {
        format!(
            "{} → {}",
            self.origin,
            self.destination.as_deref().unwrap_or("TBD")
        )
    }

    /// Marca el viaje como borrado. Devuelve `false` si ya lo estaba, en cuyo
    /// caso el actor y la fecha originales se conservan.
    pub fn mark_deleted(&mut self, actor: Uuid, now: DateTime<Utc>) -> bool {
        if self.deletion.is_some() {
            return false;
        }
        self.deletion = Some(Deletion {
            deleted_by: actor,
            deleted_at: now,
        });
        self.updated_at = now;
        true
    }
}

/// Etiqueta compacta de una duración: `1d 2h 5m`, `45m`, `30s`, `0m`
pub fn duration_label(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let days = total_seconds / 86_400;
    let hours = (total_seconds / 3_600) % 24;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if parts.is_empty() && seconds > 0 {
        parts.push(format!("{}s", seconds));
    }
    if parts.is_empty() {
        return "0m".to_string();
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trip() -> Trip {
        let start = Utc::now() - Duration::hours(2);
        Trip {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            start_time: start,
            end_time: None,
            start_odometer: 1_000,
            end_odometer: None,
            origin: "Depot".to_string(),
            destination: None,
            purpose: "Delivery".to_string(),
            notes: String::new(),
            status: TripStatus::Ongoing,
            entry_type: EntryType::RealTime,
            deletion: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_distance_requires_both_readings() {
        let mut trip = sample_trip();
        assert_eq!(trip.distance(), 0);
        trip.end_odometer = Some(1_042);
        assert_eq!(trip.distance(), 42);
        // Nunca negativa aunque los datos heredados estén mal
        trip.end_odometer = Some(900);
        assert_eq!(trip.distance(), 0);
    }

    #[test]
    fn test_duration_is_live_for_ongoing_trips() {
        let trip = sample_trip();
        let now = trip.start_time + Duration::minutes(90);
        assert_eq!(trip.duration_at(now), Duration::minutes(90));
        assert_eq!(trip.duration_at(now + Duration::minutes(10)), Duration::minutes(100));
    }

    #[test]
    fn test_duration_uses_end_time_when_present() {
        let mut trip = sample_trip();
        trip.end_time = Some(trip.start_time + Duration::minutes(30));
        let much_later = trip.start_time + Duration::days(3);
        assert_eq!(trip.duration_at(much_later), Duration::minutes(30));
    }

    #[test]
    fn test_duration_label() {
        assert_eq!(duration_label(Duration::zero()), "0m");
        assert_eq!(duration_label(Duration::seconds(30)), "30s");
        assert_eq!(duration_label(Duration::minutes(45)), "45m");
        assert_eq!(
            duration_label(Duration::days(1) + Duration::hours(2) + Duration::minutes(5)),
            "1d 2h 5m"
        );
        assert_eq!(duration_label(Duration::hours(3) + Duration::seconds(20)), "3h");
    }

    #[test]
    fn test_trip_cost_uses_vehicle_rate() {
        let mut trip = sample_trip();
        trip.end_odometer = Some(1_010);
        let mut vehicle = Vehicle::new("mh-12-ab-1234", Some(1_000), None);
        assert_eq!(trip.trip_cost(&vehicle), Decimal::ZERO);
        vehicle.rate_per_km = Some(Decimal::new(1250, 2));
        assert_eq!(trip.trip_cost(&vehicle), Decimal::new(12500, 2));
    }

    #[test]
    fn test_mark_deleted_keeps_first_marker() {
        let mut trip = sample_trip();
        let first_actor = Uuid::new_v4();
        let first_at = Utc::now();
        assert!(trip.mark_deleted(first_actor, first_at));
        assert!(!trip.mark_deleted(Uuid::new_v4(), first_at + Duration::hours(1)));
        let deletion = trip.deletion.unwrap();
        assert_eq!(deletion.deleted_by, first_actor);
        assert_eq!(deletion.deleted_at, first_at);
    }

    #[test]
    fn test_route_summary() {
        let mut trip = sample_trip();
        assert_eq!(trip.route_summary(), "Depot → TBD");
        trip.destination = Some("Airport".to_string());
        assert_eq!(trip.route_summary(), "Depot → Airport");
    }
}
