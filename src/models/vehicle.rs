//! Modelo de Vehicle
//!
//! Identidad del vehículo más su estado operativo derivado (`status`,
//! `current_odometer`), que solo el reconciliador modifica automáticamente.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InUse,
    Maintenance,
    Retired,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::InUse => "in_use",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::Retired => "retired",
        }
    }
}

/// Vehicle principal - mapea exactamente a la tabla vehicles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub status: VehicleStatus,
    pub current_odometer: Option<i64>,
    /// Coste interno por kilómetro, base de `Trip::trip_cost`
    pub rate_per_km: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Nuevo vehículo disponible, matrícula normalizada en mayúsculas
    pub fn new(license_plate: &str, current_odometer: Option<i64>, rate_per_km: Option<Decimal>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            license_plate: license_plate.trim().to_uppercase(),
            status: VehicleStatus::Available,
            current_odometer,
            rate_per_km,
            created_at: now,
            updated_at: now,
        }
    }
}
