//! Modelo de ConsultantRate
//!
//! Tarifa negociada por kilómetro para un par (conductor, vehículo). Este
//! módulo no conoce los viajes: recibe distancias y devuelve importes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "rate_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ConsultantRate {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub rate_per_km: Decimal,
    pub status: RateStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsultantRate {
    /// Tarifa mínima aceptada (0.01 por km)
    pub fn minimum_rate() -> Decimal {
        Decimal::new(1, 2)
    }

    pub fn is_active(&self) -> bool {
        self.status == RateStatus::Active
    }

    /// Pago por una distancia dada; 0 para distancias no positivas
    pub fn calculate_payment(&self, distance_km: i64) -> Decimal {
        if distance_km <= 0 {
            return Decimal::ZERO;
        }
        self.rate_per_km * Decimal::from(distance_km)
    }
}
