//! Utilidades de validación
//!
//! Reglas compartidas por el ledger y el importador masivo. Todas devuelven
//! `AppError::Validation` con el campo ofensor.

use chrono::{DateTime, Utc};

use crate::utils::errors::{validation_error, AppResult};

/// Longitud mínima de un destino para poder cerrar un viaje
pub const MIN_DESTINATION_LEN: usize = 3;

/// Validar que un string no esté vacío
pub fn validate_not_empty(field: &'static str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(validation_error(field, format!("{} is required", field)));
    }
    Ok(())
}

/// Validar el destino exigido al completar un viaje
pub fn validate_destination(destination: Option<&str>) -> AppResult<String> {
    match destination.map(str::trim) {
        Some(d) if d.chars().count() >= MIN_DESTINATION_LEN => Ok(d.to_string()),
        _ => Err(validation_error(
            "destination",
            "Destination is required to end the trip",
        )),
    }
}

/// Validar una lectura de odómetro
pub fn validate_odometer(field: &'static str, reading: i64) -> AppResult<()> {
    if reading < 0 {
        return Err(validation_error(
            field,
            format!("Odometer reading ({}) cannot be negative", reading),
        ));
    }
    Ok(())
}

/// Validar que la lectura final supere estrictamente a la inicial
pub fn validate_reading_order(start_odometer: i64, end_odometer: i64) -> AppResult<()> {
    if end_odometer <= start_odometer {
        return Err(validation_error(
            "end_odometer",
            format!(
                "End odometer ({}) must be greater than start odometer ({})",
                end_odometer, start_odometer
            ),
        ));
    }
    Ok(())
}

/// Validar que la hora de fin sea posterior a la de inicio
pub fn validate_time_order(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> AppResult<()> {
    if end_time <= start_time {
        return Err(validation_error(
            "end_time",
            "End time must be after start time",
        ));
    }
    Ok(())
}
