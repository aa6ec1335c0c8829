//! Registro de vehículos y conductores
//!
//! Alta y consulta de las entidades que el ledger referencia. El estado
//! derivado del vehículo no se edita aquí.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::models::{Driver, Vehicle};
use crate::repositories::Store;
use crate::utils::errors::{not_found_error, validation_error, AppResult};
use crate::utils::validation::{validate_not_empty, validate_odometer};

#[derive(Clone)]
pub struct FleetRegistry {
    store: Arc<dyn Store>,
}

impl FleetRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn register_vehicle(
        &self,
        license_plate: &str,
        current_odometer: Option<i64>,
        rate_per_km: Option<Decimal>,
    ) -> AppResult<Vehicle> {
        validate_not_empty("license_plate", license_plate)?;
        if let Some(reading) = current_odometer {
            validate_odometer("current_odometer", reading)?;
        }
        if matches!(rate_per_km, Some(rate) if rate < Decimal::ZERO) {
            return Err(validation_error("rate_per_km", "Rate per km cannot be negative"));
        }

        let vehicle = Vehicle::new(license_plate, current_odometer, rate_per_km);
        let mut uow = self.store.begin().await?;
        uow.insert_vehicle(&vehicle).await?;
        uow.commit().await?;

        info!("🚐 Vehicle {} registered ({})", vehicle.license_plate, vehicle.id);
        Ok(vehicle)
    }

    pub async fn get_vehicle(&self, id: Uuid) -> AppResult<Vehicle> {
        let mut uow = self.store.begin().await?;
        uow.find_vehicle(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", id))
    }

    pub async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let mut uow = self.store.begin().await?;
        uow.list_vehicles().await
    }

    pub async fn register_driver(&self, email: &str, full_name: &str) -> AppResult<Driver> {
        validate_not_empty("email", email)?;
        if !email.contains('@') {
            return Err(validation_error("email", "Email address is not valid"));
        }
        validate_not_empty("full_name", full_name)?;

        let driver = Driver::new(email, full_name);
        let mut uow = self.store.begin().await?;
        uow.insert_driver(&driver).await?;
        uow.commit().await?;

        info!("🧑 Driver {} registered ({})", driver.email, driver.id);
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;

    #[tokio::test]
    async fn test_plates_are_unique_case_insensitively() {
        let registry = FleetRegistry::new(Arc::new(MemoryStore::new()));
        let vehicle = registry.register_vehicle("ka-01-aa-1", Some(10), None).await.unwrap();
        assert_eq!(vehicle.license_plate, "KA-01-AA-1");
        let err = registry.register_vehicle("KA-01-AA-1", None, None).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_register_driver_validates_input() {
        let registry = FleetRegistry::new(Arc::new(MemoryStore::new()));
        assert!(registry.register_driver("not-an-email", "X").await.is_err());
        let driver = registry.register_driver("Ana@Fleet.Test", "Ana").await.unwrap();
        assert_eq!(driver.email, "ana@fleet.test");
    }
}
