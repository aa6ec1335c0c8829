//! Directorio de tarifas de consultores
//!
//! Mapea (conductor, vehículo) a su única tarifa activa. La unicidad la
//! garantiza `activate`/`reactivate` desactivando las demás tarifas del par
//! dentro de la misma unidad de trabajo. No conoce los viajes.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::models::{ConsultantRate, RateStatus};
use crate::repositories::{Store, UnitOfWork};
use crate::utils::errors::{lookup_error, not_found_error, validation_error, AppResult};

#[derive(Clone)]
pub struct RateDirectory {
    store: Arc<dyn Store>,
}

impl RateDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get_active_rate(
        &self,
        driver_id: Uuid,
        vehicle_id: Uuid,
    ) -> AppResult<Option<ConsultantRate>> {
        let mut uow = self.store.begin().await?;
        uow.active_rate(driver_id, vehicle_id).await
    }

    /// Registra una tarifa nueva como la activa del par
    pub async fn activate(
        &self,
        driver_id: Uuid,
        vehicle_id: Uuid,
        rate_per_km: Decimal,
        notes: &str,
    ) -> AppResult<ConsultantRate> {
        if rate_per_km < ConsultantRate::minimum_rate() {
            return Err(validation_error(
                "rate_per_km",
                format!("Rate per km must be at least {}", ConsultantRate::minimum_rate()),
            ));
        }

        let mut uow = self.store.begin().await?;
        uow.find_driver(driver_id)
            .await?
            .ok_or_else(|| lookup_error("driver", driver_id))?;
        uow.find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| lookup_error("vehicle", vehicle_id))?;

        let now = Utc::now();
        let rate = ConsultantRate {
            id: Uuid::new_v4(),
            driver_id,
            vehicle_id,
            rate_per_km,
            status: RateStatus::Active,
            notes: notes.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        let replaced = uow
            .deactivate_rates_for_pair(driver_id, vehicle_id, None)
            .await?;
        uow.insert_rate(&rate).await?;
        uow.commit().await?;

        info!(
            rate_id = %rate.id,
            %driver_id,
            %vehicle_id,
            %rate_per_km,
            replaced,
            "💶 Consultant rate activated"
        );
        Ok(rate)
    }

    /// Vuelve a activar una tarifa existente, desactivando la que hubiera
    pub async fn reactivate(&self, rate_id: Uuid) -> AppResult<ConsultantRate> {
        let mut uow = self.store.begin().await?;
        let mut rate = find_rate(uow.as_mut(), rate_id).await?;
        if rate.is_active() {
            return Ok(rate);
        }

        let replaced = uow
            .deactivate_rates_for_pair(rate.driver_id, rate.vehicle_id, Some(rate.id))
            .await?;
        uow.set_rate_status(rate.id, RateStatus::Active).await?;
        uow.commit().await?;

        rate.status = RateStatus::Active;
        rate.updated_at = Utc::now();
        info!(rate_id = %rate.id, replaced, "💶 Consultant rate reactivated");
        Ok(rate)
    }

    pub async fn deactivate(&self, rate_id: Uuid) -> AppResult<ConsultantRate> {
        let mut uow = self.store.begin().await?;
        let mut rate = find_rate(uow.as_mut(), rate_id).await?;
        if !rate.is_active() {
            return Ok(rate);
        }

        uow.set_rate_status(rate.id, RateStatus::Inactive).await?;
        uow.commit().await?;

        rate.status = RateStatus::Inactive;
        rate.updated_at = Utc::now();
        info!(rate_id = %rate.id, "💶 Consultant rate deactivated");
        Ok(rate)
    }

    pub async fn list_rates(&self, status: Option<RateStatus>) -> AppResult<Vec<ConsultantRate>> {
        let mut uow = self.store.begin().await?;
        uow.list_rates(status).await
    }
}

async fn find_rate(uow: &mut dyn UnitOfWork, rate_id: Uuid) -> AppResult<ConsultantRate> {
    uow.find_rate(rate_id)
        .await?
        .ok_or_else(|| not_found_error("Consultant rate", rate_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Driver, Vehicle};
    use crate::repositories::MemoryStore;

    async fn seeded() -> (RateDirectory, Uuid, Uuid) {
        let store = MemoryStore::new();
        let vehicle = Vehicle::new("DL-3C-0001", Some(0), None);
        let driver = Driver::new("consultant@fleet.test", "Consultant");
        let mut uow = store.begin().await.unwrap();
        uow.insert_vehicle(&vehicle).await.unwrap();
        uow.insert_driver(&driver).await.unwrap();
        uow.commit().await.unwrap();
        (RateDirectory::new(Arc::new(store)), driver.id, vehicle.id)
    }

    async fn active_count(rates: &RateDirectory, driver_id: Uuid, vehicle_id: Uuid) -> usize {
        rates
            .list_rates(Some(RateStatus::Active))
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.driver_id == driver_id && r.vehicle_id == vehicle_id)
            .count()
    }

    #[tokio::test]
    async fn test_activate_leaves_exactly_one_active_rate() {
        let (rates, driver_id, vehicle_id) = seeded().await;
        let first = rates
            .activate(driver_id, vehicle_id, Decimal::new(1200, 2), "initial")
            .await
            .unwrap();
        let second = rates
            .activate(driver_id, vehicle_id, Decimal::new(1500, 2), "renegotiated")
            .await
            .unwrap();

        assert_eq!(active_count(&rates, driver_id, vehicle_id).await, 1);
        let active = rates.get_active_rate(driver_id, vehicle_id).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);

        // Reactivar la primera desplaza a la segunda
        rates.reactivate(first.id).await.unwrap();
        assert_eq!(active_count(&rates, driver_id, vehicle_id).await, 1);
        let active = rates.get_active_rate(driver_id, vehicle_id).await.unwrap().unwrap();
        assert_eq!(active.id, first.id);
    }

    #[tokio::test]
    async fn test_deactivate_can_leave_pair_without_rate() {
        let (rates, driver_id, vehicle_id) = seeded().await;
        let rate = rates
            .activate(driver_id, vehicle_id, Decimal::new(1000, 2), "")
            .await
            .unwrap();
        let rate = rates.deactivate(rate.id).await.unwrap();
        assert_eq!(rate.status, RateStatus::Inactive);
        assert!(rates.get_active_rate(driver_id, vehicle_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activate_rejects_rates_below_minimum() {
        let (rates, driver_id, vehicle_id) = seeded().await;
        let err = rates
            .activate(driver_id, vehicle_id, Decimal::ZERO, "")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let err = rates
            .activate(Uuid::new_v4(), vehicle_id, Decimal::ONE, "")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "LOOKUP_ERROR");
    }
}
