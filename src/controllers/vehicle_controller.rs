use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::common_dto::ApiResponse;
use crate::dto::vehicle_dto::{CreateDriverRequest, CreateVehicleRequest};
use crate::models::{Driver, Vehicle};
use crate::services::authorization_service::{require, Actor, PermissionOracle};
use crate::services::{FleetRegistry, OdometerMaintenance, OdometerOutcome};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct VehicleController {
    fleet: FleetRegistry,
    maintenance: OdometerMaintenance,
    permissions: Arc<dyn PermissionOracle>,
}

impl VehicleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            fleet: state.fleet.clone(),
            maintenance: state.maintenance.clone(),
            permissions: state.permissions.clone(),
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateVehicleRequest,
    ) -> Result<ApiResponse<Vehicle>, AppError> {
        require(self.permissions.can_maintain_fleet(actor), "register vehicle")?;
        request.validate()?;

        let vehicle = self
            .fleet
            .register_vehicle(
                &request.license_plate,
                request.current_odometer,
                request.rate_per_km,
            )
            .await?;

        Ok(ApiResponse::success_with_message(
            vehicle,
            "Vehículo creado exitosamente".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Vehicle, AppError> {
        self.fleet.get_vehicle(id).await
    }

    pub async fn list(&self) -> Result<Vec<Vehicle>, AppError> {
        self.fleet.list_vehicles().await
    }

    pub async fn create_driver(
        &self,
        actor: &Actor,
        request: CreateDriverRequest,
    ) -> Result<ApiResponse<Driver>, AppError> {
        require(self.permissions.can_maintain_fleet(actor), "register driver")?;
        request.validate()?;

        let driver = self
            .fleet
            .register_driver(&request.email, &request.full_name)
            .await?;

        Ok(ApiResponse::success_with_message(
            driver,
            "Conductor creado exitosamente".to_string(),
        ))
    }

    pub async fn recompute_odometer(
        &self,
        actor: &Actor,
        id: Uuid,
        dry_run: bool,
    ) -> Result<ApiResponse<OdometerOutcome>, AppError> {
        require(self.permissions.can_maintain_fleet(actor), "recompute odometer")?;

        let outcome = self
            .maintenance
            .recompute_odometer(Some(id), dry_run)
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("recompute returned no outcome".to_string()))?;

        let message = if dry_run {
            "Simulación de recálculo".to_string()
        } else {
            format!("Odómetro: {}", outcome.reason)
        };
        Ok(ApiResponse::success_with_message(outcome, message))
    }
}
