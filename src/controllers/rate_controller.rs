use std::sync::Arc;

use uuid::Uuid;

use crate::dto::common_dto::ApiResponse;
use crate::dto::rate_dto::{ActivateRateRequest, PaymentReportQuery, RateListQuery};
use crate::models::ConsultantRate;
use crate::services::authorization_service::{require, Actor, PermissionOracle};
use crate::services::{
    IntegrityReport, OdometerMaintenance, PaymentCalculator, PaymentReport, RateDirectory,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Tarifas de consultores, informe de pagos y auditoría de integridad
pub struct RateController {
    rates: RateDirectory,
    payments: PaymentCalculator,
    maintenance: OdometerMaintenance,
    permissions: Arc<dyn PermissionOracle>,
}

impl RateController {
    pub fn new(state: &AppState) -> Self {
        Self {
            rates: state.rates.clone(),
            payments: state.payments.clone(),
            maintenance: state.maintenance.clone(),
            permissions: state.permissions.clone(),
        }
    }

    pub async fn list(
        &self,
        actor: &Actor,
        query: RateListQuery,
    ) -> Result<Vec<ConsultantRate>, AppError> {
        require(self.permissions.can_manage_rates(actor), "list rates")?;
        self.rates.list_rates(query.status).await
    }

    pub async fn activate(
        &self,
        actor: &Actor,
        request: ActivateRateRequest,
    ) -> Result<ApiResponse<ConsultantRate>, AppError> {
        require(self.permissions.can_manage_rates(actor), "activate rate")?;
        let rate = self
            .rates
            .activate(
                request.driver_id,
                request.vehicle_id,
                request.rate_per_km,
                request.notes.as_deref().unwrap_or_default(),
            )
            .await?;
        Ok(ApiResponse::success_with_message(
            rate,
            "Tarifa activada".to_string(),
        ))
    }

    pub async fn reactivate(
        &self,
        actor: &Actor,
        rate_id: Uuid,
    ) -> Result<ApiResponse<ConsultantRate>, AppError> {
        require(self.permissions.can_manage_rates(actor), "activate rate")?;
        let rate = self.rates.reactivate(rate_id).await?;
        Ok(ApiResponse::success_with_message(
            rate,
            "Tarifa activada".to_string(),
        ))
    }

    pub async fn deactivate(
        &self,
        actor: &Actor,
        rate_id: Uuid,
    ) -> Result<ApiResponse<ConsultantRate>, AppError> {
        require(self.permissions.can_manage_rates(actor), "deactivate rate")?;
        let rate = self.rates.deactivate(rate_id).await?;
        Ok(ApiResponse::success_with_message(
            rate,
            "Tarifa desactivada".to_string(),
        ))
    }

    pub async fn payment_report(
        &self,
        actor: &Actor,
        query: PaymentReportQuery,
    ) -> Result<PaymentReport, AppError> {
        require(self.permissions.can_manage_rates(actor), "view payment report")?;
        self.payments.consultant_report(&query.into()).await
    }

    pub async fn integrity(&self, actor: &Actor) -> Result<IntegrityReport, AppError> {
        require(self.permissions.can_maintain_fleet(actor), "run integrity audit")?;
        self.maintenance.integrity_report().await
    }
}
