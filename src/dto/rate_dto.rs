use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::RateStatus;
use crate::services::payment_calculator::ReportQuery;

// Request para activar una tarifa nueva para un par conductor-vehículo
#[derive(Debug, Deserialize)]
pub struct ActivateRateRequest {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub rate_per_km: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RateListQuery {
    pub status: Option<RateStatus>,
}

// Parámetros del informe de pagos a consultores
#[derive(Debug, Deserialize)]
pub struct PaymentReportQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
}

impl From<PaymentReportQuery> for ReportQuery {
    fn from(query: PaymentReportQuery) -> Self {
        ReportQuery {
            from: query.from,
            to: query.to,
            driver_id: query.driver_id,
            vehicle_id: query.vehicle_id,
        }
    }
}
