use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

// Request para registrar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 20))]
    pub license_plate: String,
    #[validate(range(min = 0))]
    pub current_odometer: Option<i64>,
    pub rate_per_km: Option<Decimal>,
}

// Request para registrar un conductor
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDriverRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 150))]
    pub full_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecomputeQuery {
    #[serde(default)]
    pub dry_run: bool,
}
