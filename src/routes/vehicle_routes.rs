use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::vehicle_dto::{CreateDriverRequest, CreateVehicleRequest, RecomputeQuery};
use crate::middleware::auth::AuthenticatedActor;
use crate::models::{Driver, Vehicle};
use crate::services::OdometerOutcome;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle).get(list_vehicles))
        .route("/:id", get(get_vehicle))
        .route("/:id/recompute-odometer", post(recompute_odometer))
}

pub fn create_driver_router() -> Router<AppState> {
    Router::new().route("/", post(create_driver))
}

async fn create_vehicle(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.create(&actor, request).await?;
    Ok(Json(response))
}

async fn get_vehicle(
    State(state): State<AppState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vehicle>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn list_vehicles(
    State(state): State<AppState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.list().await?;
    Ok(Json(response))
}

async fn recompute_odometer(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Query(query): Query<RecomputeQuery>,
) -> Result<Json<ApiResponse<OdometerOutcome>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller
        .recompute_odometer(&actor, id, query.dry_run)
        .await?;
    Ok(Json(response))
}

async fn create_driver(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<CreateDriverRequest>,
) -> Result<Json<ApiResponse<Driver>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.create_driver(&actor, request).await?;
    Ok(Json(response))
}
