use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::trip_controller::TripController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::trip_dto::{
    CancelTripRequest, CreateTripRequest, EndTripRequest, ImportTripsRequest, TransitionResponse,
    TripQuery, TripResponse,
};
use crate::middleware::auth::AuthenticatedActor;
use crate::services::ImportSummary;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_trip).get(list_trips))
        .route("/import", post(import_trips))
        .route("/:id", get(get_trip).delete(delete_trip))
        .route("/:id/end", post(end_trip))
        .route("/:id/cancel", post(cancel_trip))
}

async fn create_trip(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<CreateTripRequest>,
) -> Result<Json<ApiResponse<TransitionResponse>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.create(&actor, request).await?;
    Ok(Json(response))
}

async fn list_trips(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<TripQuery>,
) -> Result<Json<Vec<TripResponse>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.list(&actor, query).await?;
    Ok(Json(response))
}

async fn get_trip(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<TripResponse>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.get_by_id(&actor, id).await?;
    Ok(Json(response))
}

async fn end_trip(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<EndTripRequest>,
) -> Result<Json<ApiResponse<TransitionResponse>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.end(&actor, id, request).await?;
    Ok(Json(response))
}

async fn cancel_trip(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelTripRequest>>,
) -> Result<Json<ApiResponse<TransitionResponse>>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let controller = TripController::new(&state);
    let response = controller.cancel(&actor, id, request).await?;
    Ok(Json(response))
}

async fn delete_trip(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransitionResponse>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.delete(&actor, id).await?;
    Ok(Json(response))
}

async fn import_trips(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<ImportTripsRequest>,
) -> Result<Json<ApiResponse<ImportSummary>>, AppError> {
    let controller = TripController::new(&state);
    let response = controller.import(&actor, request).await?;
    Ok(Json(response))
}
