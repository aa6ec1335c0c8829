use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::rate_controller::RateController;
use crate::dto::common_dto::ApiResponse;
use crate::dto::rate_dto::{ActivateRateRequest, PaymentReportQuery, RateListQuery};
use crate::middleware::auth::AuthenticatedActor;
use crate::models::ConsultantRate;
use crate::services::{IntegrityReport, PaymentReport};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_rate_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rates).post(activate_rate))
        .route("/:id/activate", post(reactivate_rate))
        .route("/:id/deactivate", post(deactivate_rate))
}

pub fn create_report_router() -> Router<AppState> {
    Router::new().route("/consultant-payments", get(payment_report))
}

pub fn create_maintenance_router() -> Router<AppState> {
    Router::new().route("/integrity", get(integrity_report))
}

async fn list_rates(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<RateListQuery>,
) -> Result<Json<Vec<ConsultantRate>>, AppError> {
    let controller = RateController::new(&state);
    let response = controller.list(&actor, query).await?;
    Ok(Json(response))
}

async fn activate_rate(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<ActivateRateRequest>,
) -> Result<Json<ApiResponse<ConsultantRate>>, AppError> {
    let controller = RateController::new(&state);
    let response = controller.activate(&actor, request).await?;
    Ok(Json(response))
}

async fn reactivate_rate(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsultantRate>>, AppError> {
    let controller = RateController::new(&state);
    let response = controller.reactivate(&actor, id).await?;
    Ok(Json(response))
}

async fn deactivate_rate(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConsultantRate>>, AppError> {
    let controller = RateController::new(&state);
    let response = controller.deactivate(&actor, id).await?;
    Ok(Json(response))
}

async fn payment_report(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<PaymentReportQuery>,
) -> Result<Json<PaymentReport>, AppError> {
    let controller = RateController::new(&state);
    let response = controller.payment_report(&actor, query).await?;
    Ok(Json(response))
}

async fn integrity_report(
    State(state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<IntegrityReport>, AppError> {
    let controller = RateController::new(&state);
    let response = controller.integrity(&actor).await?;
    Ok(Json(response))
}
