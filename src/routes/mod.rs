//! Rutas de la API
//!
//! Cada módulo expone un `create_*_router()`; `create_app_router` los monta
//! bajo `/api` junto con el health check, CORS y el trazado de requests.

pub mod rate_routes;
pub mod trip_routes;
pub mod vehicle_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_layer;
use crate::state::AppState;

pub fn create_app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health))
        .nest("/api/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/api/drivers", vehicle_routes::create_driver_router())
        .nest("/api/trips", trip_routes::create_trip_router())
        .nest("/api/consultant-rates", rate_routes::create_rate_router())
        .nest("/api/reports", rate_routes::create_report_router())
        .nest("/api/maintenance", rate_routes::create_maintenance_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fleet_ledger",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
