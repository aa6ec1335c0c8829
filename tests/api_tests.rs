use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use fleet_ledger::config::{EnvironmentConfig, StoreBackend};
use fleet_ledger::middleware::auth::generate_jwt_token;
use fleet_ledger::repositories::MemoryStore;
use fleet_ledger::routes::create_app_router;
use fleet_ledger::services::{Actor, ActorRole};
use fleet_ledger::state::AppState;

const SECRET: &str = "test-secret";

fn create_test_app() -> Router {
    let config = EnvironmentConfig {
        store_backend: StoreBackend::Memory,
        jwt_secret: SECRET.to_string(),
        ..EnvironmentConfig::default()
    };
    create_app_router(AppState::new(config, Arc::new(MemoryStore::new())))
}

fn token(id: Uuid, role: ActorRole) -> String {
    generate_jwt_token(&Actor { id, role }, SECRET, 3600).unwrap()
}

fn manager_token() -> String {
    token(Uuid::new_v4(), ActorRole::Manager)
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Registra un vehículo y un conductor; devuelve sus ids
async fn seed(app: &Router, plate: &str, email: &str) -> (Uuid, Uuid) {
    let manager = manager_token();
    let (status, vehicle) = send(
        app,
        "POST",
        "/api/vehicles",
        Some(&manager),
        Some(json!({ "license_plate": plate, "current_odometer": 1000, "rate_per_km": "0.50" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", vehicle);

    let (status, driver) = send(
        app,
        "POST",
        "/api/drivers",
        Some(&manager),
        Some(json!({ "email": email, "full_name": "Test Driver" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", driver);

    let vehicle_id = vehicle["data"]["id"].as_str().unwrap().parse().unwrap();
    let driver_id = driver["data"]["id"].as_str().unwrap().parse().unwrap();
    (vehicle_id, driver_id)
}

async fn start_trip(app: &Router, vehicle_id: Uuid, driver_id: Uuid) -> Uuid {
    let driver = token(driver_id, ActorRole::Driver);
    let (status, body) = send(
        app,
        "POST",
        "/api/trips",
        Some(&driver),
        Some(json!({
            "vehicle_id": vehicle_id,
            "driver_id": driver_id,
            "start_odometer": 1000,
            "origin": "Depot"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["trip"]["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "fleet_ledger");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = create_test_app();
    let (status, body) = send(&app, "GET", "/api/trips", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, "GET", "/api/trips", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_real_time_trip_flow() {
    let app = create_test_app();
    let (vehicle_id, driver_id) = seed(&app, "API-001", "flow@fleet.test").await;
    let trip_id = start_trip(&app, vehicle_id, driver_id).await;

    let (_, vehicle) = send(
        &app,
        "GET",
        &format!("/api/vehicles/{}", vehicle_id),
        Some(&manager_token()),
        None,
    )
    .await;
    assert_eq!(vehicle["status"], "in_use");

    let driver = token(driver_id, ActorRole::Driver);
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/trips/{}/end", trip_id),
        Some(&driver),
        Some(json!({ "end_odometer": 1120, "destination": "Airport" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["trip"]["status"], "completed");
    assert_eq!(body["data"]["trip"]["distance"], 120);
    assert_eq!(body["data"]["vehicle"]["status"], "available");
    assert_eq!(body["data"]["vehicle"]["current_odometer"], 1120);
    assert!(body["data"]["warning"].is_null());

    let (status, listed) = send(&app, "GET", "/api/trips", Some(&driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_end_with_short_destination_is_bad_request() {
    let app = create_test_app();
    let (vehicle_id, driver_id) = seed(&app, "API-002", "short@fleet.test").await;
    let trip_id = start_trip(&app, vehicle_id, driver_id).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/trips/{}/end", trip_id),
        Some(&manager_token()),
        Some(json!({ "end_odometer": 1100, "destination": "HQ" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["field"], "destination");
}

#[tokio::test]
async fn test_cancel_completed_trip_is_bad_request() {
    let app = create_test_app();
    let (vehicle_id, driver_id) = seed(&app, "API-003", "cancel@fleet.test").await;
    let trip_id = start_trip(&app, vehicle_id, driver_id).await;
    let manager = manager_token();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/trips/{}/end", trip_id),
        Some(&manager),
        Some(json!({ "end_odometer": 1050, "destination": "Warehouse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/trips/{}/cancel", trip_id),
        Some(&manager),
        Some(json!({ "reason": "duplicate" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Can only cancel ongoing trips"));
}

#[tokio::test]
async fn test_cancel_without_body() {
    let app = create_test_app();
    let (vehicle_id, driver_id) = seed(&app, "API-004", "nobody@fleet.test").await;
    let trip_id = start_trip(&app, vehicle_id, driver_id).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/trips/{}/cancel", trip_id),
        Some(&token(driver_id, ActorRole::Driver)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["trip"]["status"], "cancelled");
    assert_eq!(body["data"]["vehicle"]["current_odometer"], 1000);
}

#[tokio::test]
async fn test_driver_cannot_delete_or_touch_other_trips() {
    let app = create_test_app();
    let (vehicle_id, driver_id) = seed(&app, "API-005", "owner@fleet.test").await;
    let trip_id = start_trip(&app, vehicle_id, driver_id).await;

    let owner = token(driver_id, ActorRole::Driver);
    let (status, _) = send(&app, "DELETE", &format!("/api/trips/{}", trip_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let stranger = token(Uuid::new_v4(), ActorRole::Driver);
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/trips/{}/end", trip_id),
        Some(&stranger),
        Some(json!({ "end_odometer": 1100, "destination": "Airport" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", &format!("/api/trips/{}", trip_id), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_manager_soft_delete_is_idempotent() {
    let app = create_test_app();
    let (vehicle_id, driver_id) = seed(&app, "API-006", "deleted@fleet.test").await;
    let trip_id = start_trip(&app, vehicle_id, driver_id).await;
    let uri = format!("/api/trips/{}", trip_id);

    let (status, first) = send(&app, "DELETE", &uri, Some(&manager_token()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(&app, "DELETE", &uri, Some(&manager_token()), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(first["data"]["trip"]["is_deleted"], true);
    assert_eq!(first["data"]["vehicle"]["status"], "available");
    assert_eq!(
        first["data"]["trip"]["deletion"],
        second["data"]["trip"]["deletion"]
    );

    let (_, live) = send(&app, "GET", "/api/trips", Some(&manager_token()), None).await;
    assert!(live.as_array().unwrap().is_empty());
    let (_, deleted) = send(&app, "GET", "/api/trips?is_deleted=true", Some(&manager_token()), None).await;
    assert_eq!(deleted.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_driver_cannot_enter_manual_trips() {
    let app = create_test_app();
    let (vehicle_id, driver_id) = seed(&app, "API-007", "manual@fleet.test").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/trips",
        Some(&token(driver_id, ActorRole::Driver)),
        Some(json!({
            "vehicle_id": vehicle_id,
            "driver_id": driver_id,
            "entry_type": "manual",
            "start_odometer": 1000,
            "origin": "Depot",
            "start_time": "2024-03-01T08:00:00Z",
            "end_time": "2024-03-01T09:00:00Z",
            "end_odometer": 1040,
            "destination": "Warehouse"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_import_reports_row_errors() {
    let app = create_test_app();
    seed(&app, "API-008", "import@fleet.test").await;

    let row = |email: &str, start: &str, end: &str| {
        json!({
            "driver_email": email,
            "license_plate": "api-008",
            "origin": "Depot",
            "destination": "Client site",
            "start_date": "2024-03-01",
            "start_time": "08:00",
            "end_date": "2024-03-01",
            "end_time": "09:30",
            "start_odometer": start,
            "end_odometer": end,
            "purpose": "Delivery"
        })
    };

    let (status, body) = send(
        &app,
        "POST",
        "/api/trips/import",
        Some(&manager_token()),
        Some(json!({
            "rows": [
                row("import@fleet.test", "1000", "1100"),
                row("ghost@fleet.test", "1100", "1200"),
                row("import@fleet.test", "1,200", "1,350 km")
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["created"], 2);
    assert_eq!(body["data"]["errored"], 1);
    assert_eq!(body["data"]["error_details"][0]["row"], 3);
    assert_eq!(body["data"]["error_details"][0]["code"], "LOOKUP_ERROR");

    let (_, vehicles) = send(&app, "GET", "/api/vehicles", Some(&manager_token()), None).await;
    assert_eq!(vehicles[0]["current_odometer"], 1350);
}

#[tokio::test]
async fn test_rate_activation_and_payment_report() {
    let app = create_test_app();
    let (vehicle_id, driver_id) = seed(&app, "API-009", "consultant@fleet.test").await;
    let manager = manager_token();

    for rate in ["0.40", "0.60"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/consultant-rates",
            Some(&manager),
            Some(json!({ "driver_id": driver_id, "vehicle_id": vehicle_id, "rate_per_km": rate })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    let (_, active) = send(&app, "GET", "/api/consultant-rates?status=active", Some(&manager), None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    let trip_id = start_trip(&app, vehicle_id, driver_id).await;
    let (_, ended) = send(
        &app,
        "POST",
        &format!("/api/trips/{}/end", trip_id),
        Some(&manager),
        Some(json!({ "end_odometer": 1100, "destination": "Client site" })),
    )
    .await;
    let payment: f64 = ended["data"]["trip"]["consultant_payment"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(payment, 60.0);

    let (status, report) = send(
        &app,
        "GET",
        "/api/reports/consultant-payments?from=2000-01-01T00:00:00Z&to=2100-01-01T00:00:00Z",
        Some(&manager),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["total_trips"], 1);
    assert_eq!(report["total_distance"], 100);
}
