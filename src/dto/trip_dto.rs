use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{duration_label, EntryType, Trip, TripStatus, Vehicle};
use crate::repositories::{DeletedFilter, TripFilter};
use crate::services::bulk_importer::{ImportOptions, ImportRow};
use crate::services::trip_ledger::{CreateTrip, EndTrip};
use crate::utils::errors::ConsistencyWarning;

fn default_entry_type() -> EntryType {
    EntryType::RealTime
}

// Request para abrir o registrar un viaje
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTripRequest {
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    #[serde(default = "default_entry_type")]
    pub entry_type: EntryType,
    #[validate(range(min = 0))]
    pub start_odometer: i64,
    #[validate(length(min = 1, max = 255))]
    pub origin: String,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    pub end_odometer: Option<i64>,
    pub destination: Option<String>,
}

impl From<CreateTripRequest> for CreateTrip {
    fn from(request: CreateTripRequest) -> Self {
        CreateTrip {
            vehicle_id: request.vehicle_id,
            driver_id: request.driver_id,
            entry_type: request.entry_type,
            start_odometer: request.start_odometer,
            origin: request.origin,
            purpose: request.purpose.unwrap_or_default(),
            notes: request.notes.unwrap_or_default(),
            start_time: request.start_time,
            end_time: request.end_time,
            end_odometer: request.end_odometer,
            destination: request.destination,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EndTripRequest {
    #[validate(range(min = 0))]
    pub end_odometer: i64,
    pub destination: Option<String>,
    pub notes: Option<String>,
}

impl From<EndTripRequest> for EndTrip {
    fn from(request: EndTripRequest) -> Self {
        EndTrip {
            end_odometer: request.end_odometer,
            destination: request.destination,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelTripRequest {
    pub reason: Option<String>,
}

// Filtros del listado de viajes
#[derive(Debug, Default, Deserialize)]
pub struct TripQuery {
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: Option<TripStatus>,
    pub entry_type: Option<EntryType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Incluir también los borrados
    pub include_deleted: Option<bool>,
    /// Solo borrados (`true`) o solo vivos (`false`)
    pub is_deleted: Option<bool>,
}

impl From<TripQuery> for TripFilter {
    fn from(query: TripQuery) -> Self {
        let deleted = match (query.is_deleted, query.include_deleted) {
            (Some(true), _) => DeletedFilter::Only,
            (Some(false), _) => DeletedFilter::Exclude,
            (None, Some(true)) => DeletedFilter::Include,
            (None, _) => DeletedFilter::Exclude,
        };
        TripFilter {
            vehicle_id: query.vehicle_id,
            driver_id: query.driver_id,
            status: query.status,
            entry_type: query.entry_type,
            from: query.from,
            to: query.to,
            deleted,
        }
    }
}

// Response de viaje con sus valores derivados
#[derive(Debug, Serialize)]
pub struct TripResponse {
    #[serde(flatten)]
    pub trip: Trip,
    pub is_deleted: bool,
    pub distance: i64,
    pub duration_seconds: i64,
    pub duration_label: String,
    pub route_summary: String,
    pub trip_cost: Decimal,
    pub consultant_payment: Decimal,
}

impl TripResponse {
    pub fn new(trip: Trip, vehicle: Option<&Vehicle>, consultant_payment: Decimal) -> Self {
        let duration = trip.duration();
        Self {
            is_deleted: trip.is_deleted(),
            distance: trip.distance(),
            duration_seconds: duration.num_seconds(),
            duration_label: duration_label(duration),
            route_summary: trip.route_summary(),
            trip_cost: vehicle.map_or(Decimal::ZERO, |v| trip.trip_cost(v)),
            consultant_payment,
            trip,
        }
    }
}

// Response de una transición: viaje, vehículo resultante y aviso si lo hubo
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub trip: TripResponse,
    pub vehicle: Vehicle,
    pub warning: Option<ConsistencyWarning>,
}

#[derive(Debug, Deserialize)]
pub struct ImportTripsRequest {
    pub rows: Vec<ImportRow>,
    #[serde(default)]
    pub options: Option<ImportOptions>,
    /// Procesar cada vehículo en paralelo
    #[serde(default)]
    pub by_vehicle: bool,
}
