//! Controlador de viajes
//!
//! Valida los DTOs, aplica los permisos del actor y delega en `TripLedger`,
//! `BulkImporter` y `PaymentCalculator`.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::dto::common_dto::ApiResponse;
use crate::dto::trip_dto::{
    CancelTripRequest, CreateTripRequest, EndTripRequest, ImportTripsRequest, TransitionResponse,
    TripQuery, TripResponse,
};
use crate::models::{EntryType, Trip, Vehicle};
use crate::repositories::TripFilter;
use crate::services::authorization_service::{require, Actor, ActorRole, PermissionOracle};
use crate::services::{
    BulkImporter, CreateTrip, FleetRegistry, ImportOptions, ImportSummary, PaymentCalculator,
    TripLedger, TripTransition,
};
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, AppError};

pub struct TripController {
    ledger: TripLedger,
    fleet: FleetRegistry,
    payments: PaymentCalculator,
    importer: BulkImporter,
    permissions: Arc<dyn PermissionOracle>,
    import_defaults: ImportOptions,
}

impl TripController {
    pub fn new(state: &AppState) -> Self {
        Self {
            ledger: state.ledger.clone(),
            fleet: state.fleet.clone(),
            payments: state.payments.clone(),
            importer: state.importer.clone(),
            permissions: state.permissions.clone(),
            import_defaults: ImportOptions {
                skip_on_error: state.config.import_skip_errors,
                batch_size: state.config.import_batch_size,
                dry_run: false,
            },
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateTripRequest,
    ) -> Result<ApiResponse<TransitionResponse>, AppError> {
        request.validate()?;

        match request.entry_type {
            EntryType::Manual => require(
                self.permissions.can_enter_manual(actor),
                "enter manual trips",
            )?,
            EntryType::RealTime => {
                if actor.role == ActorRole::Driver && actor.id != request.driver_id {
                    return Err(forbidden_error(
                        "start trip",
                        "drivers can only start their own trips",
                    ));
                }
            }
        }

        let transition = self.ledger.create(CreateTrip::from(request)).await?;
        let response = self.transition_response(transition).await?;
        Ok(ApiResponse::success_with_message(
            response,
            "Viaje creado exitosamente".to_string(),
        ))
    }

    pub async fn end(
        &self,
        actor: &Actor,
        trip_id: Uuid,
        request: EndTripRequest,
    ) -> Result<ApiResponse<TransitionResponse>, AppError> {
        request.validate()?;
        let trip = self.ledger.get(trip_id).await?;
        require(self.permissions.can_end(actor, &trip), "end trip")?;

        let transition = self.ledger.end(trip_id, request.into()).await?;
        let response = self.transition_response(transition).await?;
        Ok(ApiResponse::success_with_message(
            response,
            "Viaje finalizado".to_string(),
        ))
    }

    pub async fn cancel(
        &self,
        actor: &Actor,
        trip_id: Uuid,
        request: CancelTripRequest,
    ) -> Result<ApiResponse<TransitionResponse>, AppError> {
        let trip = self.ledger.get(trip_id).await?;
        require(self.permissions.can_cancel(actor, &trip), "cancel trip")?;

        let transition = self
            .ledger
            .cancel(trip_id, request.reason.as_deref())
            .await?;
        let response = self.transition_response(transition).await?;
        Ok(ApiResponse::success_with_message(
            response,
            "Viaje cancelado".to_string(),
        ))
    }

    pub async fn delete(
        &self,
        actor: &Actor,
        trip_id: Uuid,
    ) -> Result<ApiResponse<TransitionResponse>, AppError> {
        let trip = self.ledger.get(trip_id).await?;
        require(self.permissions.can_delete(actor, &trip), "delete trip")?;

        let transition = self.ledger.soft_delete(trip_id, actor.id).await?;
        let response = self.transition_response(transition).await?;
        Ok(ApiResponse::success_with_message(
            response,
            "Viaje eliminado".to_string(),
        ))
    }

    pub async fn get_by_id(&self, actor: &Actor, trip_id: Uuid) -> Result<TripResponse, AppError> {
        let trip = self.ledger.get(trip_id).await?;
        ensure_visible(actor, &trip)?;
        let mut responses = self.trip_responses(vec![trip]).await?;
        responses
            .pop()
            .ok_or_else(|| AppError::Internal("trip response missing".to_string()))
    }

    /// Los conductores solo ven sus propios viajes
    pub async fn list(&self, actor: &Actor, query: TripQuery) -> Result<Vec<TripResponse>, AppError> {
        let mut filter = TripFilter::from(query);
        if actor.role == ActorRole::Driver {
            filter.driver_id = Some(actor.id);
        }
        let trips = self.ledger.list(&filter).await?;
        self.trip_responses(trips).await
    }

    pub async fn import(
        &self,
        actor: &Actor,
        request: ImportTripsRequest,
    ) -> Result<ApiResponse<ImportSummary>, AppError> {
        require(self.permissions.can_enter_manual(actor), "import trips")?;

        let options = request.options.unwrap_or_else(|| self.import_defaults.clone());
        let summary = if request.by_vehicle {
            self.importer.import_by_vehicle(&request.rows, &options).await
        } else {
            self.importer.import(&request.rows, &options).await
        };

        let message = format!(
            "Importación completada: {} creados, {} errores, {} omitidos",
            summary.created, summary.errored, summary.skipped
        );
        Ok(ApiResponse::success_with_message(summary, message))
    }

    async fn transition_response(
        &self,
        transition: TripTransition,
    ) -> Result<TransitionResponse, AppError> {
        let payment = self.payments.consultant_payment(&transition.trip).await?;
        Ok(TransitionResponse {
            trip: TripResponse::new(transition.trip, Some(&transition.vehicle), payment),
            vehicle: transition.vehicle,
            warning: transition.warning,
        })
    }

    async fn trip_responses(&self, trips: Vec<Trip>) -> Result<Vec<TripResponse>, AppError> {
        let payments = self.payments.payments_for(&trips).await?;
        let vehicles: HashMap<Uuid, Vehicle> = self
            .fleet
            .list_vehicles()
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        Ok(trips
            .into_iter()
            .map(|trip| {
                let payment = payments.get(&trip.id).copied().unwrap_or(Decimal::ZERO);
                let vehicle = vehicles.get(&trip.vehicle_id);
                TripResponse::new(trip, vehicle, payment)
            })
            .collect())
    }
}

fn ensure_visible(actor: &Actor, trip: &Trip) -> Result<(), AppError> {
    if actor.role == ActorRole::Driver && actor.id != trip.driver_id {
        return Err(forbidden_error("view trip", "drivers can only see their own trips"));
    }
    Ok(())
}
