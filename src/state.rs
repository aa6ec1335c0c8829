//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. Todos los servicios comparten el mismo `Store`.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::Store;
use crate::services::{
    BulkImporter, FleetRegistry, OdometerMaintenance, PaymentCalculator, PermissionOracle,
    RateDirectory, RolePermissionOracle, TripLedger,
};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn Store>,
    pub fleet: FleetRegistry,
    pub ledger: TripLedger,
    pub rates: RateDirectory,
    pub payments: PaymentCalculator,
    pub importer: BulkImporter,
    pub maintenance: OdometerMaintenance,
    pub permissions: Arc<dyn PermissionOracle>,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, store: Arc<dyn Store>) -> Self {
        Self::with_permissions(config, store, Arc::new(RolePermissionOracle))
    }

    pub fn with_permissions(
        config: EnvironmentConfig,
        store: Arc<dyn Store>,
        permissions: Arc<dyn PermissionOracle>,
    ) -> Self {
        let ledger = TripLedger::new(store.clone());
        let rates = RateDirectory::new(store.clone());
        Self {
            config,
            fleet: FleetRegistry::new(store.clone()),
            payments: PaymentCalculator::new(ledger.clone(), rates.clone()),
            importer: BulkImporter::new(store.clone(), ledger.clone()),
            maintenance: OdometerMaintenance::new(store.clone()),
            ledger,
            rates,
            permissions,
            store,
        }
    }
}
