//! Services module
//!
//! Lógica de negocio del ledger. Los servicios reciben el `Store` compartido
//! y abren una unidad de trabajo por operación.

pub mod authorization_service;
pub mod bulk_importer;
pub mod fleet_registry;
pub mod odometer_maintenance;
pub mod payment_calculator;
pub mod rate_directory;
pub mod reconciler;
pub mod trip_ledger;

pub use authorization_service::{Actor, ActorRole, PermissionOracle, RolePermissionOracle};
pub use bulk_importer::{BulkImporter, ImportOptions, ImportRow, ImportSummary};
pub use fleet_registry::FleetRegistry;
pub use odometer_maintenance::{IntegrityReport, OdometerMaintenance, OdometerOutcome};
pub use payment_calculator::{PaymentCalculator, PaymentReport, ReportQuery};
pub use rate_directory::RateDirectory;
pub use trip_ledger::{CreateTrip, EndTrip, TripLedger, TripTransition};
