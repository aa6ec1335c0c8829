//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos del ledger de flota. Mapean al
//! schema PostgreSQL de `migrations/`.

pub mod consultant_rate;
pub mod driver;
pub mod trip;
pub mod vehicle;

pub use consultant_rate::{ConsultantRate, RateStatus};
pub use driver::Driver;
pub use trip::{duration_label, Deletion, EntryType, Trip, TripStatus};
pub use vehicle::{Vehicle, VehicleStatus};
