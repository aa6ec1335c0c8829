//! Repositorios
//!
//! Acceso a datos del ledger detrás de `Store`/`UnitOfWork`, con backend
//! PostgreSQL para producción y en memoria para tests y desarrollo.

pub mod ledger_store;
pub mod memory_store;
pub mod pg_store;

pub use ledger_store::{DeletedFilter, Store, TripFilter, UnitOfWork};
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
