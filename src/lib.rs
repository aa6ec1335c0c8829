//! Libro de viajes de la flota con reconciliación de odómetros
//!
//! El binario `fleet_ledger` expone la API HTTP y `import_trips` carga
//! viajes manuales desde CSV; ambos comparten los servicios de este crate.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;
