//! Controladores
//!
//! Capa fina entre rutas y servicios: valida requests, consulta el oráculo
//! de permisos y arma las responses.

pub mod rate_controller;
pub mod trip_controller;
pub mod vehicle_controller;
