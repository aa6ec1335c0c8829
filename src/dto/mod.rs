//! DTOs de la API
//!
//! Requests y responses de la capa HTTP, separados de los modelos.

pub mod common_dto;
pub mod rate_dto;
pub mod trip_dto;
pub mod vehicle_dto;
