//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores y validación
//! compartidas por servicios y controladores.

pub mod errors;
pub mod validation;
