//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del ledger
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error on '{field}': {message}")]
    Validation { field: &'static str, message: String },

    #[error("Request validation error: {0}")]
    RequestValidation(#[from] validator::ValidationErrors),

    #[error("{entity} '{key}' not found")]
    Lookup { entity: &'static str, key: String },

    #[error("Invalid {field} value: '{value}'")]
    Format { field: &'static str, value: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Código estable que viaja en las respuestas y en los detalles de importación
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } | AppError::RequestValidation(_) => "VALIDATION_ERROR",
            AppError::Lookup { .. } => "LOOKUP_ERROR",
            AppError::Format { .. } => "FORMAT_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) => "DB_ERROR",
            AppError::Migration(_) => "MIGRATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation { .. } | AppError::RequestValidation(_))
    }
}

/// Respuesta de error para la API
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error, details) = match &self {
            AppError::Validation { field, .. } => (
                StatusCode::BAD_REQUEST,
                "Validation Error",
                Some(json!({ "field": field })),
            ),
            AppError::RequestValidation(e) => {
                (StatusCode::BAD_REQUEST, "Validation Error", Some(json!(e)))
            }
            AppError::Lookup { entity, key } => (
                StatusCode::NOT_FOUND,
                "Lookup Error",
                Some(json!({ "entity": entity, "key": key })),
            ),
            AppError::Format { field, .. } => (
                StatusCode::BAD_REQUEST,
                "Format Error",
                Some(json!({ "field": field })),
            ),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found", None),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden", None),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", None),
            AppError::Database(e) => {
                tracing::error!("❌ Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database Error", None)
            }
            AppError::Migration(e) => {
                tracing::error!("❌ Migration error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Migration Error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("❌ Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", None)
            }
        };

        // Los errores de servidor no filtran detalles internos al cliente
        let message = if status.is_server_error() {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            details,
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Aviso de consistencia: la transición del viaje quedó confirmada pero la
/// proyección del vehículo no pudo escribirse. Se repara recalculando el odómetro.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyWarning {
    pub trip_id: Uuid,
    pub vehicle_id: Uuid,
    pub message: String,
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vehicle {} out of sync after trip {}: {}",
            self.vehicle_id, self.trip_id, self.message
        )
    }
}

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: impl Into<String>) -> AppError {
    AppError::Validation {
        field,
        message: message.into(),
    }
}

/// Función helper para crear errores de búsqueda por clave natural
pub fn lookup_error(entity: &'static str, key: impl std::fmt::Display) -> AppError {
    AppError::Lookup {
        entity,
        key: key.to_string(),
    }
}

/// Función helper para crear errores de formato
pub fn format_error(field: &'static str, value: &str) -> AppError {
    AppError::Format {
        field,
        value: value.to_string(),
    }
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de conflicto
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message_names_field() {
        let err = validation_error("destination", "Destination is required to end the trip");
        assert!(err.is_validation());
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn test_lookup_error_display() {
        let err = lookup_error("Driver", "ghost@fleet.test");
        assert_eq!(err.to_string(), "Driver 'ghost@fleet.test' not found");
        assert_eq!(err.code(), "LOOKUP_ERROR");
    }

    #[test]
    fn test_error_status_codes() {
        let response = validation_error("trip", "Can only cancel ongoing trips").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = lookup_error("Vehicle", "XX-000").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
