//! Autenticación JWT
//!
//! Este módulo verifica el bearer token de cada request y expone al actor
//! autenticado como extractor. Emitir tokens no es responsabilidad del
//! servicio; `generate_jwt_token` existe para herramientas y tests.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    services::authorization_service::{Actor, ActorRole},
    state::AppState,
    utils::errors::{AppError, AppResult},
};

/// Claims del JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // actor_id
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// Actor autenticado que se inyecta en los handlers
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Extraer token del header Authorization
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

        let actor = decode_actor(token, &state.config.jwt_secret)?;
        Ok(AuthenticatedActor(actor))
    }
}

/// Decodifica y valida el token, devolviendo el actor que representa
pub fn decode_actor(token: &str, secret: &str) -> AppResult<Actor> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?
    .claims;

    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid actor id".to_string()))?;
    let role: ActorRole = claims.role.parse()?;
    Ok(Actor { id, role })
}

/// Función para generar JWT token
pub fn generate_jwt_token(actor: &Actor, secret: &str, ttl_seconds: i64) -> AppResult<String> {
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(ttl_seconds);

    let role = serde_json::to_value(actor.role)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| AppError::Internal("Unserializable role".to_string()))?;

    let claims = Claims {
        sub: actor.id.to_string(),
        role,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Error generando JWT: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_and_rejections() {
        let actor = Actor {
            id: Uuid::new_v4(),
            role: ActorRole::VehicleManager,
        };
        let token = generate_jwt_token(&actor, "secret", 60).unwrap();
        assert_eq!(decode_actor(&token, "secret").unwrap(), actor);
        assert!(matches!(
            decode_actor(&token, "other-secret"),
            Err(AppError::Unauthorized(_))
        ));

        let expired = generate_jwt_token(&actor, "secret", -3_600).unwrap();
        assert!(decode_actor(&expired, "secret").is_err());
    }
}
