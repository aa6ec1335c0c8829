//! Autorización de operaciones sobre el ledger
//!
//! Roles del actor autenticado y las reglas que consultan los controladores
//! antes de tocar viajes, vehículos o tarifas.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Trip;
use crate::utils::errors::{forbidden_error, AppError, AppResult};

/// Rol del actor autenticado
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Manager,
    VehicleManager,
    Driver,
}

impl ActorRole {
    pub fn is_management(&self) -> bool {
        matches!(
            self,
            ActorRole::Admin | ActorRole::Manager | ActorRole::VehicleManager
        )
    }
}

impl FromStr for ActorRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ActorRole::Admin),
            "manager" => Ok(ActorRole::Manager),
            "vehicle_manager" => Ok(ActorRole::VehicleManager),
            "driver" => Ok(ActorRole::Driver),
            other => Err(AppError::Unauthorized(format!("Unknown role '{}'", other))),
        }
    }
}

/// Quién ejecuta una operación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

/// Oráculo de permisos consumido por la capa HTTP
pub trait PermissionOracle: Send + Sync {
    fn can_end(&self, actor: &Actor, trip: &Trip) -> bool;
    fn can_cancel(&self, actor: &Actor, trip: &Trip) -> bool;
    fn can_delete(&self, actor: &Actor, trip: &Trip) -> bool;
    fn can_enter_manual(&self, actor: &Actor) -> bool;
    fn can_manage_rates(&self, actor: &Actor) -> bool;
    fn can_maintain_fleet(&self, actor: &Actor) -> bool;
}

/// Permisos por rol: el conductor del viaje o la gestión cierran/cancelan,
/// solo la gestión borra, registra manualmente, importa y mantiene la flota
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePermissionOracle;

impl PermissionOracle for RolePermissionOracle {
    fn can_end(&self, actor: &Actor, trip: &Trip) -> bool {
        actor.role.is_management() || actor.id == trip.driver_id
    }

    fn can_cancel(&self, actor: &Actor, trip: &Trip) -> bool {
        self.can_end(actor, trip)
    }

    fn can_delete(&self, actor: &Actor, _trip: &Trip) -> bool {
        actor.role.is_management()
    }

    fn can_enter_manual(&self, actor: &Actor) -> bool {
        actor.role.is_management()
    }

    fn can_manage_rates(&self, actor: &Actor) -> bool {
        actor.role.is_management()
    }

    fn can_maintain_fleet(&self, actor: &Actor) -> bool {
        actor.role.is_management()
    }
}

/// Convierte un `false` del oráculo en `AppError::Forbidden`
pub fn require(allowed: bool, operation: &str) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(forbidden_error(operation, "insufficient permissions"))
    }
}
