//! Modelo de Driver
//!
//! Solo la parte de identidad que el ledger necesita: los conductores se
//! resuelven por id o por email (clave natural del importador).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl Driver {
    pub fn new(email: &str, full_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            full_name: full_name.trim().to_string(),
            created_at: Utc::now(),
        }
    }
}
