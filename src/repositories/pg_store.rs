//! Store PostgreSQL
//!
//! Cada `UnitOfWork` es una transacción de sqlx. El vehículo se bloquea con
//! `SELECT ... FOR UPDATE` antes de cualquier comparación de odómetro, y la
//! escritura del reconciliador corre dentro de un savepoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Acquire, FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::ledger_store::{DeletedFilter, Store, TripFilter, UnitOfWork};
use crate::models::{
    ConsultantRate, Deletion, Driver, EntryType, RateStatus, Trip, TripStatus, Vehicle,
};
use crate::utils::errors::{conflict_error, validation_error, AppError, AppResult};

const VEHICLE_COLUMNS: &str =
    "id, license_plate, status, current_odometer, rate_per_km, created_at, updated_at";
const DRIVER_COLUMNS: &str = "id, email, full_name, created_at";
const TRIP_COLUMNS: &str = "id, vehicle_id, driver_id, start_time, end_time, start_odometer, \
     end_odometer, origin, destination, purpose, notes, status, entry_type, is_deleted, \
     deleted_by, deleted_at, created_at, updated_at";
const RATE_COLUMNS: &str =
    "id, driver_id, vehicle_id, rate_per_km, status, notes, created_at, updated_at";

/// Fila plana de la tabla trips; el borrado lógico se pliega en `Deletion`
#[derive(Debug, FromRow)]
struct TripRow {
    id: Uuid,
    vehicle_id: Uuid,
    driver_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    start_odometer: i64,
    end_odometer: Option<i64>,
    origin: String,
    destination: Option<String>,
    purpose: String,
    notes: String,
    status: TripStatus,
    entry_type: EntryType,
    is_deleted: bool,
    deleted_by: Option<Uuid>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        let deletion = match (row.is_deleted, row.deleted_by, row.deleted_at) {
            (true, Some(deleted_by), Some(deleted_at)) => Some(Deletion {
                deleted_by,
                deleted_at,
            }),
            // Filas heredadas sin actor: se conserva la marca con la última actualización
            (true, deleted_by, deleted_at) => Some(Deletion {
                deleted_by: deleted_by.unwrap_or_else(Uuid::nil),
                deleted_at: deleted_at.unwrap_or(row.updated_at),
            }),
            (false, _, _) => None,
        };
        Trip {
            id: row.id,
            vehicle_id: row.vehicle_id,
            driver_id: row.driver_id,
            start_time: row.start_time,
            end_time: row.end_time,
            start_odometer: row.start_odometer,
            end_odometer: row.end_odometer,
            origin: row.origin,
            destination: row.destination,
            purpose: row.purpose,
            notes: row.notes,
            status: row.status,
            entry_type: row.entry_type,
            deletion,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Traduce violaciones de unicidad a `AppError::Conflict`
fn map_unique(err: sqlx::Error, resource: &str, field: &str, value: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            conflict_error(resource, field, value)
        }
        _ => AppError::Database(err),
    }
}

const ONGOING_DRIVER_INDEX: &str = "idx_trips_ongoing_driver";

/// Segundo viaje abierto del mismo conductor que se coló entre la
/// comprobación del ledger y el INSERT
fn map_trip_insert(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db)
            if db.is_unique_violation() && db.constraint() == Some(ONGOING_DRIVER_INDEX) =>
        {
            validation_error("driver_id", "Driver already has an active trip")
        }
        _ => AppError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_vehicle(&mut self, vehicle: &Vehicle) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO vehicles (id, license_plate, status, current_odometer, rate_per_km, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(vehicle.id)
        .bind(&vehicle.license_plate)
        .bind(vehicle.status)
        .bind(vehicle.current_odometer)
        .bind(vehicle.rate_per_km)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "Vehicle", "license plate", &vehicle.license_plate))?;
        Ok(())
    }

    async fn find_vehicle(&mut self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let query = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
        let vehicle = sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(vehicle)
    }

    async fn lock_vehicle(&mut self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let query = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1 FOR UPDATE");
        let vehicle = sqlx::query_as::<_, Vehicle>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(vehicle)
    }

    async fn find_vehicle_by_plate(&mut self, license_plate: &str) -> AppResult<Option<Vehicle>> {
        let query = format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE UPPER(license_plate) = UPPER($1)"
        );
        let vehicle = sqlx::query_as::<_, Vehicle>(&query)
            .bind(license_plate.trim())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(vehicle)
    }

    async fn list_vehicles(&mut self) -> AppResult<Vec<Vehicle>> {
        let query = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY license_plate");
        let vehicles = sqlx::query_as::<_, Vehicle>(&query)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(vehicles)
    }

    async fn save_vehicle_state(&mut self, vehicle: &Vehicle) -> AppResult<()> {
        let mut savepoint = (&mut self.tx).begin().await?;
        let result = sqlx::query(
            "UPDATE vehicles SET status = $2, current_odometer = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(vehicle.id)
        .bind(vehicle.status)
        .bind(vehicle.current_odometer)
        .execute(&mut *savepoint)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => {
                savepoint.commit().await?;
                Ok(())
            }
            Ok(_) => {
                savepoint.rollback().await?;
                Err(AppError::NotFound(format!("vehicle {} not updated", vehicle.id)))
            }
            Err(e) => {
                savepoint.rollback().await?;
                Err(AppError::Database(e))
            }
        }
    }

    async fn insert_driver(&mut self, driver: &Driver) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO drivers (id, email, full_name, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(driver.id)
        .bind(&driver.email)
        .bind(&driver.full_name)
        .bind(driver.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "Driver", "email", &driver.email))?;
        Ok(())
    }

    async fn find_driver(&mut self, id: Uuid) -> AppResult<Option<Driver>> {
        let query = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = $1");
        let driver = sqlx::query_as::<_, Driver>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(driver)
    }

    async fn find_driver_by_email(&mut self, email: &str) -> AppResult<Option<Driver>> {
        let query = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE LOWER(email) = LOWER($1)");
        let driver = sqlx::query_as::<_, Driver>(&query)
            .bind(email.trim())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(driver)
    }

    async fn insert_trip(&mut self, trip: &Trip) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO trips (id, vehicle_id, driver_id, start_time, end_time, start_odometer, \
             end_odometer, origin, destination, purpose, notes, status, entry_type, is_deleted, \
             deleted_by, deleted_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(trip.id)
        .bind(trip.vehicle_id)
        .bind(trip.driver_id)
        .bind(trip.start_time)
        .bind(trip.end_time)
        .bind(trip.start_odometer)
        .bind(trip.end_odometer)
        .bind(&trip.origin)
        .bind(&trip.destination)
        .bind(&trip.purpose)
        .bind(&trip.notes)
        .bind(trip.status)
        .bind(trip.entry_type)
        .bind(trip.is_deleted())
        .bind(trip.deletion.map(|d| d.deleted_by))
        .bind(trip.deletion.map(|d| d.deleted_at))
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_trip_insert)?;
        Ok(())
    }

    async fn update_trip(&mut self, trip: &Trip) -> AppResult<()> {
        let done = sqlx::query(
            "UPDATE trips SET end_time = $2, end_odometer = $3, destination = $4, notes = $5, \
             status = $6, is_deleted = $7, deleted_by = $8, deleted_at = $9, updated_at = $10 \
             WHERE id = $1",
        )
        .bind(trip.id)
        .bind(trip.end_time)
        .bind(trip.end_odometer)
        .bind(&trip.destination)
        .bind(&trip.notes)
        .bind(trip.status)
        .bind(trip.is_deleted())
        .bind(trip.deletion.map(|d| d.deleted_by))
        .bind(trip.deletion.map(|d| d.deleted_at))
        .bind(trip.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Trip with id '{}' not found", trip.id)));
        }
        Ok(())
    }

    async fn find_trip(&mut self, id: Uuid) -> AppResult<Option<Trip>> {
        let query = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1");
        let row = sqlx::query_as::<_, TripRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Trip::from))
    }

    async fn lock_trip(&mut self, id: Uuid) -> AppResult<Option<Trip>> {
        let query = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, TripRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Trip::from))
    }

    async fn find_trips(&mut self, filter: &TripFilter) -> AppResult<Vec<Trip>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TRIP_COLUMNS} FROM trips WHERE TRUE"));

        if let Some(vehicle_id) = filter.vehicle_id {
            builder.push(" AND vehicle_id = ").push_bind(vehicle_id);
        }
        if let Some(driver_id) = filter.driver_id {
            builder.push(" AND driver_id = ").push_bind(driver_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(entry_type) = filter.entry_type {
            builder.push(" AND entry_type = ").push_bind(entry_type);
        }
        if let Some(from) = filter.from {
            builder.push(" AND start_time >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND start_time <= ").push_bind(to);
        }
        match filter.deleted {
            DeletedFilter::Exclude => {
                builder.push(" AND is_deleted = FALSE");
            }
            DeletedFilter::Only => {
                builder.push(" AND is_deleted = TRUE");
            }
            DeletedFilter::Include => {}
        }
        builder.push(" ORDER BY start_time DESC, created_at DESC");

        let rows = builder
            .build_query_as::<TripRow>()
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn highest_completed_end_odometer(
        &mut self,
        vehicle_id: Uuid,
        excluding: Option<Uuid>,
    ) -> AppResult<Option<i64>> {
        let row: (Option<i64>,) = sqlx::query_as(
            "SELECT MAX(end_odometer) FROM trips \
             WHERE vehicle_id = $1 AND status = 'completed' AND is_deleted = FALSE \
             AND end_odometer IS NOT NULL AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(vehicle_id)
        .bind(excluding)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.0)
    }

    async fn driver_has_ongoing_real_time_trip(&mut self, driver_id: Uuid) -> AppResult<bool> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM trips WHERE driver_id = $1 AND status = 'ongoing' \
             AND entry_type = 'real_time' AND is_deleted = FALSE)",
        )
        .bind(driver_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.0)
    }

    async fn insert_rate(&mut self, rate: &ConsultantRate) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO consultant_rates (id, driver_id, vehicle_id, rate_per_km, status, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(rate.id)
        .bind(rate.driver_id)
        .bind(rate.vehicle_id)
        .bind(rate.rate_per_km)
        .bind(rate.status)
        .bind(&rate.notes)
        .bind(rate.created_at)
        .bind(rate.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "ConsultantRate", "active pair", &rate.driver_id.to_string()))?;
        Ok(())
    }

    async fn find_rate(&mut self, id: Uuid) -> AppResult<Option<ConsultantRate>> {
        let query = format!("SELECT {RATE_COLUMNS} FROM consultant_rates WHERE id = $1 FOR UPDATE");
        let rate = sqlx::query_as::<_, ConsultantRate>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(rate)
    }

    async fn active_rate(
        &mut self,
        driver_id: Uuid,
        vehicle_id: Uuid,
    ) -> AppResult<Option<ConsultantRate>> {
        let query = format!(
            "SELECT {RATE_COLUMNS} FROM consultant_rates \
             WHERE driver_id = $1 AND vehicle_id = $2 AND status = 'active'"
        );
        let rate = sqlx::query_as::<_, ConsultantRate>(&query)
            .bind(driver_id)
            .bind(vehicle_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(rate)
    }

    async fn deactivate_rates_for_pair(
        &mut self,
        driver_id: Uuid,
        vehicle_id: Uuid,
        keep: Option<Uuid>,
    ) -> AppResult<u64> {
        let done = sqlx::query(
            "UPDATE consultant_rates SET status = 'inactive', updated_at = NOW() \
             WHERE driver_id = $1 AND vehicle_id = $2 AND status = 'active' \
             AND ($3::uuid IS NULL OR id <> $3)",
        )
        .bind(driver_id)
        .bind(vehicle_id)
        .bind(keep)
        .execute(&mut *self.tx)
        .await?;
        Ok(done.rows_affected())
    }

    async fn set_rate_status(&mut self, id: Uuid, status: RateStatus) -> AppResult<()> {
        let done = sqlx::query(
            "UPDATE consultant_rates SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "ConsultantRate", "active pair", &id.to_string()))?;

        if done.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "ConsultantRate with id '{}' not found",
                id
            )));
        }
        Ok(())
    }

    async fn list_rates(&mut self, status: Option<RateStatus>) -> AppResult<Vec<ConsultantRate>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {RATE_COLUMNS} FROM consultant_rates WHERE TRUE"));
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder.push(" ORDER BY updated_at DESC");
        let rates = builder
            .build_query_as::<ConsultantRate>()
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rates)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_insert_keeps_non_constraint_errors_as_database() {
        let err = map_trip_insert(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_ongoing_driver_index_name_matches_migration() {
        let migration = include_str!("../../migrations/20240101000000_fleet_ledger.sql");
        let index = format!("CREATE UNIQUE INDEX {} ON trips (driver_id)", ONGOING_DRIVER_INDEX);
        assert!(migration.contains(&index));
    }
}
