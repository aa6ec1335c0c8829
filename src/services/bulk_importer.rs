//! Importador masivo de viajes manuales
//!
//! Construye cada viaje por el mismo camino que `TripLedger::create`, de modo
//! que el reconciliador aplica igual a las filas importadas. Las filas de un
//! lote se procesan en orden y de una en una; cada fila es su propia unidad
//! de trabajo.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::Trip;
use crate::repositories::Store;
use crate::services::trip_ledger::{CreateTrip, TripLedger};
use crate::utils::errors::{format_error, lookup_error, validation_error, AppResult};

lazy_static! {
    static ref NON_NUMERIC: Regex = Regex::new(r"[^0-9.]").unwrap();
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

pub const REQUIRED_HEADERS: [&str; 8] = [
    "Driver Email",
    "Vehicle License Plate",
    "Origin",
    "Destination",
    "Start Date",
    "Start Time",
    "Start Odometer",
    "Purpose",
];

/// Fila tal como llega del fichero o de la API; todo texto sin interpretar
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRow {
    #[serde(rename = "Driver Email", alias = "driver_email", default)]
    pub driver_email: String,
    #[serde(rename = "Vehicle License Plate", alias = "license_plate", default)]
    pub license_plate: String,
    #[serde(rename = "Origin", alias = "origin", default)]
    pub origin: String,
    #[serde(rename = "Destination", alias = "destination", default)]
    pub destination: String,
    #[serde(rename = "Start Date", alias = "start_date", default)]
    pub start_date: String,
    #[serde(rename = "Start Time", alias = "start_time", default)]
    pub start_time: String,
    #[serde(rename = "End Date", alias = "end_date", default)]
    pub end_date: String,
    #[serde(rename = "End Time", alias = "end_time", default)]
    pub end_time: String,
    #[serde(rename = "Start Odometer", alias = "start_odometer", default)]
    pub start_odometer: String,
    #[serde(rename = "End Odometer", alias = "end_odometer", default)]
    pub end_odometer: String,
    #[serde(rename = "Purpose", alias = "purpose", default)]
    pub purpose: String,
    #[serde(rename = "Notes", alias = "notes", default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportOptions {
    #[serde(default = "default_skip_on_error")]
    pub skip_on_error: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_skip_on_error() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_on_error: default_skip_on_error(),
            batch_size: default_batch_size(),
            dry_run: false,
        }
    }
}

/// Fallo de una fila; `row` sigue la numeración de la hoja de cálculo
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row: usize,
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub errored: usize,
    /// Filas que nunca se intentaron porque la importación se abortó
    pub skipped: usize,
    pub error_details: Vec<RowError>,
    /// Avisos de consistencia de filas que sí se crearon
    pub warnings: Vec<String>,
}

impl ImportSummary {
    fn merge(&mut self, other: ImportSummary) {
        self.created += other.created;
        self.errored += other.errored;
        self.skipped += other.skipped;
        self.error_details.extend(other.error_details);
        self.warnings.extend(other.warnings);
    }
}

#[derive(Clone)]
pub struct BulkImporter {
    store: Arc<dyn Store>,
    ledger: TripLedger,
}

impl BulkImporter {
    pub fn new(store: Arc<dyn Store>, ledger: TripLedger) -> Self {
        Self { store, ledger }
    }

    /// Importa las filas en orden, por lotes de `batch_size`
    pub async fn import(&self, rows: &[ImportRow], options: &ImportOptions) -> ImportSummary {
        let indexed: Vec<(usize, &ImportRow)> = rows.iter().enumerate().collect();
        let summary = self.import_indexed(&indexed, options).await;
        log_summary(&summary, options);
        summary
    }

    /// Reparte las filas por matrícula y procesa cada vehículo en paralelo.
    /// Dentro de un vehículo el orden del fichero se mantiene.
    pub async fn import_by_vehicle(
        &self,
        rows: &[ImportRow],
        options: &ImportOptions,
    ) -> ImportSummary {
        let mut partitions: BTreeMap<String, Vec<(usize, &ImportRow)>> = BTreeMap::new();
        for (index, row) in rows.iter().enumerate() {
            partitions
                .entry(row.license_plate.trim().to_uppercase())
                .or_default()
                .push((index, row));
        }
        debug!("🚚 Importing {} rows across {} vehicles", rows.len(), partitions.len());

        let results = join_all(
            partitions
                .values()
                .map(|partition| self.import_indexed(partition, options)),
        )
        .await;

        let mut summary = ImportSummary::default();
        for result in results {
            summary.merge(result);
        }
        summary.error_details.sort_by_key(|e| e.row);
        log_summary(&summary, options);
        summary
    }

    async fn import_indexed(
        &self,
        rows: &[(usize, &ImportRow)],
        options: &ImportOptions,
    ) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let batch_size = options.batch_size.max(1);

        for (batch_number, batch) in rows.chunks(batch_size).enumerate() {
            debug!("Processing batch {} ({} rows)", batch_number + 1, batch.len());
            for (position, (index, row)) in batch.iter().enumerate() {
                let row_number = index + 2;
                match self.import_row(row, options.dry_run).await {
                    Ok((_, warning)) => {
                        summary.created += 1;
                        if let Some(warning) = warning {
                            summary.warnings.push(format!("Row {}: {}", row_number, warning));
                        }
                        if summary.created % 50 == 0 {
                            info!("Processed {} trips...", summary.created);
                        }
                    }
                    Err(e) => {
                        summary.errored += 1;
                        let failure = RowError {
                            row: row_number,
                            code: e.code(),
                            message: e.to_string(),
                        };
                        if !options.skip_on_error {
                            let attempted = batch_number * batch_size + position + 1;
                            summary.skipped = rows.len() - attempted;
                            warn!("❌ {}; aborting import", failure);
                            summary.error_details.push(failure);
                            return summary;
                        }
                        warn!("⚠️ Skipping {}", failure);
                        summary.error_details.push(failure);
                    }
                }
            }
        }
        summary
    }

    /// Resuelve, valida y crea una fila. En `dry_run` la unidad de trabajo se
    /// descarta sin confirmar.
    async fn import_row(
        &self,
        row: &ImportRow,
        dry_run: bool,
    ) -> AppResult<(Trip, Option<String>)> {
        let email = row.driver_email.trim().to_lowercase();
        if email.is_empty() {
            return Err(validation_error("driver_email", "Driver email is required"));
        }
        let plate = row.license_plate.trim().to_uppercase();
        if plate.is_empty() {
            return Err(validation_error(
                "license_plate",
                "Vehicle license plate is required",
            ));
        }

        let mut uow = self.store.begin().await?;
        let driver = uow
            .find_driver_by_email(&email)
            .await?
            .ok_or_else(|| lookup_error("driver", &email))?;
        let vehicle = uow
            .find_vehicle_by_plate(&plate)
            .await?
            .ok_or_else(|| lookup_error("vehicle", &plate))?;

        let start_time = parse_datetime("start_date", &row.start_date, &row.start_time)?;
        let end_time = if row.end_date.trim().is_empty() {
            None
        } else {
            Some(parse_datetime("end_date", &row.end_date, &row.end_time)?)
        };
        let start_odometer = parse_integer("start_odometer", &row.start_odometer)?
            .ok_or_else(|| validation_error("start_odometer", "Start odometer is required"))?;
        let end_odometer = parse_integer("end_odometer", &row.end_odometer)?;

        let origin = row.origin.trim();
        let destination = row.destination.trim();
        let purpose = row.purpose.trim();
        if origin.is_empty() || destination.is_empty() || purpose.is_empty() {
            return Err(validation_error(
                "origin",
                "Origin, destination, and purpose are required",
            ));
        }

        let mut input =
            CreateTrip::manual(vehicle.id, driver.id, start_time, start_odometer, origin)
                .with_purpose(purpose);
        input.end_time = end_time;
        input.end_odometer = end_odometer;
        input.destination = Some(destination.to_string());
        input.notes = row.notes.trim().to_string();

        let transition = self.ledger.create_in(uow.as_mut(), input).await?;
        if dry_run {
            return Ok((transition.trip, None));
        }
        uow.commit().await?;
        Ok((
            transition.trip,
            transition.warning.map(|w| w.to_string()),
        ))
    }
}

/// Lee un CSV con cabeceras, detectando `,`, `;` o tabulador como separador
pub fn read_csv(content: &str) -> AppResult<Vec<ImportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| format_error("csv", &e.to_string()))?
        .clone();
    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .collect();
    if !missing.is_empty() {
        return Err(validation_error(
            "headers",
            format!("Missing required headers: {}", missing.join(", ")),
        ));
    }

    reader
        .deserialize::<ImportRow>()
        .map(|record| record.map_err(|e| format_error("csv", &e.to_string())))
        .collect()
}

fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|d| header.bytes().filter(|b| b == d).count())
        .filter(|d| header.as_bytes().contains(d))
        .unwrap_or(b',')
}

/// Fecha + hora opcional. Sin hora se toma medianoche UTC.
pub fn parse_datetime(field: &'static str, date: &str, time: &str) -> AppResult<DateTime<Utc>> {
    let date = date.trim();
    let time = time.trim();
    if date.is_empty() {
        return Err(validation_error(field, "Date is required"));
    }

    if let Ok(combined) = NaiveDateTime::parse_from_str(date, DATETIME_FORMAT) {
        return Ok(Utc.from_utc_datetime(&combined));
    }

    let day = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
        .ok_or_else(|| format_error(field, date))?;

    let at = if time.is_empty() {
        NaiveTime::MIN
    } else {
        TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(time, format).ok())
            .ok_or_else(|| format_error(field, time))?
    };
    Ok(Utc.from_utc_datetime(&day.and_time(at)))
}

/// Entero tolerante: `"12,345 km"` → 12345, `"1500.7"` → 1500. Vacío → `None`.
pub fn parse_integer(field: &'static str, value: &str) -> AppResult<Option<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.starts_with('-') {
        return Err(validation_error(field, format!("Negative reading not allowed: '{}'", value)));
    }
    let cleaned = NON_NUMERIC.replace_all(value, "");
    // Los decimales se truncan; la parte entera debe caber en i64
    let (whole, fraction) = cleaned.split_once('.').unwrap_or((&*cleaned, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(format_error(field, value));
    }
    if whole.is_empty() {
        return Ok(Some(0));
    }
    whole
        .parse::<i64>()
        .map(Some)
        .map_err(|_| format_error(field, value))
}

fn log_summary(summary: &ImportSummary, options: &ImportOptions) {
    let mode = if options.dry_run { " (dry run)" } else { "" };
    info!(
        "📥 Import complete{}: created {}, errors {}, skipped {}",
        mode, summary.created, summary.errored, summary.skipped
    );
}
