//! Calculadora de pagos a consultores
//!
//! Composición de solo lectura: distancia del ledger × tarifa activa del
//! directorio. Consulta el directorio por clave, nunca al revés.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{ConsultantRate, Trip, TripStatus};
use crate::repositories::TripFilter;
use crate::services::rate_directory::RateDirectory;
use crate::services::trip_ledger::TripLedger;
use crate::utils::errors::{validation_error, AppResult};

/// Parámetros del informe de pagos
#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentLine {
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub distance: i64,
    pub rate_per_km: Decimal,
    pub payment: Decimal,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverTotal {
    pub driver_id: Uuid,
    pub trips: usize,
    pub distance: i64,
    pub payment: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub lines: Vec<PaymentLine>,
    pub drivers: Vec<DriverTotal>,
    pub total_trips: usize,
    pub total_distance: i64,
    pub total_payment: Decimal,
}

#[derive(Clone)]
pub struct PaymentCalculator {
    ledger: TripLedger,
    rates: RateDirectory,
}

impl PaymentCalculator {
    pub fn new(ledger: TripLedger, rates: RateDirectory) -> Self {
        Self { ledger, rates }
    }

    /// Pago variable del viaje; 0 si el par no tiene tarifa activa
    pub async fn consultant_payment(&self, trip: &Trip) -> AppResult<Decimal> {
        let rate = self
            .rates
            .get_active_rate(trip.driver_id, trip.vehicle_id)
            .await?;
        Ok(rate.map_or(Decimal::ZERO, |r| r.calculate_payment(trip.distance())))
    }

    /// Pagos de varios viajes indexados por id, consultando cada par una vez
    pub async fn payments_for(&self, trips: &[Trip]) -> AppResult<HashMap<Uuid, Decimal>> {
        let rates = self.active_rates_for(trips).await?;
        Ok(trips
            .iter()
            .map(|trip| {
                let payment = rates
                    .get(&(trip.driver_id, trip.vehicle_id))
                    .and_then(Option::as_ref)
                    .map_or(Decimal::ZERO, |r| r.calculate_payment(trip.distance()));
                (trip.id, payment)
            })
            .collect())
    }

    pub async fn consultant_report(&self, query: &ReportQuery) -> AppResult<PaymentReport> {
        if query.to < query.from {
            return Err(validation_error("to", "Report end must not be before its start"));
        }

        let filter = TripFilter {
            driver_id: query.driver_id,
            vehicle_id: query.vehicle_id,
            status: Some(TripStatus::Completed),
            from: Some(query.from),
            ..Default::default()
        };
        let trips: Vec<Trip> = self
            .ledger
            .list(&filter)
            .await?
            .into_iter()
            .filter(|t| t.end_time.map_or(false, |end| end <= query.to))
            .collect();

        let rates = self.active_rates_for(&trips).await?;
        let mut lines: Vec<PaymentLine> = trips
            .iter()
            .filter_map(|trip| {
                let rate = rates.get(&(trip.driver_id, trip.vehicle_id))?.as_ref()?;
                Some(PaymentLine {
                    trip_id: trip.id,
                    driver_id: trip.driver_id,
                    vehicle_id: trip.vehicle_id,
                    distance: trip.distance(),
                    rate_per_km: rate.rate_per_km,
                    payment: rate.calculate_payment(trip.distance()),
                    end_time: trip.end_time?,
                })
            })
            .collect();
        lines.sort_by(|a, b| b.end_time.cmp(&a.end_time));

        let mut totals: HashMap<Uuid, DriverTotal> = HashMap::new();
        for line in &lines {
            let total = totals.entry(line.driver_id).or_insert(DriverTotal {
                driver_id: line.driver_id,
                trips: 0,
                distance: 0,
                payment: Decimal::ZERO,
            });
            total.trips += 1;
            total.distance += line.distance;
            total.payment += line.payment;
        }
        let mut drivers: Vec<DriverTotal> = totals.into_values().collect();
        drivers.sort_by(|a, b| b.payment.cmp(&a.payment).then(a.driver_id.cmp(&b.driver_id)));

        Ok(PaymentReport {
            from: query.from,
            to: query.to,
            total_trips: lines.len(),
            total_distance: lines.iter().map(|l| l.distance).sum(),
            total_payment: lines.iter().map(|l| l.payment).sum(),
            lines,
            drivers,
        })
    }

    async fn active_rates_for(
        &self,
        trips: &[Trip],
    ) -> AppResult<HashMap<(Uuid, Uuid), Option<ConsultantRate>>> {
        let mut rates = HashMap::new();
        for trip in trips {
            let key = (trip.driver_id, trip.vehicle_id);
            if rates.contains_key(&key) {
                continue;
            }
            let rate = self.rates.get_active_rate(key.0, key.1).await?;
            rates.insert(key, rate);
        }
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;

    use crate::models::{Driver, Vehicle};
    use crate::repositories::{MemoryStore, Store};
    use crate::services::trip_ledger::CreateTrip;

    struct Fixture {
        ledger: TripLedger,
        rates: RateDirectory,
        payments: PaymentCalculator,
        vehicle: Vehicle,
        consultant: Driver,
        employee: Driver,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let vehicle = Vehicle::new("MH-12-9999", Some(0), None);
        let consultant = Driver::new("consultant@fleet.test", "Consultant");
        let employee = Driver::new("employee@fleet.test", "Employee");
        let mut uow = store.begin().await.unwrap();
        uow.insert_vehicle(&vehicle).await.unwrap();
        uow.insert_driver(&consultant).await.unwrap();
        uow.insert_driver(&employee).await.unwrap();
        uow.commit().await.unwrap();

        let store: Arc<dyn Store> = Arc::new(store);
        let ledger = TripLedger::new(store.clone());
        let rates = RateDirectory::new(store);
        let payments = PaymentCalculator::new(ledger.clone(), rates.clone());
        Fixture {
            ledger,
            rates,
            payments,
            vehicle,
            consultant,
            employee,
        }
    }

    async fn manual_trip(f: &Fixture, driver: &Driver, start: DateTime<Utc>, from: i64, to: i64) -> Trip {
        let input = CreateTrip::manual(f.vehicle.id, driver.id, start, from, "Depot")
            .ended(start + Duration::hours(1), to, "Client site");
        f.ledger.create(input).await.unwrap().trip
    }

    #[tokio::test]
    async fn test_payment_is_zero_without_active_rate() {
        let f = fixture().await;
        let start = Utc::now() - Duration::days(1);
        let trip = manual_trip(&f, &f.employee, start, 0, 80).await;
        assert_eq!(f.payments.consultant_payment(&trip).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_payment_uses_active_rate_and_distance() {
        let f = fixture().await;
        let start = Utc::now() - Duration::days(1);
        let trip = manual_trip(&f, &f.consultant, start, 0, 80).await;
        f.rates
            .activate(f.consultant.id, f.vehicle.id, Decimal::new(1550, 2), "")
            .await
            .unwrap();
        assert_eq!(
            f.payments.consultant_payment(&trip).await.unwrap(),
            Decimal::new(124000, 2)
        );

        let payments = f.payments.payments_for(&[trip.clone()]).await.unwrap();
        assert_eq!(payments[&trip.id], Decimal::new(124000, 2));
    }

    #[tokio::test]
    async fn test_report_only_includes_rated_trips_in_window() {
        let f = fixture().await;
        let base = Utc::now() - Duration::days(10);
        f.rates
            .activate(f.consultant.id, f.vehicle.id, Decimal::new(10, 0), "")
            .await
            .unwrap();

        let older = manual_trip(&f, &f.consultant, base, 0, 50).await;
        let newer = manual_trip(&f, &f.consultant, base + Duration::days(2), 50, 80).await;
        manual_trip(&f, &f.employee, base + Duration::days(3), 80, 120).await;
        // Fuera de la ventana
        manual_trip(&f, &f.consultant, base + Duration::days(8), 120, 200).await;
        // Los borrados no cuentan
        let deleted = manual_trip(&f, &f.consultant, base + Duration::days(4), 200, 260).await;
        f.ledger.soft_delete(deleted.id, Uuid::new_v4()).await.unwrap();

        let report = f
            .payments
            .consultant_report(&ReportQuery {
                from: base - Duration::hours(1),
                to: base + Duration::days(5),
                driver_id: None,
                vehicle_id: None,
            })
            .await
            .unwrap();

        let ids: Vec<Uuid> = report.lines.iter().map(|l| l.trip_id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(report.total_distance, 80);
        assert_eq!(report.total_payment, Decimal::new(800, 0));
        assert_eq!(report.drivers.len(), 1);
        assert_eq!(report.drivers[0].trips, 2);
    }
}
