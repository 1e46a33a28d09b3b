pub mod provider;

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;

use crate::error::AppError;
use crate::models::captain::GeoPoint;
use crate::models::ride::VehicleClass;
use provider::{DistanceProvider, RouteEstimate};

/// Baseline pricing per vehicle class. Static configuration, never
/// user-supplied.
struct RateTable {
    base: f64,
    per_km: f64,
    per_sec: f64,
}

const fn rates(class: VehicleClass) -> RateTable {
    match class {
        VehicleClass::Bike => RateTable {
            base: 20.0,
            per_km: 10.0,
            per_sec: 0.033,
        },
        VehicleClass::Scooter => RateTable {
            base: 25.0,
            per_km: 12.0,
            per_sec: 0.04,
        },
        VehicleClass::EBike => RateTable {
            base: 22.0,
            per_km: 11.0,
            per_sec: 0.036,
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FareQuote {
    pub distance_m: f64,
    pub duration_s: f64,
    pub fares: HashMap<VehicleClass, f64>,
}

/// Full-precision fare for one class. Rounding to currency precision happens
/// only at the presentation edge via [`round_minor`].
pub fn fare_for(class: VehicleClass, distance_m: f64, duration_s: f64) -> f64 {
    let table = rates(class);
    table.base + (distance_m / 1_000.0) * table.per_km + duration_s * table.per_sec
}

pub fn round_minor(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Geocoding under the same deadline as routing: every provider call a ride
/// operation depends on is bounded, so a stalled provider can never hang the
/// caller.
pub async fn resolve_point(
    provider: &dyn DistanceProvider,
    timeout_ms: u64,
    address: &str,
) -> Result<GeoPoint, AppError> {
    timeout(Duration::from_millis(timeout_ms), provider.geocode(address))
        .await
        .map_err(|_| AppError::ExternalService("distance provider timed out".to_string()))?
}

/// Resolves the route once and prices every vehicle class against it. The
/// provider call is bounded by `timeout_ms`; a slow or failing provider
/// aborts the whole quote so no caller ever sees a partially priced result.
pub async fn quote_fares(
    provider: &dyn DistanceProvider,
    timeout_ms: u64,
    pickup: &str,
    destination: &str,
) -> Result<FareQuote, AppError> {
    let RouteEstimate {
        distance_m,
        duration_s,
    } = timeout(
        Duration::from_millis(timeout_ms),
        provider.route(pickup, destination),
    )
    .await
    .map_err(|_| AppError::ExternalService("distance provider timed out".to_string()))??;

    let fares = VehicleClass::ALL
        .iter()
        .map(|&class| (class, fare_for(class, distance_m, duration_s)))
        .collect();

    Ok(FareQuote {
        distance_m,
        duration_s,
        fares,
    })
}
