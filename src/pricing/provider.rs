use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::captain::GeoPoint;

#[derive(Debug, Clone, Copy)]
pub struct RouteEstimate {
    pub distance_m: f64,
    pub duration_s: f64,
}

/// Outbound port for geocoding and routing. The engine only ever sees
/// distance and duration; resolution failures surface as external-service
/// errors and abort whatever operation needed the route.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, AppError>;

    async fn route(&self, pickup: &str, destination: &str) -> Result<RouteEstimate, AppError>;
}

/// In-memory provider backed by a fixed address table. Distance is the
/// great-circle distance between the geocoded points; duration assumes a
/// constant average speed.
pub struct StaticDistanceProvider {
    addresses: HashMap<String, GeoPoint>,
    avg_speed_kmh: f64,
}

impl StaticDistanceProvider {
    pub fn new(avg_speed_kmh: f64) -> Self {
        Self {
            addresses: HashMap::new(),
            avg_speed_kmh,
        }
    }

    pub fn with_address(mut self, address: &str, point: GeoPoint) -> Self {
        self.addresses.insert(address.to_string(), point);
        self
    }

    fn lookup(&self, address: &str) -> Result<GeoPoint, AppError> {
        self.addresses
            .get(address)
            .copied()
            .ok_or_else(|| AppError::ExternalService(format!("cannot geocode {address:?}")))
    }
}

#[async_trait]
impl DistanceProvider for StaticDistanceProvider {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, AppError> {
        self.lookup(address)
    }

    async fn route(&self, pickup: &str, destination: &str) -> Result<RouteEstimate, AppError> {
        let from = self.lookup(pickup)?;
        let to = self.lookup(destination)?;

        let distance_km = haversine_km(&from, &to);
        let duration_s = distance_km / self.avg_speed_kmh * 3_600.0;

        Ok(RouteEstimate {
            distance_m: distance_km * 1_000.0,
            duration_s,
        })
    }
}
