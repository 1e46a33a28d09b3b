use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::Config;
use crate::models::captain::Captain;
use crate::models::order::StoreOrder;
use crate::models::ride::Ride;
use crate::notify::NotificationDispatcher;
use crate::observability::metrics::Metrics;
use crate::pricing::provider::DistanceProvider;

pub struct AppState {
    pub rides: DashMap<Uuid, Ride>,
    pub captains: DashMap<Uuid, Captain>,
    pub orders: DashMap<Uuid, StoreOrder>,
    pub dispatcher: NotificationDispatcher,
    pub distance: Arc<dyn DistanceProvider>,
    pub metrics: Metrics,
    pub broadcast_radius_km: f64,
    pub distance_timeout_ms: u64,
}

impl AppState {
    pub fn new(config: &Config, distance: Arc<dyn DistanceProvider>) -> Self {
        Self {
            rides: DashMap::new(),
            captains: DashMap::new(),
            orders: DashMap::new(),
            dispatcher: NotificationDispatcher::new(config.event_buffer_size),
            distance,
            metrics: Metrics::new(),
            broadcast_radius_km: config.broadcast_radius_km,
            distance_timeout_ms: config.distance_timeout_ms,
        }
    }
}
