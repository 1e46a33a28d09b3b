use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One completed delivery, appended when a ride reaches `Delivered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub ride_id: Uuid,
    pub order_id: Option<Uuid>,
    pub destination: String,
    pub earnings: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Captain {
    pub id: Uuid,
    pub name: String,
    pub online: bool,
    pub location: GeoPoint,
    pub deliveries: Vec<DeliveryRecord>,
    pub ratings: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

impl Captain {
    pub fn new(name: String, location: GeoPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            online: true,
            location,
            deliveries: Vec::new(),
            ratings: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}
