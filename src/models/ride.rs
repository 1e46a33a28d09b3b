use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleClass {
    Bike,
    Scooter,
    EBike,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 3] = [
        VehicleClass::Bike,
        VehicleClass::Scooter,
        VehicleClass::EBike,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RideStatus {
    PendingStoreOwner,
    PendingCaptain,
    Accepted,
    Enroute,
    Delivered,
    RejectedByStoreOwner,
    RejectedByCaptain,
}

impl RideStatus {
    /// The only transitions the lifecycle manager may perform. Anything
    /// outside this table is surfaced as a conflict, never applied.
    pub fn can_advance_to(self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, next),
            (PendingStoreOwner, PendingCaptain)
                | (PendingStoreOwner, RejectedByStoreOwner)
                | (PendingCaptain, Accepted)
                | (PendingCaptain, RejectedByCaptain)
                | (Accepted, Enroute)
                | (Enroute, Delivered)
        )
    }

    pub fn label(self) -> &'static str {
        use RideStatus::*;
        match self {
            PendingStoreOwner => "pending-store-owner",
            PendingCaptain => "pending-captain",
            Accepted => "accepted",
            Enroute => "enroute",
            Delivered => "delivered",
            RejectedByStoreOwner => "rejected-by-store-owner",
            RejectedByCaptain => "rejected-by-captain",
        }
    }

    pub fn is_terminal(self) -> bool {
        use RideStatus::*;
        matches!(self, Delivered | RejectedByStoreOwner | RejectedByCaptain)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Bound exactly once, on the winning captain-accept. Never reassigned.
    pub captain_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub pickup: String,
    pub destination: String,
    pub vehicle_class: VehicleClass,
    pub fare: f64,
    pub distance_m: f64,
    pub duration_s: f64,
    pub status: RideStatus,
    /// Handoff codes are excluded from default reads; the elevated
    /// handoff-codes endpoint is the only way to retrieve them.
    #[serde(skip_serializing)]
    pub store_code: String,
    #[serde(skip_serializing)]
    pub customer_code: String,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
