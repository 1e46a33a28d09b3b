use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Placed,
    Shipped,
    Delivered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub ratings: Vec<u8>,
}

/// The commercial order mirrored by the ride lifecycle. The order collaborator
/// owns it; the lifecycle manager only writes captain, status and the
/// delivery-completion fields as ride milestones are reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOrder {
    pub id: Uuid,
    pub store_id: Uuid,
    pub customer_id: Uuid,
    pub captain_id: Option<Uuid>,
    pub pickup: String,
    pub destination: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub ride_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
