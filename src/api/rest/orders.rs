use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::dispatch::lifecycle::{self, CreateRide};
use crate::error::AppError;
use crate::models::order::{OrderItem, OrderStatus, StoreOrder};
use crate::models::ride::{Ride, VehicleClass};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/finalize", post(finalize_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub store_id: Uuid,
    pub customer_id: Uuid,
    pub pickup: String,
    pub destination: String,
    pub items: Vec<NewOrderItem>,
}

#[derive(Deserialize)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
pub struct FinalizeOrderRequest {
    pub vehicle_class: VehicleClass,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<StoreOrder>, AppError> {
    if payload.pickup.trim().is_empty() || payload.destination.trim().is_empty() {
        return Err(AppError::Validation(
            "pickup and destination are required".to_string(),
        ));
    }
    if payload.items.is_empty() {
        return Err(AppError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }

    let order = StoreOrder {
        id: Uuid::new_v4(),
        store_id: payload.store_id,
        customer_id: payload.customer_id,
        captain_id: None,
        pickup: payload.pickup,
        destination: payload.destination,
        status: OrderStatus::Placed,
        items: payload
            .items
            .into_iter()
            .map(|item| OrderItem {
                product_id: item.product_id,
                name: item.name,
                ratings: Vec::new(),
            })
            .collect(),
        delivered: false,
        delivered_at: None,
        ride_id: None,
        created_at: Utc::now(),
    };

    state.orders.insert(order.id, order.clone());
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoreOrder>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order.value().clone()))
}

/// The indirect creation path: a paid-for order spawns its delivery ride.
/// Finalizing twice is a conflict; the first ride stays authoritative.
async fn finalize_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FinalizeOrderRequest>,
) -> Result<Json<Ride>, AppError> {
    let (customer_id, pickup, destination) = {
        let order = state
            .orders
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        if order.ride_id.is_some() {
            return Err(AppError::Conflict(format!(
                "order {id} already has a ride"
            )));
        }

        (
            order.customer_id,
            order.pickup.clone(),
            order.destination.clone(),
        )
    };

    let ride = lifecycle::create_ride(
        &state,
        CreateRide {
            customer_id,
            pickup,
            destination,
            vehicle_class: payload.vehicle_class,
            order_id: Some(id),
            store_id: None,
        },
    )
    .await?;

    Ok(Json(ride))
}
