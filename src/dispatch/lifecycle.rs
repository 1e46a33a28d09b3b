use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatch::{locator, otp};
use crate::error::AppError;
use crate::models::captain::DeliveryRecord;
use crate::models::order::OrderStatus;
use crate::models::ride::{Ride, RideStatus, VehicleClass};
use crate::notify::{RideEvent, RideEventName};
use crate::pricing;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRide {
    pub customer_id: Uuid,
    pub pickup: String,
    pub destination: String,
    pub vehicle_class: VehicleClass,
    pub order_id: Option<Uuid>,
    /// Store channel to notify on the direct-request path. Indirect rides
    /// reach their store through the linked order instead.
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRating {
    pub product_id: Uuid,
    pub rating: u8,
}

#[derive(Debug, Serialize)]
pub struct HandoffCodes {
    pub store_code: String,
    pub customer_code: String,
}

/// Creates a ride in `pending-store-owner`. Pricing and geocoding happen
/// before anything is persisted, so a provider failure or timeout leaves no
/// partial ride behind.
pub async fn create_ride(state: &AppState, req: CreateRide) -> Result<Ride, AppError> {
    if req.pickup.trim().is_empty() {
        return Err(AppError::Validation("pickup cannot be empty".to_string()));
    }
    if req.destination.trim().is_empty() {
        return Err(AppError::Validation(
            "destination cannot be empty".to_string(),
        ));
    }
    if let Some(order_id) = req.order_id {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        // Fast-fail before the provider calls; the authoritative claim
        // happens under the order's entry guard below.
        if order.ride_id.is_some() {
            return Err(AppError::Conflict(format!(
                "order {order_id} already has a ride"
            )));
        }
    }

    let started = Instant::now();
    let quoted = pricing::quote_fares(
        state.distance.as_ref(),
        state.distance_timeout_ms,
        &req.pickup,
        &req.destination,
    )
    .await;

    let outcome = if quoted.is_ok() { "success" } else { "error" };
    state
        .metrics
        .fare_quote_latency_seconds
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());

    let quote = match quoted {
        Ok(quote) => quote,
        Err(err) => {
            state
                .metrics
                .rides_created_total
                .with_label_values(&["error"])
                .inc();
            return Err(err);
        }
    };

    // Direct requests fan out to nearby captains, so the pickup point is
    // needed up front. Resolving it here keeps creation all-or-nothing, and
    // the lookup runs under the same deadline as the route call.
    let pickup_point = if req.order_id.is_none() {
        match pricing::resolve_point(
            state.distance.as_ref(),
            state.distance_timeout_ms,
            &req.pickup,
        )
        .await
        {
            Ok(point) => Some(point),
            Err(err) => {
                state
                    .metrics
                    .rides_created_total
                    .with_label_values(&["error"])
                    .inc();
                return Err(err);
            }
        }
    } else {
        None
    };

    let fare = quote
        .fares
        .get(&req.vehicle_class)
        .copied()
        .ok_or_else(|| AppError::Internal("vehicle class missing from quote".to_string()))?;
    let now = Utc::now();
    let ride = Ride {
        id: Uuid::new_v4(),
        customer_id: req.customer_id,
        captain_id: None,
        order_id: req.order_id,
        pickup: req.pickup,
        destination: req.destination,
        vehicle_class: req.vehicle_class,
        fare,
        distance_m: quote.distance_m,
        duration_s: quote.duration_s,
        status: RideStatus::PendingStoreOwner,
        store_code: otp::generate_code(),
        customer_code: otp::generate_code(),
        rating: None,
        created_at: now,
        updated_at: now,
    };

    // An order gets exactly one ride. The claim is a conditional update
    // under the order's entry guard, so concurrent creations against the
    // same order resolve to one winner no matter which endpoint they came
    // through; the loser persists nothing.
    if let Some(order_id) = ride.order_id {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        if order.ride_id.is_some() {
            return Err(AppError::Conflict(format!(
                "order {order_id} already has a ride"
            )));
        }
        order.ride_id = Some(ride.id);
    }

    state.rides.insert(ride.id, ride.clone());

    state
        .metrics
        .rides_created_total
        .with_label_values(&["success"])
        .inc();
    info!(ride_id = %ride.id, fare, status = ride.status.label(), "ride created");

    if let Some(center) = pickup_point {
        let nearby = locator::captains_within(state, &center, state.broadcast_radius_km);
        state.dispatcher.broadcast_to(
            nearby,
            RideEvent {
                name: RideEventName::NewRide,
                ride_id: ride.id,
                payload: json!({
                    "pickup": ride.pickup,
                    "destination": ride.destination,
                    "fare": pricing::round_minor(ride.fare),
                }),
            },
        );

        if let Some(store_id) = req.store_id {
            state.dispatcher.notify(
                store_id,
                RideEvent {
                    name: RideEventName::RideAwaitingStoreOwner,
                    ride_id: ride.id,
                    payload: json!({ "pickup": ride.pickup }),
                },
            );
        }
    }

    Ok(ride)
}

fn advance(ride: &mut Ride, next: RideStatus) -> Result<(), AppError> {
    if !ride.status.can_advance_to(next) {
        return Err(AppError::Conflict(format!(
            "ride {} cannot move from {} to {}",
            ride.id,
            ride.status.label(),
            next.label(),
        )));
    }
    ride.status = next;
    ride.updated_at = Utc::now();
    Ok(())
}

pub fn store_owner_accept(state: &AppState, ride_id: Uuid) -> Result<Ride, AppError> {
    let snapshot = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;
        advance(&mut ride, RideStatus::PendingCaptain)?;
        ride.clone()
    };

    state
        .metrics
        .ride_transitions_total
        .with_label_values(&[snapshot.status.label()])
        .inc();
    info!(ride_id = %ride_id, "store owner released ride for matching");

    // Once the store owner releases the ride, every online captain hears
    // about it regardless of distance.
    state.dispatcher.broadcast_to(
        locator::online_captains(state),
        RideEvent {
            name: RideEventName::NewRide,
            ride_id,
            payload: json!({
                "pickup": snapshot.pickup,
                "destination": snapshot.destination,
                "fare": pricing::round_minor(snapshot.fare),
            }),
        },
    );

    Ok(snapshot)
}

pub fn store_owner_reject(state: &AppState, ride_id: Uuid) -> Result<Ride, AppError> {
    let snapshot = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;
        advance(&mut ride, RideStatus::RejectedByStoreOwner)?;
        ride.clone()
    };

    state
        .metrics
        .ride_transitions_total
        .with_label_values(&[snapshot.status.label()])
        .inc();
    info!(ride_id = %ride_id, "store owner rejected ride");
    Ok(snapshot)
}

/// The winner-take-all acceptance. The precondition (status is
/// `pending-captain` and no captain bound) is re-checked under the per-ride
/// entry guard, so of N concurrent attempts exactly one binds and the rest
/// observe the conflict.
pub fn captain_accept(state: &AppState, ride_id: Uuid, captain_id: Uuid) -> Result<Ride, AppError> {
    let captain_online = state
        .captains
        .get(&captain_id)
        .map(|captain| captain.online)
        .ok_or_else(|| AppError::NotFound(format!("captain {captain_id} not found")))?;
    if !captain_online {
        return Err(AppError::Authorization(
            "captain must be online to accept rides".to_string(),
        ));
    }

    let snapshot = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;

        if ride.captain_id.is_some() {
            return Err(AppError::Conflict(format!(
                "ride {ride_id} is already assigned"
            )));
        }
        advance(&mut ride, RideStatus::Accepted)?;
        ride.captain_id = Some(captain_id);
        ride.clone()
    };

    if let Some(order_id) = snapshot.order_id {
        if let Some(mut order) = state.orders.get_mut(&order_id) {
            order.captain_id = Some(captain_id);
        }
    }

    state
        .metrics
        .ride_transitions_total
        .with_label_values(&[snapshot.status.label()])
        .inc();
    info!(ride_id = %ride_id, captain_id = %captain_id, "captain accepted ride");

    state.dispatcher.notify(
        snapshot.customer_id,
        RideEvent {
            name: RideEventName::RideConfirmed,
            ride_id,
            payload: json!({ "captain_id": captain_id }),
        },
    );
    state.dispatcher.notify(
        captain_id,
        RideEvent {
            name: RideEventName::RideConfirmedCaptain,
            ride_id,
            payload: json!({
                "pickup": snapshot.pickup,
                "destination": snapshot.destination,
            }),
        },
    );

    Ok(snapshot)
}

pub fn captain_reject(state: &AppState, ride_id: Uuid, captain_id: Uuid) -> Result<Ride, AppError> {
    if !state.captains.contains_key(&captain_id) {
        return Err(AppError::NotFound(format!("captain {captain_id} not found")));
    }

    let snapshot = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;
        advance(&mut ride, RideStatus::RejectedByCaptain)?;
        ride.clone()
    };

    state
        .metrics
        .ride_transitions_total
        .with_label_values(&[snapshot.status.label()])
        .inc();
    info!(ride_id = %ride_id, captain_id = %captain_id, "captain rejected ride");
    Ok(snapshot)
}

/// Store pickup handoff: the correct store code moves the ride to `enroute`
/// and mirrors the linked order to shipped. A wrong code changes nothing.
pub fn verify_store_handoff(state: &AppState, ride_id: Uuid, code: &str) -> Result<Ride, AppError> {
    let snapshot = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;

        if ride.status != RideStatus::Accepted {
            return Err(AppError::Conflict(format!(
                "ride {} is not awaiting store handoff (status {})",
                ride_id,
                ride.status.label(),
            )));
        }
        otp::verify(&ride.store_code, code)?;
        advance(&mut ride, RideStatus::Enroute)?;
        ride.clone()
    };

    if let Some(order_id) = snapshot.order_id {
        if let Some(mut order) = state.orders.get_mut(&order_id) {
            order.status = OrderStatus::Shipped;
        }
    }

    state
        .metrics
        .ride_transitions_total
        .with_label_values(&[snapshot.status.label()])
        .inc();
    info!(ride_id = %ride_id, "store handoff verified, ride enroute");
    Ok(snapshot)
}

/// Customer delivery handoff. After the status write, the bookkeeping steps
/// run independently and best-effort: order completion and captain history
/// always run, rating appends are optional extras whose absence or failure
/// must not block them.
pub fn verify_customer_handoff(
    state: &AppState,
    ride_id: Uuid,
    code: &str,
    rating: Option<u8>,
    item_ratings: &[ItemRating],
) -> Result<Ride, AppError> {
    if let Some(stars) = rating {
        if !(1..=5).contains(&stars) {
            return Err(AppError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
    }
    for item in item_ratings {
        if !(1..=5).contains(&item.rating) {
            return Err(AppError::Validation(
                "item rating must be between 1 and 5".to_string(),
            ));
        }
    }

    let snapshot = {
        let mut ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;

        if ride.status != RideStatus::Enroute {
            return Err(AppError::Conflict(format!(
                "ride {} is not awaiting customer handoff (status {})",
                ride_id,
                ride.status.label(),
            )));
        }
        otp::verify(&ride.customer_code, code)?;
        advance(&mut ride, RideStatus::Delivered)?;
        ride.rating = rating;
        ride.clone()
    };

    let delivered_at = Utc::now();

    if let Some(order_id) = snapshot.order_id {
        match state.orders.get_mut(&order_id) {
            Some(mut order) => {
                order.status = OrderStatus::Delivered;
                order.delivered = true;
                order.delivered_at = Some(delivered_at);
            }
            None => warn!(ride_id = %ride_id, order_id = %order_id, "linked order missing, skipping mirror"),
        }
    }

    if let Some(captain_id) = snapshot.captain_id {
        match state.captains.get_mut(&captain_id) {
            Some(mut captain) => {
                captain.deliveries.push(DeliveryRecord {
                    ride_id: snapshot.id,
                    order_id: snapshot.order_id,
                    destination: snapshot.destination.clone(),
                    earnings: snapshot.fare,
                    completed_at: delivered_at,
                });
                if let Some(stars) = rating {
                    captain.ratings.push(stars);
                }
                captain.updated_at = delivered_at;
            }
            None => warn!(ride_id = %ride_id, captain_id = %captain_id, "captain missing, skipping delivery record"),
        }
    }

    if !item_ratings.is_empty() {
        if let Some(order_id) = snapshot.order_id {
            if let Some(mut order) = state.orders.get_mut(&order_id) {
                for rated in item_ratings {
                    match order
                        .items
                        .iter_mut()
                        .find(|item| item.product_id == rated.product_id)
                    {
                        Some(item) => item.ratings.push(rated.rating),
                        None => {
                            warn!(order_id = %order_id, product_id = %rated.product_id, "rated product not on order, skipping")
                        }
                    }
                }
            }
        }
    }

    state
        .metrics
        .ride_transitions_total
        .with_label_values(&[snapshot.status.label()])
        .inc();
    info!(ride_id = %ride_id, "customer handoff verified, ride delivered");

    state.dispatcher.notify(
        snapshot.customer_id,
        RideEvent {
            name: RideEventName::RideDelivered,
            ride_id,
            payload: json!({ "fare": pricing::round_minor(snapshot.fare) }),
        },
    );

    Ok(snapshot)
}

pub fn list_pending_for_store_owner(state: &AppState) -> Vec<Ride> {
    rides_with_status(state, RideStatus::PendingStoreOwner)
}

pub fn list_pending_for_captain(state: &AppState) -> Vec<Ride> {
    rides_with_status(state, RideStatus::PendingCaptain)
}

/// Rides this captain is actively working: assigned to them and not yet in
/// a terminal state.
pub fn current_for_captain(state: &AppState, captain_id: Uuid) -> Result<Vec<Ride>, AppError> {
    if !state.captains.contains_key(&captain_id) {
        return Err(AppError::NotFound(format!("captain {captain_id} not found")));
    }

    Ok(state
        .rides
        .iter()
        .filter(|entry| {
            entry.captain_id == Some(captain_id) && !entry.status.is_terminal()
        })
        .map(|entry| entry.value().clone())
        .collect())
}

/// Elevated read for the two handoff codes. Default ride reads never carry
/// them.
pub fn handoff_codes(state: &AppState, ride_id: Uuid) -> Result<HandoffCodes, AppError> {
    let ride = state
        .rides
        .get(&ride_id)
        .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))?;

    Ok(HandoffCodes {
        store_code: ride.store_code.clone(),
        customer_code: ride.customer_code.clone(),
    })
}

fn rides_with_status(state: &AppState, status: RideStatus) -> Vec<Ride> {
    state
        .rides
        .iter()
        .filter(|entry| entry.status == status)
        .map(|entry| entry.value().clone())
        .collect()
}
