use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::lifecycle::{self, CreateRide, HandoffCodes, ItemRating};
use crate::error::AppError;
use crate::models::ride::{Ride, VehicleClass};
use crate::pricing;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rides", post(create_ride))
        .route("/rides/pending/store-owner", get(pending_for_store_owner))
        .route("/rides/pending/captain", get(pending_for_captain))
        .route("/rides/:id", get(get_ride))
        .route("/rides/:id/handoff-codes", get(get_handoff_codes))
        .route("/rides/:id/store-owner/accept", post(store_owner_accept))
        .route("/rides/:id/store-owner/reject", post(store_owner_reject))
        .route("/rides/:id/captain/accept", post(captain_accept))
        .route("/rides/:id/captain/reject", post(captain_reject))
        .route("/rides/:id/handoff/store", post(verify_store_handoff))
        .route("/rides/:id/handoff/customer", post(verify_customer_handoff))
        .route("/fares/quote", post(quote_fares))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub pickup: String,
    pub destination: String,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub distance_m: f64,
    pub duration_s: f64,
    pub fares: HashMap<VehicleClass, f64>,
}

#[derive(Deserialize)]
pub struct CaptainActionRequest {
    pub captain_id: Uuid,
}

#[derive(Deserialize)]
pub struct HandoffRequest {
    pub code: String,
    pub rating: Option<u8>,
    #[serde(default)]
    pub item_ratings: Vec<ItemRating>,
}

async fn create_ride(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRide>,
) -> Result<Json<Ride>, AppError> {
    let ride = lifecycle::create_ride(&state, payload).await?;
    Ok(Json(ride))
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    let ride = state
        .rides
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("ride {id} not found")))?;

    Ok(Json(ride.value().clone()))
}

async fn get_handoff_codes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<HandoffCodes>, AppError> {
    Ok(Json(lifecycle::handoff_codes(&state, id)?))
}

/// Fares rounded to currency precision; the full-precision values stay
/// internal.
async fn quote_fares(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    if payload.pickup.trim().is_empty() || payload.destination.trim().is_empty() {
        return Err(AppError::Validation(
            "pickup and destination are required".to_string(),
        ));
    }

    let started = Instant::now();
    let quoted = pricing::quote_fares(
        state.distance.as_ref(),
        state.distance_timeout_ms,
        &payload.pickup,
        &payload.destination,
    )
    .await;

    let outcome = if quoted.is_ok() { "success" } else { "error" };
    state
        .metrics
        .fare_quote_latency_seconds
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());

    let quote = quoted?;
    Ok(Json(QuoteResponse {
        distance_m: quote.distance_m,
        duration_s: quote.duration_s,
        fares: quote
            .fares
            .into_iter()
            .map(|(class, fare)| (class, pricing::round_minor(fare)))
            .collect(),
    }))
}

async fn store_owner_accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::store_owner_accept(&state, id)?))
}

async fn store_owner_reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::store_owner_reject(&state, id)?))
}

async fn captain_accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CaptainActionRequest>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::captain_accept(&state, id, payload.captain_id)?))
}

async fn captain_reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CaptainActionRequest>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::captain_reject(&state, id, payload.captain_id)?))
}

async fn verify_store_handoff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HandoffRequest>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::verify_store_handoff(
        &state,
        id,
        &payload.code,
    )?))
}

async fn verify_customer_handoff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HandoffRequest>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::verify_customer_handoff(
        &state,
        id,
        &payload.code,
        payload.rating,
        &payload.item_ratings,
    )?))
}

async fn pending_for_store_owner(State(state): State<Arc<AppState>>) -> Json<Vec<Ride>> {
    Json(lifecycle::list_pending_for_store_owner(&state))
}

async fn pending_for_captain(State(state): State<Arc<AppState>>) -> Json<Vec<Ride>> {
    Json(lifecycle::list_pending_for_captain(&state))
}
