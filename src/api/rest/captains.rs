use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::dispatch::lifecycle;
use crate::error::AppError;
use crate::models::captain::{Captain, GeoPoint};
use crate::models::ride::Ride;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/captains", post(create_captain).get(list_captains))
        .route("/captains/:id/status", patch(update_captain_status))
        .route("/captains/:id/location", patch(update_captain_location))
        .route("/captains/:id/current", get(current_rides))
}

#[derive(Deserialize)]
pub struct CreateCaptainRequest {
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub online: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

fn refresh_online_gauge(state: &AppState) {
    let online = state
        .captains
        .iter()
        .filter(|entry| entry.online)
        .count();
    state.metrics.captains_online.set(online as i64);
}

async fn create_captain(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCaptainRequest>,
) -> Result<Json<Captain>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    let captain = Captain::new(payload.name, payload.location);
    state.captains.insert(captain.id, captain.clone());
    refresh_online_gauge(&state);

    Ok(Json(captain))
}

async fn list_captains(State(state): State<Arc<AppState>>) -> Json<Vec<Captain>> {
    let captains = state
        .captains
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(captains)
}

async fn update_captain_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Captain>, AppError> {
    let updated = {
        let mut captain = state
            .captains
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("captain {id} not found")))?;

        captain.online = payload.online;
        captain.updated_at = Utc::now();
        captain.clone()
    };

    refresh_online_gauge(&state);
    Ok(Json(updated))
}

async fn update_captain_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Captain>, AppError> {
    let mut captain = state
        .captains
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("captain {id} not found")))?;

    captain.location = payload.location;
    captain.updated_at = Utc::now();

    Ok(Json(captain.clone()))
}

async fn current_rides(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Ride>>, AppError> {
    Ok(Json(lifecycle::current_for_captain(&state, id)?))
}
