use uuid::Uuid;

use crate::geo::within_radius_km;
use crate::models::captain::GeoPoint;
use crate::state::AppState;

/// Captains inside the spherical cap of `radius_km` around `center` whose
/// online flag is set. Unordered; an empty result is a valid answer, not an
/// error.
pub fn captains_within(state: &AppState, center: &GeoPoint, radius_km: f64) -> Vec<Uuid> {
    state
        .captains
        .iter()
        .filter_map(|entry| {
            let captain = entry.value();
            if captain.online && within_radius_km(center, &captain.location, radius_km) {
                Some(captain.id)
            } else {
                None
            }
        })
        .collect()
}

/// Every online captain, regardless of position. Used once a store owner has
/// released a ride for matching.
pub fn online_captains(state: &AppState) -> Vec<Uuid> {
    state
        .captains
        .iter()
        .filter_map(|entry| {
            let captain = entry.value();
            if captain.online {
                Some(captain.id)
            } else {
                None
            }
        })
        .collect()
}
