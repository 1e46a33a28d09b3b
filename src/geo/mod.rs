use crate::models::captain::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Central angle between two points on the unit sphere, in radians.
fn central_angle(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    2.0 * haversine.sqrt().asin()
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    EARTH_RADIUS_KM * central_angle(a, b)
}

/// Spherical-cap containment: true when `point` lies within `radius_km`
/// of `center`. The radius is converted to an angular radius so the
/// comparison happens on the sphere, not in projected space.
pub fn within_radius_km(center: &GeoPoint, point: &GeoPoint, radius_km: f64) -> bool {
    central_angle(center, point) <= radius_km / EARTH_RADIUS_KM
}
