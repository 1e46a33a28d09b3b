use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ride_dispatch::api::rest::router;
use ride_dispatch::config::Config;
use ride_dispatch::models::captain::GeoPoint;
use ride_dispatch::pricing::provider::StaticDistanceProvider;
use ride_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> (axum::Router, Arc<AppState>) {
    let config = Config {
        http_port: 0,
        log_level: "info".to_string(),
        event_buffer_size: 64,
        broadcast_radius_km: 5.0,
        distance_timeout_ms: 1_000,
    };
    let provider = StaticDistanceProvider::new(30.0)
        .with_address("olaya district", GeoPoint { lat: 24.6933, lng: 46.6853 })
        .with_address("al malaz", GeoPoint { lat: 24.6664, lng: 46.7350 });

    let state = Arc::new(AppState::new(&config, Arc::new(provider)));
    (router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_captain(app: &axum::Router, name: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/captains",
            json!({
                "name": name,
                "location": { "lat": 24.69, "lng": 46.68 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    body["id"].as_str().unwrap().to_string()
}

async fn create_direct_ride(app: &axum::Router) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/rides",
            json!({
                "customer_id": uuid::Uuid::new_v4(),
                "pickup": "olaya district",
                "destination": "al malaz",
                "vehicle_class": "bike"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rides"], 0);
    assert_eq!(body["captains"], 0);
    assert_eq!(body["orders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("captains_online"));
}

#[tokio::test]
async fn create_captain_starts_online_with_no_history() {
    let (app, _state) = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/captains",
            json!({
                "name": "Yusuf",
                "location": { "lat": 24.69, "lng": 46.68 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["name"], "Yusuf");
    assert_eq!(body["online"], true);
    assert_eq!(body["deliveries"].as_array().unwrap().len(), 0);
    assert_eq!(body["ratings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn create_captain_empty_name_returns_400() {
    let (app, _state) = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/captains",
            json!({
                "name": "  ",
                "location": { "lat": 24.69, "lng": 46.68 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fare_quote_prices_every_vehicle_class() {
    let (app, _state) = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/fares/quote",
            json!({
                "pickup": "olaya district",
                "destination": "al malaz"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert!(body["distance_m"].as_f64().unwrap() > 0.0);
    assert!(body["duration_s"].as_f64().unwrap() > 0.0);

    let bike = body["fares"]["bike"].as_f64().unwrap();
    let scooter = body["fares"]["scooter"].as_f64().unwrap();
    let ebike = body["fares"]["e-bike"].as_f64().unwrap();
    assert!(bike > 0.0);
    // Rate tables are strictly ordered, so the priced quotes must be too.
    assert!(scooter > ebike && ebike > bike);
}

#[tokio::test]
async fn fare_quote_unknown_address_returns_502() {
    let (app, _state) = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/fares/quote",
            json!({
                "pickup": "olaya district",
                "destination": "atlantis"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn created_ride_hides_handoff_codes() {
    let (app, _state) = setup();
    let ride = create_direct_ride(&app).await;

    assert_eq!(ride["status"], "pending-store-owner");
    assert!(ride["captain_id"].is_null());
    assert!(ride["fare"].as_f64().unwrap() > 0.0);
    assert!(ride.get("store_code").is_none());
    assert!(ride.get("customer_code").is_none());
}

#[tokio::test]
async fn handoff_codes_require_the_elevated_read() {
    let (app, _state) = setup();
    let ride = create_direct_ride(&app).await;
    let ride_id = ride["id"].as_str().unwrap();

    let res = app
        .oneshot(get_request(&format!("/rides/{ride_id}/handoff-codes")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let codes = body_json(res).await;
    let store_code = codes["store_code"].as_str().unwrap();
    let customer_code = codes["customer_code"].as_str().unwrap();
    assert_eq!(store_code.len(), 5);
    assert_eq!(customer_code.len(), 5);
    assert!(store_code.chars().all(|c| c.is_ascii_digit()));
    assert!(customer_code.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn get_nonexistent_ride_returns_404() {
    let (app, _state) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/rides/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ride_with_unresolvable_pickup_returns_502_and_persists_nothing() {
    let (app, state) = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/rides",
            json!({
                "customer_id": uuid::Uuid::new_v4(),
                "pickup": "atlantis",
                "destination": "al malaz",
                "vehicle_class": "bike"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(state.rides.is_empty());
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let (app, state) = setup();

    let captain_id = create_captain(&app, "Dispatch Dana").await;

    // Order placed, then finalized after payment: the indirect ride path.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "store_id": uuid::Uuid::new_v4(),
                "customer_id": uuid::Uuid::new_v4(),
                "pickup": "olaya district",
                "destination": "al malaz",
                "items": [
                    { "product_id": uuid::Uuid::new_v4(), "name": "dates box" }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let order = body_json(res).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let product_id = order["items"][0]["product_id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/finalize"),
            json!({ "vehicle_class": "bike" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ride = body_json(res).await;
    let ride_id = ride["id"].as_str().unwrap().to_string();
    let fare = ride["fare"].as_f64().unwrap();
    assert_eq!(ride["status"], "pending-store-owner");
    assert_eq!(ride["order_id"].as_str().unwrap(), order_id);

    // Pending list is the store owner's poll fallback.
    let res = app
        .clone()
        .oneshot(get_request("/rides/pending/store-owner"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/store-owner/accept"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "pending-captain");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/captain/accept"),
            json!({ "captain_id": captain_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let accepted = body_json(res).await;
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["captain_id"].as_str().unwrap(), captain_id);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/rides/{ride_id}/handoff-codes")))
        .await
        .unwrap();
    let codes = body_json(res).await;
    let store_code = codes["store_code"].as_str().unwrap().to_string();
    let customer_code = codes["customer_code"].as_str().unwrap().to_string();

    // Wrong code at the store: 400, status unchanged.
    let wrong = if store_code == "00000" { "00001" } else { "00000" };
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/handoff/store"),
            json!({ "code": wrong }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/rides/{ride_id}")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["status"], "accepted");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/handoff/store"),
            json!({ "code": store_code }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "enroute");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let shipped = body_json(res).await;
    assert_eq!(shipped["status"], "shipped");
    assert_eq!(shipped["captain_id"].as_str().unwrap(), captain_id);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/handoff/customer"),
            json!({
                "code": customer_code,
                "rating": 5,
                "item_ratings": [
                    { "product_id": product_id, "rating": 4 }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let delivered = body_json(res).await;
    assert_eq!(delivered["status"], "delivered");
    assert_eq!(delivered["rating"], 5);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let final_order = body_json(res).await;
    assert_eq!(final_order["status"], "delivered");
    assert_eq!(final_order["delivered"], true);
    assert!(final_order["delivered_at"].as_str().is_some());
    assert_eq!(final_order["items"][0]["ratings"][0], 4);

    let res = app
        .clone()
        .oneshot(get_request("/captains"))
        .await
        .unwrap();
    let captains = body_json(res).await;
    let paid_captain = &captains.as_array().unwrap()[0];
    assert_eq!(paid_captain["deliveries"].as_array().unwrap().len(), 1);
    assert_eq!(paid_captain["deliveries"][0]["earnings"].as_f64().unwrap(), fare);
    assert_eq!(paid_captain["ratings"][0], 5);

    // Non-terminal work list is now empty for this captain.
    let res = app
        .oneshot(get_request(&format!("/captains/{captain_id}/current")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);

    assert_eq!(state.rides.len(), 1);
}

#[tokio::test]
async fn second_captain_accept_returns_409() {
    let (app, _state) = setup();
    let first = create_captain(&app, "First").await;
    let second = create_captain(&app, "Second").await;

    let ride = create_direct_ride(&app).await;
    let ride_id = ride["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/store-owner/accept"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/captain/accept"),
            json!({ "captain_id": first }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/captain/accept"),
            json!({ "captain_id": second }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .oneshot(get_request(&format!("/rides/{ride_id}")))
        .await
        .unwrap();
    let stored = body_json(res).await;
    assert_eq!(stored["captain_id"].as_str().unwrap(), first);
}

#[tokio::test]
async fn rejected_ride_is_a_dead_end() {
    let (app, _state) = setup();
    let captain = create_captain(&app, "Late").await;

    let ride = create_direct_ride(&app).await;
    let ride_id = ride["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/store-owner/reject"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "rejected-by-store-owner");

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/captain/accept"),
            json!({ "captain_id": captain }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn finalizing_an_order_twice_returns_409() {
    let (app, _state) = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "store_id": uuid::Uuid::new_v4(),
                "customer_id": uuid::Uuid::new_v4(),
                "pickup": "olaya district",
                "destination": "al malaz",
                "items": [
                    { "product_id": uuid::Uuid::new_v4(), "name": "spice jar" }
                ]
            }),
        ))
        .await
        .unwrap();
    let order = body_json(res).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/finalize"),
            json!({ "vehicle_class": "scooter" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/finalize"),
            json!({ "vehicle_class": "scooter" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // The direct creation path may not re-link the order either.
    let res = app
        .oneshot(json_request(
            "POST",
            "/rides",
            json!({
                "customer_id": uuid::Uuid::new_v4(),
                "pickup": "olaya district",
                "destination": "al malaz",
                "vehicle_class": "bike",
                "order_id": order_id
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn offline_captain_accept_returns_403() {
    let (app, _state) = setup();
    let captain = create_captain(&app, "Sleeper").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/captains/{captain}/status"),
            json!({ "online": false }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let ride = create_direct_ride(&app).await;
    let ride_id = ride["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/store-owner/accept"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/rides/{ride_id}/captain/accept"),
            json!({ "captain_id": captain }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
