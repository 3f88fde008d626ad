use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use tessera_api::{app, AppState};
use tessera_core::{Clock, Event, ManualClock, SystemClock, TicketRepository};
use tessera_ledger::InMemoryTicketStore;
use tessera_store::BookingRules;

fn rules() -> BookingRules {
    BookingRules {
        reservation_ttl_seconds: 600,
        sweep_interval_seconds: 60,
    }
}

fn test_app(clock: Arc<dyn Clock>) -> (axum::Router, Arc<InMemoryTicketStore>) {
    let store = Arc::new(InMemoryTicketStore::new(clock));
    let state = AppState {
        store: store.clone(),
        rules: rules(),
    };
    (app(state), store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_capacity_for_unknown_event_is_404() {
    let (app, _store) = test_app(Arc::new(SystemClock));
    let unknown = Uuid::new_v4();

    let response = app
        .oneshot(get(&format!("/v1/events/{}/capacity", unknown)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("event not found"));
}

#[tokio::test]
async fn test_reserve_then_capacity_reflects_hold() {
    let (app, store) = test_app(Arc::new(SystemClock));
    let event = Event::new("Supper Club", 3000, 10);
    let event_id = event.id;
    store.create_event(&event).await.unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/events/{}/reserve", event_id),
            json!({ "tickets": [{}, {}] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ticket_count"], 2);
    assert_eq!(body["item_price_cents"], 3000);
    assert_eq!(body["total_price_cents"], 6000);

    let response = app
        .oneshot(get(&format!("/v1/events/{}/capacity", event_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["tickets_remaining"], 8);
    assert_eq!(body["sold_out"], false);
}

#[tokio::test]
async fn test_reserve_with_no_tickets_is_400() {
    let (app, store) = test_app(Arc::new(SystemClock));
    let event = Event::new("Supper Club", 3000, 10);
    let event_id = event.id;
    store.create_event(&event).await.unwrap();

    let response = app
        .oneshot(post_json(
            &format!("/v1/events/{}/reserve", event_id),
            json!({ "tickets": [] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reserving_past_capacity_is_409() {
    let (app, store) = test_app(Arc::new(SystemClock));
    let event = Event::new("Tiny Show", 1500, 1);
    let event_id = event.id;
    store.create_event(&event).await.unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/events/{}/reserve", event_id),
            json!({ "tickets": [{}] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/events/{}/reserve", event_id),
            json!({ "tickets": [{}] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("insufficient tickets remaining"));

    let response = app
        .oneshot(get(&format!("/v1/events/{}/capacity", event_id)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["tickets_remaining"], 0);
    assert_eq!(body["sold_out"], true);
}

#[tokio::test]
async fn test_confirm_and_cancel_flow() {
    let (app, store) = test_app(Arc::new(SystemClock));
    let event = Event::new("Supper Club", 3000, 10);
    let event_id = event.id;
    store.create_event(&event).await.unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/events/{}/reserve", event_id),
            json!({ "tickets": [{}, {}, {}] }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let reservation_id = body["reservation_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post(&format!("/v1/reservations/{}/confirm", reservation_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "paid");
    assert_eq!(body["tickets"], 3);

    // Confirming again finds no reserved tickets left under that id.
    let response = app
        .clone()
        .oneshot(post(&format!("/v1/reservations/{}/confirm", reservation_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A fresh reservation can still be cancelled.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/events/{}/reserve", event_id),
            json!({ "tickets": [{}] }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let second_id = body["reservation_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post(&format!("/v1/reservations/{}/cancel", second_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "cancelled");

    // 3 paid remain, the cancelled one no longer counts.
    let response = app
        .oneshot(get(&format!("/v1/events/{}/capacity", event_id)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["tickets_remaining"], 7);
}

#[tokio::test]
async fn test_expired_hold_is_released_through_the_api() {
    let clock = ManualClock::new(chrono::Utc::now());
    let (app, store) = test_app(Arc::new(clock.clone()));
    let event = Event::new("Tiny Show", 1500, 1);
    let event_id = event.id;
    store.create_event(&event).await.unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/events/{}/reserve", event_id),
            json!({ "tickets": [{}] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let reservation_id = body["reservation_id"].as_str().unwrap().to_string();

    clock.advance(chrono::Duration::seconds(601));

    // The capacity check sweeps the stale hold and frees the seat.
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/events/{}/capacity", event_id)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["tickets_remaining"], 1);

    // The reservation is gone; a late payment confirmation fails.
    let response = app
        .oneshot(post(&format!("/v1/reservations/{}/confirm", reservation_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
