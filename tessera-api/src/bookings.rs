use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tessera_core::TicketRequest;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/events/{id}/capacity", get(event_capacity))
        .route("/v1/events/{id}/reserve", post(reserve_tickets))
        .route("/v1/reservations/{id}/confirm", post(confirm_payment))
        .route("/v1/reservations/{id}/cancel", post(cancel_reservation))
}

#[derive(Debug, Serialize)]
struct CapacityResponse {
    event_id: Uuid,
    tickets_remaining: i64,
    sold_out: bool,
}

async fn event_capacity(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<CapacityResponse>, AppError> {
    let remaining = state.store.reserve_check(event_id, state.ttl()).await?;
    Ok(Json(CapacityResponse {
        event_id,
        tickets_remaining: remaining,
        sold_out: remaining <= 0,
    }))
}

#[derive(Debug, Deserialize)]
struct ReserveRequest {
    tickets: Vec<TicketLine>,
    /// The user driving the purchase, when known. Recorded in the audit
    /// log alongside the reservation.
    #[serde(default)]
    user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct TicketLine {
    #[serde(default)]
    user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct ReserveResponse {
    reservation_id: Uuid,
    event_id: Uuid,
    ticket_count: i64,
    item_price_cents: i64,
    total_price_cents: i64,
    reserve_time: DateTime<Utc>,
}

async fn reserve_tickets(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<ReserveRequest>,
) -> Result<Json<ReserveResponse>, AppError> {
    let requests: Vec<TicketRequest> = req
        .tickets
        .iter()
        .map(|line| TicketRequest {
            user_id: line.user_id,
        })
        .collect();

    let reservation = state
        .store
        .reserve_tickets(event_id, &requests, state.ttl(), req.user_id)
        .await?;

    info!(
        "reserved {} tickets for event {} under {}",
        reservation.ticket_count, event_id, reservation.id
    );

    Ok(Json(ReserveResponse {
        reservation_id: reservation.id,
        event_id: reservation.event_id,
        ticket_count: reservation.ticket_count,
        item_price_cents: reservation.item_price_cents,
        total_price_cents: reservation.total_price_cents,
        reserve_time: reservation.reserved_at,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ActingUser {
    user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct TransitionResponse {
    reservation_id: Uuid,
    status: &'static str,
    tickets: u64,
}

async fn confirm_payment(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Query(acting): Query<ActingUser>,
) -> Result<Json<TransitionResponse>, AppError> {
    let tickets = state
        .store
        .confirm_payment(reservation_id, acting.user_id)
        .await?;
    info!("confirmed {} tickets for reservation {}", tickets, reservation_id);
    Ok(Json(TransitionResponse {
        reservation_id,
        status: "paid",
        tickets,
    }))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Query(acting): Query<ActingUser>,
) -> Result<Json<TransitionResponse>, AppError> {
    let tickets = state
        .store
        .cancel_reservation(reservation_id, acting.user_id)
        .await?;
    info!("cancelled {} tickets for reservation {}", tickets, reservation_id);
    Ok(Json(TransitionResponse {
        reservation_id,
        status: "cancelled",
        tickets,
    }))
}
