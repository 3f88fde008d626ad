use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::event::Event;
use crate::user::{ActionType, User};

/// One ticket asked for within a reservation call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TicketRequest {
    pub user_id: Option<Uuid>,
}

/// Summary of a successful reservation, returned to the purchase flow.
/// The payment collaborator must confirm against `id` before the ttl
/// elapses or the held tickets are swept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub ticket_count: i64,
    pub item_price_cents: i64,
    pub total_price_cents: i64,
    pub reserved_at: DateTime<Utc>,
}

/// Storage seam for the reservation engine.
///
/// Every method that touches tickets for an event is atomic with respect to
/// concurrent calls for the same event: the Postgres implementation takes a
/// row lock on the event for the duration of its transaction, the in-memory
/// implementation holds the ledger mutex across the whole operation. On any
/// error no partial mutation is visible; callers retry the whole call.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create_event(&self, event: &Event) -> Result<(), LedgerError>;

    async fn get_event(&self, event_id: Uuid) -> Result<Event, LedgerError>;

    async fn create_user(&self, user: &User) -> Result<(), LedgerError>;

    /// Sweep expired reservations for the event, recompute and persist
    /// `tickets_taken`, and return the remaining capacity. May return a
    /// negative number if the event is oversold; callers treat non-positive
    /// as sold out.
    async fn reserve_check(&self, event_id: Uuid, ttl: Duration) -> Result<i64, LedgerError>;

    /// Run the capacity check and, if enough tickets remain, create one
    /// `reserved` ticket per request under a fresh reservation id, all in
    /// the same atomic scope as the check.
    async fn reserve_tickets(
        &self,
        event_id: Uuid,
        requests: &[TicketRequest],
        ttl: Duration,
        acting_user: Option<Uuid>,
    ) -> Result<Reservation, LedgerError>;

    /// Payment completed: flip the reservation's tickets to `paid`.
    /// Returns how many tickets were confirmed; a reservation whose tickets
    /// were already swept comes back as `ReservationNotFound`.
    async fn confirm_payment(
        &self,
        reserve_action: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError>;

    /// Mark the reservation's tickets `cancelled` and release their
    /// capacity. Cancelled rows are kept for audit.
    async fn cancel_reservation(
        &self,
        reserve_action: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError>;

    /// Append an audit action for the user and bump their `active_ts`.
    async fn record_action(
        &self,
        user_id: Uuid,
        action_type: ActionType,
    ) -> Result<Uuid, LedgerError>;

    /// Sweep expired reservations across all events. Lazy sweeping on each
    /// capacity check is the correctness mechanism; this bounds how stale
    /// `tickets_taken` can get between checks. Returns tickets deleted.
    async fn sweep_expired(&self, ttl: Duration) -> Result<u64, LedgerError>;
}
