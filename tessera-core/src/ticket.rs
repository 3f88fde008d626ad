use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a ticket row.
///
/// Tickets are created `Reserved`, move to `Paid` when the payment
/// collaborator confirms, or to `Cancelled` on explicit cancellation.
/// A ticket still `Reserved` past its ttl is deleted outright by the
/// expiry sweep rather than transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Reserved,
    Paid,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Reserved => "reserved",
            TicketStatus::Paid => "paid",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: TicketStatus,
    /// Groups the tickets created by a single reservation call. Payment
    /// confirmation and cancellation address the whole group.
    pub reserve_action: Uuid,
    pub created_ts: DateTime<Utc>,
}
