use uuid::Uuid;

/// Errors surfaced by the ticket ledger.
///
/// Capacity exhaustion during a plain capacity check is not an error; it is
/// expressed as a non-positive remaining count. `SoldOut` only occurs when a
/// reservation asks for more tickets than remain.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    #[error("reservation not found: {0}")]
    ReservationNotFound(Uuid),

    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    #[error("insufficient tickets remaining: requested {requested}, remaining {remaining}")]
    SoldOut { requested: i64, remaining: i64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Storage(String),
}
