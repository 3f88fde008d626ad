use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::naming::slugify;

/// A sellable event with a fixed ticket allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price_cents: i64,
    pub ticket_limit: i32,
    /// Cached count of non-cancelled tickets. Only the reservation engine
    /// writes this field; it is recomputed from the ticket rows on every
    /// capacity check.
    pub tickets_taken: i32,
}

impl Event {
    pub fn new(name: &str, price_cents: i64, ticket_limit: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            price_cents,
            ticket_limit,
            tickets_taken: 0,
        }
    }

    /// Tickets still sellable. Negative means the event is oversold.
    pub fn remaining_capacity(&self) -> i64 {
        i64::from(self.ticket_limit) - i64::from(self.tickets_taken)
    }
}
