use std::sync::Arc;

use tessera_core::TicketRepository;
use tessera_store::BookingRules;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TicketRepository>,
    pub rules: BookingRules,
}

impl AppState {
    pub fn ttl(&self) -> chrono::Duration {
        self.rules.ttl()
    }
}
