use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use tessera_core::{
    ActionType, Clock, Event, LedgerError, Reservation, TicketRepository, TicketRequest, User,
};

use crate::ledger::TicketLedger;

/// `TicketRepository` backed by the in-memory ledger.
///
/// The ledger mutex is held across each whole operation, which gives the
/// same per-event linearizability the Postgres store gets from its row
/// lock. Used by the API tests and small deployments without a database.
pub struct InMemoryTicketStore {
    ledger: Mutex<TicketLedger>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTicketStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Mutex::new(TicketLedger::new()),
            clock,
        }
    }

    /// Run a closure against the underlying ledger. Test seeding hook.
    pub async fn with_ledger<R>(&self, f: impl FnOnce(&mut TicketLedger) -> R) -> R {
        let mut ledger = self.ledger.lock().await;
        f(&mut ledger)
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketStore {
    async fn create_event(&self, event: &Event) -> Result<(), LedgerError> {
        let mut ledger = self.ledger.lock().await;
        ledger.insert_event(event.clone());
        Ok(())
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Event, LedgerError> {
        let ledger = self.ledger.lock().await;
        ledger
            .event(event_id)
            .cloned()
            .ok_or(LedgerError::EventNotFound(event_id))
    }

    async fn create_user(&self, user: &User) -> Result<(), LedgerError> {
        let mut ledger = self.ledger.lock().await;
        ledger.insert_user(user.clone());
        Ok(())
    }

    async fn reserve_check(&self, event_id: Uuid, ttl: Duration) -> Result<i64, LedgerError> {
        let now = self.clock.now();
        let mut ledger = self.ledger.lock().await;
        ledger.reserve_check(event_id, ttl, now)
    }

    async fn reserve_tickets(
        &self,
        event_id: Uuid,
        requests: &[TicketRequest],
        ttl: Duration,
        acting_user: Option<Uuid>,
    ) -> Result<Reservation, LedgerError> {
        let now = self.clock.now();
        let mut ledger = self.ledger.lock().await;
        ledger.reserve_tickets(event_id, requests, ttl, now, acting_user)
    }

    async fn confirm_payment(
        &self,
        reserve_action: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        let now = self.clock.now();
        let mut ledger = self.ledger.lock().await;
        ledger.confirm_payment(reserve_action, now, acting_user)
    }

    async fn cancel_reservation(
        &self,
        reserve_action: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        let now = self.clock.now();
        let mut ledger = self.ledger.lock().await;
        ledger.cancel_reservation(reserve_action, now, acting_user)
    }

    async fn record_action(
        &self,
        user_id: Uuid,
        action_type: ActionType,
    ) -> Result<Uuid, LedgerError> {
        let now = self.clock.now();
        let mut ledger = self.ledger.lock().await;
        ledger.record_action(user_id, action_type, now)
    }

    async fn sweep_expired(&self, ttl: Duration) -> Result<u64, LedgerError> {
        let now = self.clock.now();
        let mut ledger = self.ledger.lock().await;
        Ok(ledger.sweep_expired(ttl, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tessera_core::{ManualClock, SystemClock, TicketStatus};

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let store = Arc::new(InMemoryTicketStore::new(Arc::new(SystemClock)));
        let event = Event::new("Supper Club", 3000, 5);
        let event_id = event.id;
        store.create_event(&event).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .reserve_tickets(
                        event_id,
                        &[TicketRequest::default()],
                        Duration::seconds(60),
                        None,
                    )
                    .await
            }));
        }

        let mut succeeded = 0;
        let mut sold_out = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(LedgerError::SoldOut { .. }) => sold_out += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(sold_out, 15);
        store
            .with_ledger(|ledger| {
                let tickets = ledger.tickets_for(event_id);
                assert_eq!(tickets.len(), 5);
                assert!(tickets.iter().all(|t| t.status == TicketStatus::Reserved));
                assert_eq!(ledger.event(event_id).unwrap().tickets_taken, 5);
            })
            .await;
    }

    #[tokio::test]
    async fn test_sweep_expired_with_manual_clock() {
        let clock = ManualClock::new(Utc::now());
        let store = InMemoryTicketStore::new(Arc::new(clock.clone()));
        let event = Event::new("Singing", 2500, 10);
        let event_id = event.id;
        store.create_event(&event).await.unwrap();

        store
            .reserve_tickets(
                event_id,
                &[TicketRequest::default(), TicketRequest::default()],
                Duration::seconds(60),
                None,
            )
            .await
            .unwrap();
        assert_eq!(store.sweep_expired(Duration::seconds(60)).await.unwrap(), 0);

        clock.advance(Duration::seconds(61));
        assert_eq!(store.sweep_expired(Duration::seconds(60)).await.unwrap(), 2);
        assert_eq!(store.get_event(event_id).await.unwrap().tickets_taken, 0);
    }
}
