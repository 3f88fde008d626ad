use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use tessera_core::{
    Action, ActionType, Event, LedgerError, Reservation, Ticket, TicketRequest, TicketStatus, User,
};

/// In-memory ticket ledger.
///
/// Holds the same data the Postgres store does and applies the same
/// sweep / recompute / persist sequence. Callers are responsible for
/// serializing access (see `InMemoryTicketStore`); every method takes `now`
/// explicitly so expiry behavior is deterministic.
pub struct TicketLedger {
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
    users: HashMap<Uuid, User>,
    actions: Vec<Action>,
}

impl TicketLedger {
    pub fn new() -> Self {
        Self {
            events: HashMap::new(),
            tickets: HashMap::new(),
            users: HashMap::new(),
            actions: Vec::new(),
        }
    }

    pub fn insert_event(&mut self, event: Event) {
        self.events.insert(event.id, event);
    }

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Seed a ticket row directly, bypassing the capacity check. Intended
    /// for loading existing state; purchase flows go through
    /// `reserve_tickets`.
    pub fn insert_ticket(&mut self, ticket: Ticket) {
        self.tickets.insert(ticket.id, ticket);
    }

    pub fn event(&self, event_id: Uuid) -> Option<&Event> {
        self.events.get(&event_id)
    }

    pub fn user(&self, user_id: Uuid) -> Option<&User> {
        self.users.get(&user_id)
    }

    pub fn tickets_for(&self, event_id: Uuid) -> Vec<&Ticket> {
        self.tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .collect()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// The reservation function: sweep expired holds for the event,
    /// recompute `tickets_taken` from the surviving rows, persist it on the
    /// event, and return the remaining capacity (negative if oversold).
    pub fn reserve_check(
        &mut self,
        event_id: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<i64, LedgerError> {
        if !self.events.contains_key(&event_id) {
            return Err(LedgerError::EventNotFound(event_id));
        }

        self.sweep_event(event_id, ttl, now);
        let taken = self.count_taken(event_id);
        match self.events.get_mut(&event_id) {
            Some(event) => {
                event.tickets_taken = taken;
                Ok(event.remaining_capacity())
            }
            None => Err(LedgerError::EventNotFound(event_id)),
        }
    }

    /// Capacity check plus ticket creation in one step. Fails with
    /// `SoldOut` without touching the ledger beyond the sweep itself.
    pub fn reserve_tickets(
        &mut self,
        event_id: Uuid,
        requests: &[TicketRequest],
        ttl: Duration,
        now: DateTime<Utc>,
        acting_user: Option<Uuid>,
    ) -> Result<Reservation, LedgerError> {
        if requests.is_empty() {
            return Err(LedgerError::InvalidRequest(
                "at least one ticket must be reserved".to_string(),
            ));
        }
        if let Some(user_id) = acting_user {
            if !self.users.contains_key(&user_id) {
                return Err(LedgerError::UserNotFound(user_id));
            }
        }
        let price_cents = self
            .events
            .get(&event_id)
            .ok_or(LedgerError::EventNotFound(event_id))?
            .price_cents;

        let remaining = self.reserve_check(event_id, ttl, now)?;
        let requested = requests.len() as i64;
        if requested > remaining {
            return Err(LedgerError::SoldOut {
                requested,
                remaining,
            });
        }

        let reserve_action = Uuid::new_v4();
        for request in requests {
            let ticket = Ticket {
                id: Uuid::new_v4(),
                event_id,
                user_id: request.user_id,
                status: TicketStatus::Reserved,
                reserve_action,
                created_ts: now,
            };
            self.tickets.insert(ticket.id, ticket);
        }
        if let Some(event) = self.events.get_mut(&event_id) {
            event.tickets_taken += requested as i32;
        }
        if let Some(user_id) = acting_user {
            self.record_action(user_id, ActionType::ReserveTickets, now)?;
        }

        Ok(Reservation {
            id: reserve_action,
            event_id,
            ticket_count: requested,
            item_price_cents: price_cents,
            total_price_cents: price_cents * requested,
            reserved_at: now,
        })
    }

    /// Flip a reservation's tickets to `paid`. A reservation whose holds
    /// were already swept no longer exists and comes back as not found.
    pub fn confirm_payment(
        &mut self,
        reserve_action: Uuid,
        now: DateTime<Utc>,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        self.transition_reservation(
            reserve_action,
            TicketStatus::Paid,
            ActionType::BuyTickets,
            now,
            acting_user,
        )
    }

    /// Mark a reservation's tickets `cancelled`, releasing their capacity.
    pub fn cancel_reservation(
        &mut self,
        reserve_action: Uuid,
        now: DateTime<Utc>,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        self.transition_reservation(
            reserve_action,
            TicketStatus::Cancelled,
            ActionType::CancelReservedTickets,
            now,
            acting_user,
        )
    }

    /// Append an audit action and bump the user's last-seen timestamp.
    /// `active_ts` never moves backwards.
    pub fn record_action(
        &mut self,
        user_id: Uuid,
        action_type: ActionType,
        now: DateTime<Utc>,
    ) -> Result<Uuid, LedgerError> {
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        if now > user.active_ts {
            user.active_ts = now;
        }
        let action = Action {
            id: Uuid::new_v4(),
            user_id,
            action_type,
            ts: now,
        };
        let id = action.id;
        self.actions.push(action);
        Ok(id)
    }

    /// Sweep expired holds for every event and refresh the affected
    /// counters. Returns how many tickets were deleted.
    pub fn sweep_expired(&mut self, ttl: Duration, now: DateTime<Utc>) -> u64 {
        let mut affected = Vec::new();
        let before = self.tickets.len();
        self.tickets.retain(|_, ticket| {
            if ticket.status == TicketStatus::Reserved && now - ticket.created_ts >= ttl {
                affected.push(ticket.event_id);
                false
            } else {
                true
            }
        });
        affected.sort();
        affected.dedup();
        for event_id in affected {
            let taken = self.count_taken(event_id);
            if let Some(event) = self.events.get_mut(&event_id) {
                event.tickets_taken = taken;
            }
        }
        (before - self.tickets.len()) as u64
    }

    fn transition_reservation(
        &mut self,
        reserve_action: Uuid,
        to: TicketStatus,
        action_type: ActionType,
        now: DateTime<Utc>,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        if let Some(user_id) = acting_user {
            if !self.users.contains_key(&user_id) {
                return Err(LedgerError::UserNotFound(user_id));
            }
        }
        let mut event_id = None;
        let mut updated = 0u64;
        for ticket in self.tickets.values_mut() {
            if ticket.reserve_action == reserve_action && ticket.status == TicketStatus::Reserved {
                ticket.status = to;
                event_id = Some(ticket.event_id);
                updated += 1;
            }
        }
        let event_id = event_id.ok_or(LedgerError::ReservationNotFound(reserve_action))?;
        let taken = self.count_taken(event_id);
        if let Some(event) = self.events.get_mut(&event_id) {
            event.tickets_taken = taken;
        }
        if let Some(user_id) = acting_user {
            self.record_action(user_id, action_type, now)?;
        }
        Ok(updated)
    }

    /// Expired means the hold's age reached the ttl (`age >= ttl`), so a
    /// sweep at exactly `created_ts + ttl` deletes the hold.
    fn sweep_event(&mut self, event_id: Uuid, ttl: Duration, now: DateTime<Utc>) -> u64 {
        let before = self.tickets.len();
        self.tickets.retain(|_, ticket| {
            !(ticket.event_id == event_id
                && ticket.status == TicketStatus::Reserved
                && now - ticket.created_ts >= ttl)
        });
        (before - self.tickets.len()) as u64
    }

    fn count_taken(&self, event_id: Uuid) -> i32 {
        self.tickets
            .values()
            .filter(|t| t.event_id == event_id && t.status != TicketStatus::Cancelled)
            .count() as i32
    }
}

impl Default for TicketLedger {
    fn default() -> Self {
        Self::new()
    }
}
