use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use tessera_core::{
    ActionType, Clock, Event, LedgerError, Reservation, TicketRepository, TicketRequest,
    TicketStatus, User,
};

/// `TicketRepository` backed by Postgres.
///
/// Each operation runs in one transaction that first takes `SELECT ... FOR
/// UPDATE` on the event row, so concurrent calls for the same event are
/// serialized by the database and no call ever observes a partially applied
/// sweep or count. Business logic stays in the application; the schema has
/// no triggers or stored procedures.
pub struct PgTicketStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgTicketStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    async fn transition_reservation(
        &self,
        reserve_action: Uuid,
        to: TicketStatus,
        action_type: ActionType,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let event_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT event FROM tickets WHERE reserve_action = $1 AND status = 'reserved' LIMIT 1",
        )
        .bind(reserve_action)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;
        let event_id = event_id.ok_or(LedgerError::ReservationNotFound(reserve_action))?;

        lock_event(&mut tx, event_id).await?;
        let updated = sqlx::query(
            "UPDATE tickets SET status = $2 WHERE reserve_action = $1 AND status = 'reserved'",
        )
        .bind(reserve_action)
        .bind(to.as_str())
        .execute(&mut *tx)
        .await
        .map_err(storage)?
        .rows_affected();
        if updated == 0 {
            // Swept between the lookup and the lock.
            return Err(LedgerError::ReservationNotFound(reserve_action));
        }

        recount(&mut tx, event_id).await?;
        if let Some(user_id) = acting_user {
            record_action_tx(&mut tx, user_id, action_type, now).await?;
        }
        tx.commit().await.map_err(storage)?;
        Ok(updated)
    }
}

#[async_trait]
impl TicketRepository for PgTicketStore {
    async fn create_event(&self, event: &Event) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, slug, price_cents, ticket_limit, tickets_taken)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.slug)
        .bind(event.price_cents)
        .bind(event.ticket_limit)
        .bind(event.tickets_taken)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Event, LedgerError> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, name, slug, price_cents, ticket_limit, tickets_taken FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or(LedgerError::EventNotFound(event_id))?;
        Ok(row.into())
    }

    async fn create_user(&self, user: &User) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, email, active_ts)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.active_ts)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn reserve_check(&self, event_id: Uuid, ttl: Duration) -> Result<i64, LedgerError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let locked = lock_event(&mut tx, event_id).await?;
        let (_swept, taken) = sweep_and_recount(&mut tx, event_id, now - ttl).await?;
        tx.commit().await.map_err(storage)?;

        Ok(i64::from(locked.ticket_limit) - taken)
    }

    async fn reserve_tickets(
        &self,
        event_id: Uuid,
        requests: &[TicketRequest],
        ttl: Duration,
        acting_user: Option<Uuid>,
    ) -> Result<Reservation, LedgerError> {
        if requests.is_empty() {
            return Err(LedgerError::InvalidRequest(
                "at least one ticket must be reserved".to_string(),
            ));
        }
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let locked = lock_event(&mut tx, event_id).await?;
        let (_swept, taken) = sweep_and_recount(&mut tx, event_id, now - ttl).await?;
        let remaining = i64::from(locked.ticket_limit) - taken;
        let requested = requests.len() as i64;
        if requested > remaining {
            // Dropping the transaction rolls the sweep back; the next call
            // simply redoes it.
            return Err(LedgerError::SoldOut {
                requested,
                remaining,
            });
        }

        let reserve_action = Uuid::new_v4();
        for request in requests {
            sqlx::query(
                r#"
                INSERT INTO tickets (id, event, user_id, status, reserve_action, created_ts)
                VALUES ($1, $2, $3, 'reserved', $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(event_id)
            .bind(request.user_id)
            .bind(reserve_action)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }
        persist_taken(&mut tx, event_id, taken + requested).await?;
        if let Some(user_id) = acting_user {
            record_action_tx(&mut tx, user_id, ActionType::ReserveTickets, now).await?;
        }
        tx.commit().await.map_err(storage)?;

        Ok(Reservation {
            id: reserve_action,
            event_id,
            ticket_count: requested,
            item_price_cents: locked.price_cents,
            total_price_cents: locked.price_cents * requested,
            reserved_at: now,
        })
    }

    async fn confirm_payment(
        &self,
        reserve_action: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        self.transition_reservation(
            reserve_action,
            TicketStatus::Paid,
            ActionType::BuyTickets,
            acting_user,
        )
        .await
    }

    async fn cancel_reservation(
        &self,
        reserve_action: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        self.transition_reservation(
            reserve_action,
            TicketStatus::Cancelled,
            ActionType::CancelReservedTickets,
            acting_user,
        )
        .await
    }

    async fn record_action(
        &self,
        user_id: Uuid,
        action_type: ActionType,
    ) -> Result<Uuid, LedgerError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let action_id = record_action_tx(&mut tx, user_id, action_type, now).await?;
        tx.commit().await.map_err(storage)?;
        Ok(action_id)
    }

    async fn sweep_expired(&self, ttl: Duration) -> Result<u64, LedgerError> {
        let now = self.clock.now();
        let cutoff = now - ttl;

        let event_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT event FROM tickets WHERE status = 'reserved' AND created_ts <= $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut total = 0u64;
        for event_id in event_ids {
            let mut tx = self.pool.begin().await.map_err(storage)?;
            match lock_event(&mut tx, event_id).await {
                Ok(_) => {}
                // Event deleted since the scan; its tickets went with it.
                Err(LedgerError::EventNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
            let (swept, _taken) = sweep_and_recount(&mut tx, event_id, cutoff).await?;
            tx.commit().await.map_err(storage)?;
            if swept > 0 {
                tracing::debug!("swept {} expired holds for event {}", swept, event_id);
            }
            total += swept;
        }
        Ok(total)
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
    slug: String,
    price_cents: i64,
    ticket_limit: i32,
    tickets_taken: i32,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            slug: row.slug,
            price_cents: row.price_cents,
            ticket_limit: row.ticket_limit,
            tickets_taken: row.tickets_taken,
        }
    }
}

struct LockedEvent {
    ticket_limit: i32,
    price_cents: i64,
}

fn storage(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

/// Take the row lock that serializes all ticket mutations for the event.
async fn lock_event(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
) -> Result<LockedEvent, LedgerError> {
    let row = sqlx::query("SELECT ticket_limit, price_cents FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage)?
        .ok_or(LedgerError::EventNotFound(event_id))?;
    Ok(LockedEvent {
        ticket_limit: row.try_get("ticket_limit").map_err(storage)?,
        price_cents: row.try_get("price_cents").map_err(storage)?,
    })
}

/// Delete expired holds (`age >= ttl`, so `created_ts <= cutoff`), then
/// recount and persist. Returns (tickets deleted, tickets taken).
async fn sweep_and_recount(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    cutoff: DateTime<Utc>,
) -> Result<(u64, i64), LedgerError> {
    let swept =
        sqlx::query("DELETE FROM tickets WHERE event = $1 AND status = 'reserved' AND created_ts <= $2")
            .bind(event_id)
            .bind(cutoff)
            .execute(&mut **tx)
            .await
            .map_err(storage)?
            .rows_affected();
    let taken = recount(tx, event_id).await?;
    Ok((swept, taken))
}

/// Recompute `tickets_taken` from the ticket rows and persist it.
async fn recount(tx: &mut Transaction<'_, Postgres>, event_id: Uuid) -> Result<i64, LedgerError> {
    let taken: i64 =
        sqlx::query_scalar("SELECT count(*) FROM tickets WHERE event = $1 AND status <> 'cancelled'")
            .bind(event_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(storage)?;
    persist_taken(tx, event_id, taken).await?;
    Ok(taken)
}

async fn persist_taken(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    taken: i64,
) -> Result<(), LedgerError> {
    sqlx::query("UPDATE events SET tickets_taken = $2 WHERE id = $1")
        .bind(event_id)
        .bind(i32::try_from(taken).unwrap_or(i32::MAX))
        .execute(&mut **tx)
        .await
        .map_err(storage)?;
    Ok(())
}

/// Application-level replacement for the old `actions` insert trigger:
/// the audit row and the `active_ts` bump land in the same transaction.
async fn record_action_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    action_type: ActionType,
    now: DateTime<Utc>,
) -> Result<Uuid, LedgerError> {
    let updated = sqlx::query("UPDATE users SET active_ts = GREATEST(active_ts, $2) WHERE id = $1")
        .bind(user_id)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(storage)?
        .rows_affected();
    if updated == 0 {
        return Err(LedgerError::UserNotFound(user_id));
    }

    let action_id = Uuid::new_v4();
    sqlx::query("INSERT INTO actions (id, user_id, type, ts) VALUES ($1, $2, $3, $4)")
        .bind(action_id)
        .bind(user_id)
        .bind(action_type.as_str())
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(storage)?;
    Ok(action_id)
}
