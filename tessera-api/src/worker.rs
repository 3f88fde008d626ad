use chrono::Duration;
use std::sync::Arc;
use tracing::{error, info};

use tessera_core::TicketRepository;

/// Background sweep of expired reservations.
///
/// The lazy sweep inside every capacity check is what keeps the counts
/// correct; this task only bounds how long an abandoned hold can sit in
/// the ledger between checks.
pub async fn start_expiry_worker(
    store: Arc<dyn TicketRepository>,
    ttl: Duration,
    every: std::time::Duration,
) {
    info!("Expiry worker started, sweeping every {}s", every.as_secs());
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match store.sweep_expired(ttl).await {
            Ok(0) => {}
            Ok(swept) => info!("Swept {} expired reservations", swept),
            Err(e) => error!("Expiry sweep failed: {}", e),
        }
    }
}
