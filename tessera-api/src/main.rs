use std::net::SocketAddr;
use std::sync::Arc;

use tessera_api::{app, state::AppState};
use tessera_core::SystemClock;
use tessera_store::{Config, DbClient, PgTicketStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Tessera API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let store: Arc<dyn tessera_core::TicketRepository> =
        Arc::new(PgTicketStore::new(db.pool.clone(), Arc::new(SystemClock)));

    let rules = config.booking.clone();
    tokio::spawn(tessera_api::worker::start_expiry_worker(
        store.clone(),
        rules.ttl(),
        rules.sweep_interval(),
    ));

    let app = app(AppState { store, rules });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
