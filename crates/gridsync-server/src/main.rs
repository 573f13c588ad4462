//! Wiring binary: loads [`Config`], connects the Postgres store, the
//! optional Redis bus, the [`gridsync_hub::StreamHub`], the solve
//! service and the puzzle catalog, then serves the HTTP + WebSocket
//! surface on an axum router.

mod bus;
mod config;
mod error;
mod routes;
mod state;
mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use envconfig::Envconfig;
use gridsync_catalog::{PostgresPuzzleCatalog, PuzzleCatalog};
use gridsync_hub::{HubConfig, StreamHub};
use gridsync_solve::{PostgresSolveRepository, SolveService};
use gridsync_store_postgres::PostgresEventStore;
use tower_http::trace::TraceLayer;

use crate::bus::AnyBus;
use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::init_from_env()?;
    tracing::info!(bind_addr = %config.bind_addr, "starting gridsync-server");

    let store = Arc::new(PostgresEventStore::connect(&config.database_url).await?);

    let solve_repository = Arc::new(PostgresSolveRepository::connect(&config.database_url).await?);
    let catalog: Arc<dyn PuzzleCatalog> =
        Arc::new(PostgresPuzzleCatalog::connect(&config.database_url).await?);

    let solve_service = Arc::new(SolveService::new(store.clone(), solve_repository));

    let bus = match &config.redis_url {
        Some(redis_url) => {
            tracing::info!("connecting cross-instance bus");
            AnyBus::redis(gridsync_bus_redis::RedisBus::connect(redis_url).await?)
        }
        None => {
            tracing::info!("no REDIS_URL configured, running single-instance fan-out only");
            AnyBus::null()
        }
    };

    let hub_config = HubConfig {
        outbound_queue_capacity: config.outbound_queue_capacity,
        reorder_window: config.reorder_window(),
    };
    let origin_id = uuid::Uuid::new_v4().to_string();
    let hub = Arc::new(StreamHub::new(store.clone(), Arc::new(bus), origin_id, hub_config));

    let config = Arc::new(config);
    let bind_addr = config.bind_addr;

    let state = AppState {
        store,
        hub,
        solve_service,
        catalog,
        config,
    };

    let app = Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/puzzles", get(routes::list_puzzles))
        .route("/puzzles/:pid", get(routes::get_puzzle))
        .route("/games", post(routes::create_game))
        .route("/games/:gid", get(routes::get_game_state))
        .route("/games/:gid/solve", post(routes::record_solve))
        .route("/ws", get(ws::upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
