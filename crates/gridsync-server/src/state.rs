//! Shared application state handed to every axum handler: one
//! `Clone`-able struct of `Arc`s built once at startup.

use std::sync::Arc;

use gridsync_catalog::PuzzleCatalog;
use gridsync_hub::StreamHub;
use gridsync_solve::SolveService;
use gridsync_store_postgres::PostgresEventStore;

use crate::bus::AnyBus;
use crate::config::Config;

pub type Hub = StreamHub<PostgresEventStore, AnyBus>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PostgresEventStore>,
    pub hub: Arc<Hub>,
    pub solve_service: Arc<SolveService<PostgresEventStore>>,
    pub catalog: Arc<dyn PuzzleCatalog>,
    pub config: Arc<Config>,
}
