use crate::{config::Config, db::Database};

/// Shared handle injected into every handler. Opened once in `main`, cloned per
/// request, dropped (closing the pool) on shutdown.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self { db, config }
    }
}
