use std::sync::Arc;

use shopdash_core::clock::{Clock, SystemClock};
use shopdash_core::config::Config;
use shopdash_core::dashboard::Dashboard;
use shopdash_duckdb::DuckDbBackend;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Kept alongside the dashboard for the health probe.
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    pub dashboard: Dashboard,
}

impl AppState {
    /// Construct a new `AppState` reading "today" from the system clock.
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        Self::with_clock(db, config, Arc::new(SystemClock))
    }

    /// Like [`AppState::new`] but with an explicit clock, so every window
    /// computed by the dashboard is anchored on `clock.today()`.
    pub fn with_clock(db: DuckDbBackend, config: Config, clock: Arc<dyn Clock>) -> Self {
        let db = Arc::new(db);
        let dashboard = Dashboard::new(db.clone(), clock);
        Self {
            db,
            config: Arc::new(config),
            dashboard,
        }
    }
}
