//! Background sweeper for expired sessions.
//!
//! Eviction is absolute-age-based: a session with a freshly refreshed token
//! is still removed once 24 hours have elapsed since creation, so sessions
//! cannot be extended indefinitely by repeated use.

use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::info;

use crate::main_lib::AppState;

/// Sweep interval: 1 hour.
const SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Starts the session sweeper for the lifetime of the process.
pub fn start_session_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        info!("Session sweeper started (1-hour interval)");

        let mut sweep_interval = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            sweep_interval.tick().await;
            let evicted = state.sessions.sweep_expired();
            if evicted > 0 {
                info!(
                    "Evicted {} expired sessions ({} remaining)",
                    evicted,
                    state.sessions.session_count()
                );
            }
        }
    });
}
