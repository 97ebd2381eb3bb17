//! Periodic background session token refresh
//!
//! Suno session tokens are short-lived, so a background task re-refreshes
//! the active account's token every few seconds. This keeps the request
//! path from paying refresh latency and keeps the rotated client cookie
//! current. Failures are logged and retried on the next tick; the task
//! never exits on its own.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::pool::Pool;

/// Spawn a background task that refreshes the session token every `interval`.
///
/// Errors are swallowed after logging so one bad cycle (Clerk outage,
/// no account selected yet) never kills the task.
///
/// Returns a `JoinHandle` for the spawned task.
pub fn spawn_refresh_task(pool: Arc<Pool>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick since startup just refreshed
        ticker.tick().await;

        loop {
            ticker.tick().await;
            refresh_cycle(&pool).await;
        }
    })
}

/// Run one refresh cycle against the active account.
async fn refresh_cycle(pool: &Pool) {
    match pool.refresh_token().await {
        Ok(()) => {
            metrics::counter!("relay_token_refresh_total", "outcome" => "success").increment(1);
            debug!("background session token refresh succeeded");
        }
        Err(e) => {
            metrics::counter!("relay_token_refresh_total", "outcome" => "error").increment(1);
            warn!(error = %e, "background session token refresh failed, will retry next tick");
        }
    }
}
