//! Quota-aware generation relay
//!
//! Description-mode generation consumes credits, so before dispatching
//! one the relay checks the active account's remaining balance. A
//! drained account is disabled and the pool advances to the next active
//! one, refreshing its session token before the retry. The retry budget
//! is the number of active accounts captured when the request arrived,
//! so a request never loops longer than one full pass over the pool.

use serde_json::Value;
use suno_pool::Pool;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::upstream::StudioClient;

/// Relay a generation call, rotating past drained accounts.
///
/// A refresh failure while bringing the next account online consumes an
/// attempt, it does not disable the account. Quota-check and generation
/// errors from the studio API propagate as upstream errors without
/// touching the pool.
pub async fn generate_with_rotation(
    pool: &Pool,
    studio: &StudioClient,
    body: &Value,
) -> Result<Value> {
    let budget = pool.active_count().await;
    if budget == 0 {
        return Err(suno_pool::Error::NoActiveAccounts.into());
    }

    for attempt in 1..=budget {
        let creds = match pool.active_credentials().await {
            Some(creds) => creds,
            None => match pool.ensure_session().await {
                Ok(()) => match pool.active_credentials().await {
                    Some(creds) => creds,
                    None => continue,
                },
                Err(e @ suno_pool::Error::Store(_)) => return Err(e.into()),
                Err(e) => {
                    warn!(attempt, budget, error = %e, "could not bring a session online");
                    continue;
                }
            },
        };

        let credits = studio.credits(&creds.token).await?;
        if credits.credits_left > 0 {
            debug!(
                account_id = %creds.account_id,
                credits_left = credits.credits_left,
                attempt,
                "dispatching generation"
            );
            return studio.generate(&creds.token, body).await;
        }

        info!(
            account_id = %creds.account_id,
            attempt,
            budget,
            "account out of credits, rotating"
        );
        match pool.rotate_from(&creds.account_id).await {
            Ok(()) => {}
            Err(e @ suno_pool::Error::Store(_)) => return Err(e.into()),
            Err(e) => {
                warn!(attempt, budget, error = %e, "rotation failed");
            }
        }
    }

    Err(Error::AllAccountsExhausted { attempts: budget })
}
