//! Front-of-list account selection and quota-driven rotation
//!
//! The pool pairs the account store with the shared session. Selection
//! always picks the front of the active set (accounts-file order with
//! disabled IDs removed), so a single account serves all traffic until
//! its credits drain; the pool then disables it and advances to the next.
//! A rotation Mutex serializes concurrent rotations: a request that finds
//! the pool already moved past its drained account skips the duplicate
//! disable and just retries with the new account.

use std::sync::Arc;
use std::time::Duration;

use suno_auth::AccountStore;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::session::{ActiveCredentials, Session};

/// Rotating account pool bound to one shared session.
pub struct Pool {
    store: Arc<AccountStore>,
    session: Session,
    rotation: Mutex<()>,
}

impl Pool {
    /// Create a pool backed by the given account store.
    ///
    /// No account is selected yet; call `activate_front` to bring the
    /// first active account online.
    pub fn new(
        store: Arc<AccountStore>,
        client: reqwest::Client,
        clerk_url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            session: Session::new(client, clerk_url, timeout),
            rotation: Mutex::new(()),
        }
    }

    /// Select the front active account and refresh its session token.
    pub async fn activate_front(&self) -> Result<()> {
        let _rotation = self.rotation.lock().await;
        self.select_front().await?;
        self.session.refresh().await
    }

    /// Retire `drained` and advance to the next active account.
    ///
    /// No-op when the active account already moved past `drained`: the
    /// caller lost a rotation race and can simply retry with whatever
    /// account is now active.
    pub async fn rotate_from(&self, drained: &str) -> Result<()> {
        let _rotation = self.rotation.lock().await;
        if self.session.current_account().await.as_deref() != Some(drained) {
            debug!(
                account_id = drained,
                "pool already moved on, skipping rotation"
            );
            return Ok(());
        }

        self.store
            .disable(drained)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        metrics::counter!("relay_account_rotations_total").increment(1);

        self.select_front().await?;
        self.session.refresh().await
    }

    /// Make sure an account is selected and refresh its token.
    ///
    /// Used by requests that find no usable credentials, for example when
    /// the initial activation failed and the background refresher has not
    /// recovered the session yet.
    pub async fn ensure_session(&self) -> Result<()> {
        let _rotation = self.rotation.lock().await;
        if self.session.current_account().await.is_none() {
            self.select_front().await?;
        }
        self.session.refresh().await
    }

    /// Refresh the active account's session token.
    pub async fn refresh_token(&self) -> Result<()> {
        self.session.refresh().await
    }

    /// Number of active (not disabled) accounts.
    pub async fn active_count(&self) -> usize {
        self.store.active_count().await
    }

    /// ID of the active account, if one is selected.
    pub async fn current_account(&self) -> Option<String> {
        self.session.current_account().await
    }

    /// Bearer token of the active account, once refreshed.
    pub async fn bearer_token(&self) -> Option<String> {
        self.session.bearer_token().await
    }

    /// Account ID and bearer token together, when both are present.
    pub async fn active_credentials(&self) -> Option<ActiveCredentials> {
        self.session.active_credentials().await
    }

    /// The backing account store.
    pub fn account_store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    async fn select_front(&self) -> Result<()> {
        let (id, account) = self
            .store
            .first_active()
            .await
            .ok_or(Error::NoActiveAccounts)?;
        info!(account_id = %id, "activating front account");
        self.session.select(&id, &account).await;
        Ok(())
    }

    /// Pool health summary for the health endpoint.
    ///
    /// Status mapping: no active accounts → unhealthy, active accounts
    /// but no usable token → degraded, otherwise healthy.
    pub async fn health(&self) -> serde_json::Value {
        let ids = self.store.account_ids().await;
        let disabled = self.store.disabled().await;
        let current = self.session.current_account().await;
        let token_ready = self.session.bearer_token().await.is_some();
        let cookie_count = self.session.cookie_count().await;

        let mut accounts = Vec::new();
        let mut active_count = 0usize;
        let mut disabled_count = 0usize;
        for id in &ids {
            if disabled.iter().any(|d| d == id) {
                disabled_count += 1;
                accounts.push(serde_json::json!({
                    "id": id,
                    "status": "disabled"
                }));
            } else {
                active_count += 1;
                accounts.push(serde_json::json!({
                    "id": id,
                    "status": "active"
                }));
            }
        }

        let status = if active_count == 0 {
            "unhealthy"
        } else if !token_ready {
            "degraded"
        } else {
            "healthy"
        };

        serde_json::json!({
            "status": status,
            "accounts_total": ids.len(),
            "accounts_active": active_count,
            "accounts_disabled": disabled_count,
            "current_account": current,
            "session_token_ready": token_ready,
            "session_cookies": cookie_count,
            "accounts": accounts
        })
    }
}
