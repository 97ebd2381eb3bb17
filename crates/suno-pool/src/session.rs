//! Shared session state for the active account
//!
//! One account is active at a time; its session state (Clerk session ID,
//! cookie jar, bearer token) lives behind a single Mutex so selection and
//! refresh can never interleave partially. Refresh copies the state out,
//! performs the Clerk call unlocked, and writes the result back only if
//! no selection happened in between, tracked by an epoch counter bumped
//! on every select. A refresh that lost the race is dropped rather than
//! merged into the new account's state.

use std::time::Duration;

use common::Secret;
use suno_auth::{Account, CookieJar, refresh_session_token};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Credentials of the active account, ready for an upstream call.
#[derive(Debug, Clone)]
pub struct ActiveCredentials {
    pub account_id: String,
    pub token: String,
}

#[derive(Default)]
struct SessionInner {
    /// Bumped on every select; a refresh carries the epoch it started
    /// under and discards its result if the counter moved.
    epoch: u64,
    account_id: Option<String>,
    session_id: String,
    jar: CookieJar,
    token: Option<Secret<String>>,
}

/// Session state for the currently selected account.
pub struct Session {
    inner: Mutex<SessionInner>,
    client: reqwest::Client,
    clerk_url: String,
    timeout: Duration,
}

impl Session {
    /// Create an empty session. No account is selected until `select`.
    pub fn new(client: reqwest::Client, clerk_url: String, timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(SessionInner::default()),
            client,
            clerk_url,
            timeout,
        }
    }

    /// Make `account` the active account, replacing the previous session
    /// state wholesale. The old account's jar and token never leak into
    /// the new session; the token stays unset until the next refresh.
    pub async fn select(&self, account_id: &str, account: &Account) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        inner.account_id = Some(account_id.to_string());
        inner.session_id = account.session_id.clone();
        inner.jar = CookieJar::parse(&account.cookie);
        inner.token = None;
        info!(account_id, cookies = inner.jar.len(), "selected account");
    }

    /// Refresh the session token for the active account.
    ///
    /// The Clerk call happens outside the lock. Rotated `Set-Cookie`
    /// values are merged into the jar and the fresh JWT stored, unless
    /// the active account changed while the call was in flight.
    pub async fn refresh(&self) -> Result<()> {
        let (epoch, session_id, cookie_header) = {
            let inner = self.inner.lock().await;
            if inner.account_id.is_none() {
                return Err(Error::RefreshFailed("no account selected".into()));
            }
            (
                inner.epoch,
                inner.session_id.clone(),
                inner.jar.header_value(),
            )
        };

        let session = refresh_session_token(
            &self.client,
            &self.clerk_url,
            &session_id,
            &cookie_header,
            self.timeout,
        )
        .await
        .map_err(|e| Error::RefreshFailed(e.to_string()))?;

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            debug!("account changed during refresh, dropping stale result");
            return Ok(());
        }
        for set_cookie in &session.set_cookies {
            inner.jar.load(set_cookie);
        }
        inner.token = Some(Secret::new(session.token));
        debug!(cookies = inner.jar.len(), "session token refreshed");
        Ok(())
    }

    /// Bearer token of the active account, once a refresh has succeeded.
    pub async fn bearer_token(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.token.as_ref().map(|t| t.expose().clone())
    }

    /// Serialized cookie header for the active account.
    pub async fn cookie_header(&self) -> String {
        let inner = self.inner.lock().await;
        inner.jar.header_value()
    }

    /// Number of cookies in the active jar.
    pub async fn cookie_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.jar.len()
    }

    /// ID of the active account, if any.
    pub async fn current_account(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.account_id.clone()
    }

    /// Account ID and bearer token together, when both are present.
    pub async fn active_credentials(&self) -> Option<ActiveCredentials> {
        let inner = self.inner.lock().await;
        match (&inner.account_id, &inner.token) {
            (Some(account_id), Some(token)) => Some(ActiveCredentials {
                account_id: account_id.clone(),
                token: token.expose().clone(),
            }),
            _ => None,
        }
    }
}
