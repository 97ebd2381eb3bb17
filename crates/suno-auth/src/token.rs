//! Clerk session token refresh
//!
//! Suno's web app authenticates against the studio API with a short-lived
//! JWT minted by Clerk. The JWT is obtained by POSTing to the Clerk token
//! endpoint with the account's session cookies; Clerk answers with the JWT
//! and rotates the `__client` cookie via `Set-Cookie`. Both outputs matter:
//! the caller must merge the rotated cookies back into its jar or the next
//! refresh will present a stale client cookie and fail.

use std::time::Duration;

use reqwest::header::{COOKIE, HeaderValue, SET_COOKIE};
use serde::Deserialize;

use crate::constants::{CLERK_JS_VERSION, common_headers};
use crate::error::{Error, Result};

/// Body of a successful Clerk token response. Only the JWT is consumed;
/// the rest of the envelope (client object, session metadata) is ignored.
#[derive(Debug, Deserialize)]
struct TokenBody {
    jwt: Option<String>,
}

/// Result of a session token refresh: the fresh JWT plus any `Set-Cookie`
/// values the endpoint returned.
#[derive(Debug)]
pub struct SessionToken {
    pub token: String,
    pub set_cookies: Vec<String>,
}

/// Refresh the session JWT for one Clerk session.
///
/// Called at account selection time and then every few seconds by the
/// background refresh task. `cookie_header` is the serialized jar for the
/// account (`k1=v1;k2=v2`).
pub async fn refresh_session_token(
    client: &reqwest::Client,
    clerk_url: &str,
    session_id: &str,
    cookie_header: &str,
    timeout: Duration,
) -> Result<SessionToken> {
    let url = format!(
        "{}/v1/client/sessions/{}/tokens?_clerk_js_version={}",
        clerk_url.trim_end_matches('/'),
        session_id,
        CLERK_JS_VERSION
    );

    let mut headers = common_headers();
    let cookie_value = HeaderValue::from_str(cookie_header)
        .map_err(|e| Error::TokenRefresh(format!("cookie header not sendable: {e}")))?;
    headers.insert(COOKIE, cookie_value);

    let response = client
        .post(&url)
        .headers(headers)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    // Set-Cookie must be captured before the body consumes the response
    let set_cookies: Vec<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenRefresh(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let body = response
        .json::<TokenBody>()
        .await
        .map_err(|e| Error::TokenRefresh(format!("invalid token response: {e}")))?;

    let Some(token) = body.jwt else {
        return Err(Error::TokenRefresh(String::from(
            "token response missing jwt field",
        )));
    };

    Ok(SessionToken { token, set_cookies })
}
