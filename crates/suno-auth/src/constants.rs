//! Suno upstream constants
//!
//! Endpoints and browser-identifying headers for the Suno studio API and
//! its Clerk authentication frontend. These values are not secrets; they
//! identify the public web client. The actual secrets (session cookies,
//! bearer tokens) are managed by the account store and session state.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};

/// Base URL of the Suno studio API (generation, feed, billing)
pub const STUDIO_API_URL: &str = "https://studio-api.suno.ai";

/// Base URL of the Clerk frontend that issues session tokens
pub const CLERK_API_URL: &str = "https://clerk.suno.com";

/// Clerk JS client version pinned by the web app. The token endpoint
/// rejects requests without a known version string.
pub const CLERK_JS_VERSION: &str = "4.72.0-snapshot.vc141245";

/// Browser user agent presented on every upstream call
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Origin/referer the web app sends; Clerk validates these
pub const SUNO_ORIGIN: &str = "https://suno.com";
pub const SUNO_REFERER: &str = "https://suno.com/";

/// The studio API expects JSON bodies declared as text/plain, matching
/// the web app's fetch calls.
pub const TEXT_PLAIN_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

/// Fixed header set sent on every call to Suno and Clerk.
pub fn common_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_CONTENT_TYPE));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(REFERER, HeaderValue::from_static(SUNO_REFERER));
    headers.insert(ORIGIN, HeaderValue::from_static(SUNO_ORIGIN));
    headers
}
