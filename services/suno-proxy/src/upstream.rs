//! Suno studio API client
//!
//! Thin typed wrapper over the studio endpoints the relay fronts. Every
//! call carries the session bearer token plus the fixed browser header
//! set, and every call has a bounded timeout. JSON request bodies are
//! sent with a text/plain content type, matching the web app's fetch
//! calls, since the studio API rejects application/json.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use suno_auth::common_headers;

use crate::error::{Error, Result};

/// Client for the studio API, shared across handlers.
#[derive(Clone)]
pub struct StudioClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

/// Subset of the billing payload the relay consumes.
#[derive(Debug, Deserialize)]
struct BillingInfo {
    total_credits_left: i64,
    period: Value,
    monthly_limit: i64,
    monthly_usage: i64,
}

/// Remaining-credits summary returned to relay clients.
#[derive(Debug, Clone, Serialize)]
pub struct CreditsSummary {
    pub credits_left: i64,
    pub period: Value,
    pub monthly_limit: i64,
    pub monthly_usage: i64,
}

impl StudioClient {
    pub fn new(client: reqwest::Client, base_url: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }

    /// Start a music generation job. The body is opaque pass-through.
    pub async fn generate(&self, token: &str, body: &Value) -> Result<Value> {
        self.send(Method::POST, token, "/api/generate/v2/", Some(body))
            .await
    }

    /// Start a lyrics generation job.
    pub async fn generate_lyrics(&self, token: &str, body: &Value) -> Result<Value> {
        self.send(Method::POST, token, "/api/generate/lyrics/", Some(body))
            .await
    }

    /// Fetch a lyrics job by ID.
    pub async fn lyrics(&self, token: &str, lyrics_id: &str) -> Result<Value> {
        self.send(
            Method::GET,
            token,
            &format!("/api/generate/lyrics/{lyrics_id}"),
            None,
        )
        .await
    }

    /// Fetch a clip's status and audio URLs by ID.
    pub async fn feed(&self, token: &str, clip_id: &str) -> Result<Value> {
        self.send(Method::GET, token, &format!("/api/feed/{clip_id}"), None)
            .await
    }

    /// Remaining credits for the account behind `token`.
    pub async fn credits(&self, token: &str) -> Result<CreditsSummary> {
        let value = self
            .send(Method::GET, token, "/api/billing/info/", None)
            .await?;
        let billing: BillingInfo = serde_json::from_value(value)
            .map_err(|e| Error::Upstream(format!("invalid billing response: {e}")))?;
        Ok(CreditsSummary {
            credits_left: billing.total_credits_left,
            period: billing.period,
            monthly_limit: billing.monthly_limit,
            monthly_usage: billing.monthly_usage,
        })
    }

    async fn send(
        &self,
        method: Method,
        token: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);

        let mut headers = common_headers();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::Upstream(format!("bearer token not sendable: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        let mut request = self
            .client
            .request(method, &url)
            .headers(headers)
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                crate::metrics::record_upstream_error("timeout");
                Error::Upstream(format!(
                    "timeout after {}s: {e}",
                    self.timeout.as_secs()
                ))
            } else {
                crate::metrics::record_upstream_error("connection");
                Error::Upstream(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            crate::metrics::record_upstream_error("status");
            return Err(Error::Upstream(format!("{status}: {body}")));
        }

        response.json::<Value>().await.map_err(|e| {
            crate::metrics::record_upstream_error("decode");
            Error::Upstream(format!("invalid upstream response: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::Router;
    use axum::body::Body;
    use axum::extract::Path;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use serde_json::json;

    use super::*;

    async fn echo(request: Request<Body>) -> axum::Json<Value> {
        let mut headers = serde_json::Map::new();
        for (name, value) in request.headers() {
            headers.insert(
                name.to_string(),
                Value::String(value.to_str().unwrap_or("").to_string()),
            );
        }
        let path = request.uri().path().to_string();
        let body_bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
            .await
            .unwrap();
        axum::Json(json!({
            "echoed_headers": headers,
            "path": path,
            "body": String::from_utf8_lossy(&body_bytes),
        }))
    }

    async fn feed_handler(Path(clip_id): Path<String>) -> axum::response::Response {
        if clip_id == "missing" {
            return (StatusCode::NOT_FOUND, axum::Json(json!({"detail": "Not found"})))
                .into_response();
        }
        axum::Json(json!({"id": clip_id, "status": "complete"})).into_response()
    }

    async fn start_studio_server() -> SocketAddr {
        let app = Router::new()
            .route("/api/generate/v2/", post(echo))
            .route("/api/generate/lyrics/", post(echo))
            .route(
                "/api/generate/lyrics/{lyrics_id}",
                get(|Path(lyrics_id): Path<String>| async move {
                    axum::Json(json!({"id": lyrics_id, "text": "la la la"}))
                }),
            )
            .route("/api/feed/{clip_id}", get(feed_handler))
            .route(
                "/api/billing/info/",
                get(|| async {
                    axum::Json(json!({
                        "total_credits_left": 40,
                        "period": "2026-08",
                        "monthly_limit": 2500,
                        "monthly_usage": 2460
                    }))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    fn test_client(addr: SocketAddr) -> StudioClient {
        StudioClient::new(
            reqwest::Client::new(),
            format!("http://{addr}"),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn generate_sends_bearer_and_browser_headers() {
        let addr = start_studio_server().await;
        let studio = test_client(addr);

        let body = json!({"prompt": "a song about rust", "mv": "chirp-v3-5"});
        let echoed = studio.generate("tok_abc", &body).await.unwrap();

        assert_eq!(echoed["path"], "/api/generate/v2/");
        assert_eq!(echoed["echoed_headers"]["authorization"], "Bearer tok_abc");
        assert_eq!(
            echoed["echoed_headers"]["content-type"],
            "text/plain;charset=UTF-8"
        );
        assert_eq!(echoed["echoed_headers"]["origin"], "https://suno.com");
        let sent: Value = serde_json::from_str(echoed["body"].as_str().unwrap()).unwrap();
        assert_eq!(sent, body);
    }

    #[tokio::test]
    async fn generate_lyrics_posts_to_lyrics_path() {
        let addr = start_studio_server().await;
        let studio = test_client(addr);

        let echoed = studio
            .generate_lyrics("tok_abc", &json!({"prompt": "rain"}))
            .await
            .unwrap();
        assert_eq!(echoed["path"], "/api/generate/lyrics/");
    }

    #[tokio::test]
    async fn lyrics_and_feed_fetch_by_id() {
        let addr = start_studio_server().await;
        let studio = test_client(addr);

        let lyrics = studio.lyrics("tok_abc", "lyr_42").await.unwrap();
        assert_eq!(lyrics["id"], "lyr_42");

        let clip = studio.feed("tok_abc", "clip_7").await.unwrap();
        assert_eq!(clip["id"], "clip_7");
        assert_eq!(clip["status"], "complete");
    }

    #[tokio::test]
    async fn credits_maps_billing_fields() {
        let addr = start_studio_server().await;
        let studio = test_client(addr);

        let credits = studio.credits("tok_abc").await.unwrap();
        assert_eq!(credits.credits_left, 40);
        assert_eq!(credits.monthly_limit, 2500);
        assert_eq!(credits.monthly_usage, 2460);
        assert_eq!(credits.period, json!("2026-08"));
    }

    #[tokio::test]
    async fn upstream_status_error_propagates() {
        let addr = start_studio_server().await;
        let studio = test_client(addr);

        let err = studio.feed("tok_abc", "missing").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_upstream_error() {
        let studio = StudioClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1".into(),
            Duration::from_secs(5),
        );

        let err = studio.credits("tok_abc").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn hung_upstream_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((sock, _)) = listener.accept().await {
                    held.push(sock);
                }
            }
        });

        let studio = StudioClient::new(
            reqwest::Client::new(),
            format!("http://{addr}"),
            Duration::from_millis(50),
        );
        let err = studio.credits("tok_abc").await.unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_tolerated() {
        let addr = start_studio_server().await;
        let studio = StudioClient::new(
            reqwest::Client::new(),
            format!("http://{addr}/"),
            Duration::from_secs(5),
        );

        let credits = studio.credits("tok_abc").await.unwrap();
        assert_eq!(credits.credits_left, 40);
    }
}
