//! Retrying, authenticated HTTP transport
//!
//! Every management API call goes through [`Transport::send`]. Responses with a
//! transient status are retried with exponential backoff; any other failure is
//! returned to the caller on the first attempt.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Statuses retried by default
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry policy for transient responses
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Statuses considered transient
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-indexed)
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether `status` should be retried
    pub fn is_transient(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }
}

/// HTTP transport bound to one base URL and one bearer credential
///
/// The credential and JSON content negotiation are installed as default
/// headers of the underlying client; there is no per-call override.
#[derive(Debug, Clone)]
pub struct Transport {
    base_url: String,
    client: Client,
    policy: RetryPolicy,
}

impl Transport {
    /// Create a transport for `base_url` authenticating with `token`
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the token cannot be used as a header value,
    /// and `RequestFailed` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: &str, policy: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ClientError::InvalidRequest("token is not a valid header value".into()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder().default_headers(headers).build()?;
        let base_url = base_url.into();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            policy,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Send a request to `path` (relative to the base URL)
    ///
    /// Returns the response once its status is a success. Transient statuses
    /// are retried up to `max_retries` times; the last one is returned as
    /// `ApiError` if they never clear.
    pub async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut retry = 0;

        loop {
            let mut request = self.client.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                debug!("{} {} -> {}", method, path, status);
                return Ok(response);
            }

            if self.policy.is_transient(status) && retry < self.policy.max_retries {
                let delay = self.policy.backoff_delay(retry);
                retry += 1;
                warn!(
                    "{} {} returned {}, retrying in {:?} ({}/{})",
                    method, path, status, delay, retry, self.policy.max_retries
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), message));
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.send::<()>(Method::GET, path, None).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.send::<()>(Method::DELETE, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::PUT, path, Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(3));
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(3));
    }

    #[test]
    fn test_transient_statuses() {
        let policy = RetryPolicy::default();
        assert!(policy.is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(policy.is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!policy.is_transient(StatusCode::NOT_FOUND));
        assert!(!policy.is_transient(StatusCode::NOT_IMPLEMENTED));
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let result = Transport::new("http://localhost", "bad\ntoken", RetryPolicy::default());
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let transport = Transport::new(server.uri(), "t0k", fast_policy(5)).unwrap();
        let response = transport.get("/items").await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let transport = Transport::new(server.uri(), "t0k", fast_policy(2)).unwrap();
        let err = transport
            .post("/items", &serde_json::json!({"name": "x"}))
            .await
            .unwrap_err();

        match err {
            ClientError::ApiError { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // first attempt plus two retries
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let transport = Transport::new(server.uri(), "t0k", fast_policy(5)).unwrap();
        let err = transport.get("/missing").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn test_sends_default_headers() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/items/1"))
            .and(header("authorization", "Bearer s3cret"))
            .and(header("content-type", "application/json"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(format!("{}/", server.uri()), "s3cret", fast_policy(0))
            .unwrap();
        transport
            .put("/items/1", &serde_json::json!({"groups": []}))
            .await
            .unwrap();
    }
}
