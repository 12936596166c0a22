//! Request execution and rate-limit retries.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode, request::Parts};
use primitives::retries::{
    DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_ATTEMPTS, RateLimitBackoff, Strategy, rate_limit_backoff,
};
use tracing::warn;

use crate::error::TransportError;

/// Something that can perform a single HTTP round trip.
///
/// Request and response bodies are fully buffered, so a returned response holds no
/// connection open.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Perform `request` once.
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
}

#[async_trait]
impl HttpExecutor for reqwest::Client {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let request = reqwest::Request::try_from(request).map_err(TransportError::new)?;
        let response = reqwest::Client::execute(self, request).await.map_err(TransportError::new)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(TransportError::new)?;

        let mut out = Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// Wraps an [`HttpExecutor`] and retries `429 Too Many Requests` responses with
/// exponential backoff.
///
/// Transport failures and every other status are returned on the attempt that produced
/// them. When all attempts are rate-limited the last `429` response is returned, not an
/// error.
#[derive(Debug, Clone)]
pub struct RetryingTransport<E, S = RateLimitBackoff> {
    inner: E,
    max_attempts: u32,
    strategy: S,
}

impl<E: HttpExecutor> RetryingTransport<E> {
    /// Create a transport doing up to `max_attempts` attempts, waiting `2^n * unit`
    /// before the n-th retry.
    pub fn new(inner: E, max_attempts: u32, unit: std::time::Duration) -> Self {
        Self::with_strategy(inner, max_attempts, rate_limit_backoff(unit))
    }

    /// Create a transport with the default attempt count and backoff unit.
    pub fn with_defaults(inner: E) -> Self {
        Self::new(inner, DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF_UNIT)
    }
}

impl<E: HttpExecutor, S: Strategy> RetryingTransport<E, S> {
    /// Create a transport with a custom backoff schedule.
    pub fn with_strategy(inner: E, max_attempts: u32, strategy: S) -> Self {
        Self { inner, max_attempts: max_attempts.max(1), strategy }
    }

    /// Maximum number of attempts per request.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Perform `request`, retrying while it is rate-limited.
    pub async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let (parts, body) = request.into_parts();
        let retries = usize::try_from(self.max_attempts.saturating_sub(1)).unwrap_or(usize::MAX);
        let mut delays = self.strategy.clone().take(retries);
        let mut attempt: u32 = 0;

        loop {
            let response = self.inner.execute(replay(&parts, &body)).await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let Some(delay) = delays.next() else {
                warn!(
                    method = %parts.method,
                    uri = %parts.uri,
                    attempts = attempt + 1,
                    "rate limited, giving up"
                );
                return Ok(response);
            };

            warn!(
                method = %parts.method,
                uri = %parts.uri,
                attempt,
                delay_ms = delay.as_millis(),
                "rate limited, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl<T: HttpExecutor + ?Sized> HttpExecutor for std::sync::Arc<T> {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        T::execute(self, request).await
    }
}

#[async_trait]
impl<E: HttpExecutor, S: Strategy> HttpExecutor for RetryingTransport<E, S> {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        Self::execute(self, request).await
    }
}

/// Rebuild a request from its buffered parts. Extensions are not carried over.
fn replay(parts: &Parts, body: &Bytes) -> Request<Bytes> {
    let mut request = Request::new(body.clone());
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = parts.uri.clone();
    *request.version_mut() = parts.version;
    *request.headers_mut() = parts.headers.clone();
    request
}
