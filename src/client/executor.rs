//! Retrying request execution through the resolved endpoint
//!
//! Every call goes through [`EndpointResolver`] for its base URL. Server
//! errors (5xx) and network failures are retried with capped exponential
//! backoff; client errors come back untouched; aborts are never retried.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client as HttpClient, Response};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::options::{RequestOptions, normalize_headers};
use super::resolver::{EndpointResolver, join_url};
use crate::error::{AbortReason, ApiError, Result};

/// Deadline applied when the caller brings no cancellation signal
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Additional attempts made by default after the first one
pub const DEFAULT_RETRIES: u32 = 2;

/// Backoff between attempts: `base_delay * 2^attempt`, capped at `max_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    /// Delay after the zero-based `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// What bounds a call: our own deadline, or the caller's token
enum AbortGuard {
    Deadline(Instant, Duration),
    Signal(CancellationToken),
}

impl AbortGuard {
    fn for_options(options: &RequestOptions, timeout: Duration) -> Self {
        match &options.signal {
            Some(token) => AbortGuard::Signal(token.clone()),
            None => AbortGuard::Deadline(Instant::now() + timeout, timeout),
        }
    }

    fn check(&self) -> std::result::Result<(), ApiError> {
        match self {
            AbortGuard::Signal(token) if token.is_cancelled() => {
                Err(ApiError::Aborted(AbortReason::Cancelled))
            }
            AbortGuard::Deadline(deadline, timeout) if Instant::now() >= *deadline => {
                Err(ApiError::Aborted(AbortReason::Timeout(*timeout)))
            }
            _ => Ok(()),
        }
    }

    async fn run<F: Future>(&self, fut: F) -> std::result::Result<F::Output, ApiError> {
        match self {
            AbortGuard::Deadline(deadline, timeout) => tokio::time::timeout_at(*deadline, fut)
                .await
                .map_err(|_| ApiError::Aborted(AbortReason::Timeout(*timeout))),
            AbortGuard::Signal(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(ApiError::Aborted(AbortReason::Cancelled)),
                out = fut => Ok(out),
            },
        }
    }
}

/// Issues HTTP calls against the resolved endpoint
pub struct RequestExecutor {
    http: HttpClient,
    resolver: EndpointResolver,
    auth_token: Option<String>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl RequestExecutor {
    /// Create an executor sharing `resolver`'s memoized endpoint
    pub fn new(resolver: EndpointResolver, auth_token: Option<String>) -> Result<Self> {
        // No client-level timeout: bounding is per call, see `AbortGuard`
        let http = HttpClient::builder()
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            resolver,
            auth_token,
            policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Replace the backoff policy
    #[allow(dead_code)]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the deadline used for calls without a caller signal
    #[allow(dead_code)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Perform a call, retrying up to `retries` extra times on 5xx or
    /// network failure.
    ///
    /// Non-2xx responses are returned, not raised. Once retries run out the
    /// last response is returned if there was one, else the last error.
    ///
    /// Without a caller signal, the executor deadline starts once an
    /// endpoint is resolved and covers every attempt and backoff wait.
    /// Resolution is bounded by the per-probe timeout instead.
    pub async fn execute(
        &self,
        path: &str,
        options: RequestOptions,
        retries: u32,
    ) -> Result<Response> {
        let base = match &options.signal {
            Some(token) => {
                let signal = AbortGuard::Signal(token.clone());
                signal.check()?;
                signal.run(self.resolver.resolve()).await?
            }
            None => self.resolver.resolve().await,
        };
        let guard = AbortGuard::for_options(&options, self.timeout);
        let url = join_url(&base, path);
        let headers = normalize_headers(self.auth_token.as_deref(), &options.headers)?;

        let mut builder = self
            .http
            .request(options.method.clone(), &url)
            .headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = options.body {
            builder = builder.body(body);
        }
        let request = builder.build().map_err(ApiError::from)?;

        let mut last_response: Option<Response> = None;
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..=retries {
            let attempt_request = request.try_clone().ok_or_else(|| {
                ApiError::InvalidRequest("request body cannot be replayed".to_string())
            })?;

            debug!(
                "{} {} (attempt {}/{})",
                options.method,
                url,
                attempt + 1,
                retries + 1
            );

            match guard.run(self.http.execute(attempt_request)).await? {
                Ok(response) if response.status().is_server_error() => {
                    warn!("{} {} returned {}", options.method, url, response.status());
                    last_response = Some(response);
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("{} {} failed: {}", options.method, url, e);
                    last_error = Some(ApiError::from(e));
                }
            }

            if attempt < retries {
                let delay = self.policy.delay_for(attempt);
                debug!("Retrying in {:?}", delay);
                guard.run(tokio::time::sleep(delay)).await?;
            }
        }

        if let Some(response) = last_response {
            return Ok(response);
        }
        Err(last_error
            .unwrap_or_else(|| ApiError::Network("no attempt was made".to_string()))
            .into())
    }
}
