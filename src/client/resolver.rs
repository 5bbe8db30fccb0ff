//! Backend endpoint discovery with failover
//!
//! Probes the configured candidates in order and memoizes the first healthy
//! one. Concurrent callers share a single probe sequence; when nothing
//! answers, the first candidate is used as a fallback and a warning is logged
//! once per fallback episode.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, warn};
use reqwest::Client as HttpClient;

use crate::error::{ApiError, ConfigError, Result};

/// Upper bound for a single health probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness check for a candidate endpoint
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Return true if the endpoint answered healthy within the probe bound
    async fn check(&self, endpoint: &str) -> bool;
}

/// Probes `GET {endpoint}/health`; any 2xx counts as healthy
pub struct HttpHealthProbe {
    http: HttpClient,
}

impl HttpHealthProbe {
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn check(&self, endpoint: &str) -> bool {
        let url = join_url(endpoint, "/health");
        match self.http.get(&url).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                debug!("Health probe {} -> {}", url, response.status());
                healthy
            }
            Err(e) => {
                debug!("Health probe {} failed: {}", url, e);
                false
            }
        }
    }
}

/// Join a base URL and an absolute path without doubling the slash
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

type PendingResolution = Shared<BoxFuture<'static, String>>;

#[derive(Default)]
struct ResolverState {
    resolved: Option<String>,
    in_flight: Option<PendingResolution>,
    /// Bumped by `clear()` so a probe started before the clear cannot
    /// store its result afterwards.
    generation: u64,
}

struct ResolverInner {
    candidates: Vec<String>,
    probe: Arc<dyn HealthProbe>,
    state: Mutex<ResolverState>,
    fallback_logged: AtomicBool,
    fallback_warnings: AtomicUsize,
    probe_sequences: AtomicUsize,
}

impl ResolverInner {
    fn lock_state(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn probe_candidates(&self, generation: u64) -> String {
        self.probe_sequences.fetch_add(1, Ordering::SeqCst);

        for candidate in &self.candidates {
            let healthy = tokio::time::timeout(PROBE_TIMEOUT, self.probe.check(candidate))
                .await
                .unwrap_or(false);
            if healthy {
                debug!("Resolved endpoint {}", candidate);
                self.fallback_logged.store(false, Ordering::SeqCst);
                self.settle(generation, candidate);
                return candidate.clone();
            }
        }

        // Constructor guarantees at least one candidate
        let fallback = self.candidates[0].clone();
        if !self.fallback_logged.swap(true, Ordering::SeqCst) {
            self.fallback_warnings.fetch_add(1, Ordering::SeqCst);
            warn!(
                "No endpoint passed its health check ({} tried); falling back to {}",
                self.candidates.len(),
                fallback
            );
        }
        self.settle(generation, &fallback);
        fallback
    }

    fn settle(&self, generation: u64, endpoint: &str) {
        let mut state = self.lock_state();
        if state.generation == generation {
            state.resolved = Some(endpoint.to_string());
            state.in_flight = None;
        }
    }
}

/// Resolves and memoizes the backend base URL.
///
/// Cheap to clone; clones share the memoized endpoint and in-flight probe.
#[derive(Clone)]
pub struct EndpointResolver {
    inner: Arc<ResolverInner>,
}

impl EndpointResolver {
    /// Create a resolver over an ordered, non-empty candidate list
    pub fn new(candidates: Vec<String>, probe: Arc<dyn HealthProbe>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(ConfigError::MissingEndpoints.into());
        }
        Ok(Self {
            inner: Arc::new(ResolverInner {
                candidates,
                probe,
                state: Mutex::new(ResolverState::default()),
                fallback_logged: AtomicBool::new(false),
                fallback_warnings: AtomicUsize::new(0),
                probe_sequences: AtomicUsize::new(0),
            }),
        })
    }

    /// Return the memoized endpoint, probing candidates if none is known.
    ///
    /// All callers arriving while a probe sequence runs await that same
    /// sequence.
    pub async fn resolve(&self) -> String {
        let pending = {
            let mut state = self.inner.lock_state();
            if let Some(endpoint) = &state.resolved {
                return endpoint.clone();
            }
            match &state.in_flight {
                Some(pending) => pending.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let generation = state.generation;
                    let pending = async move { inner.probe_candidates(generation).await }
                        .boxed()
                        .shared();
                    state.in_flight = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    /// Forget the memoized endpoint and re-arm the fallback warning
    pub fn clear(&self) {
        let mut state = self.inner.lock_state();
        state.resolved = None;
        state.in_flight = None;
        state.generation += 1;
        self.inner.fallback_logged.store(false, Ordering::SeqCst);
    }

    /// Candidates in probe order
    pub fn candidates(&self) -> &[String] {
        &self.inner.candidates
    }

    /// Whether the current endpoint is the unprobed fallback
    pub fn is_fallback(&self) -> bool {
        self.inner.fallback_logged.load(Ordering::SeqCst)
    }

    /// Number of probe sequences started so far
    pub fn probe_sequences(&self) -> usize {
        self.inner.probe_sequences.load(Ordering::SeqCst)
    }

    /// Number of fallback warnings emitted so far
    pub fn fallback_warnings(&self) -> usize {
        self.inner.fallback_warnings.load(Ordering::SeqCst)
    }
}
