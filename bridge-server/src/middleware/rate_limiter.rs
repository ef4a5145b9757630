// bridge-server/src/middleware/rate_limiter.rs
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Instant, Duration};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{header, StatusCode},
    Error, ResponseError,
    HttpResponse
};
use dashmap::DashMap;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::json;
use std::fmt;

const RATE_LIMIT_WINDOW_SECONDS: u64 = 60;
// Idle clients are swept from the store once every this many checks
const SWEEP_INTERVAL: usize = 1024;

#[derive(Debug)]
struct RateLimitExceeded;

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .append_header((header::RETRY_AFTER, RATE_LIMIT_WINDOW_SECONDS.to_string()))
            .json(json!({ "error": "Rate limit exceeded. Please try again later." }))
    }
}

/// Sliding-window limit per client IP on selected path prefixes.
///
/// Guards the unauthenticated userId lookup against enumeration. Clients are
/// keyed on the socket peer address; `X-Forwarded-For` and `Forwarded` are
/// only honored once `trust_forwarded_for` is set for a deployment behind a
/// proxy that overwrites them.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    trust_forwarded_for: bool,
    store: Arc<DashMap<String, Vec<Instant>>>,
    checks: Arc<AtomicUsize>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_requests: usize) -> Self {
        Self {
            paths,
            max_requests,
            window: Duration::from_secs(RATE_LIMIT_WINDOW_SECONDS),
            trust_forwarded_for: false,
            store: Arc::new(DashMap::new()),
            checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    fn applies_to(&self, path: &str) -> bool {
        self.paths.iter().any(|p| path.starts_with(p))
    }

    fn client_key(&self, req: &ServiceRequest) -> String {
        if self.trust_forwarded_for {
            if let Some(ip) = req.connection_info().realip_remote_addr() {
                return ip.to_string();
            }
        }
        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn is_rate_limited(&self, ip: &str) -> bool {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep();
        }

        let now = Instant::now();
        let mut hits = self.store.entry(ip.to_string()).or_default();
        hits.retain(|time| now.duration_since(*time) < self.window);

        if hits.len() >= self.max_requests {
            true
        } else {
            hits.push(now);
            false
        }
    }

    /// Drop clients with no hits left in the window
    fn sweep(&self) {
        let now = Instant::now();
        self.store.retain(|_, hits| {
            hits.retain(|time| now.duration_since(*time) < self.window);
            !hits.is_empty()
        });
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.limiter.applies_to(req.path()) {
            let ip = self.limiter.client_key(&req);

            if self.limiter.is_rate_limited(&ip) {
                tracing::warn!("Rate limit exceeded for IP: {} on {}", ip, req.path());
                return Box::pin(async { Err(RateLimitExceeded.into()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(fut)
    }
}
