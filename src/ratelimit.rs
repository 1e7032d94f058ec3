//! Per-client request quotas.
//!
//! Handlers never see the limiter: it runs as axum middleware in front of
//! them, so a rejected request performs no extraction and no completion call.
//! The counters sit behind [`RequestLimiter`] and can be replaced by another
//! backend (e.g. a shared store) without touching the router.
//!
//! [`WindowLimiter`] keeps a sliding-window log per client and quota: the
//! instants of the requests admitted within the last window. A quota of `n`
//! per window therefore admits at most `n` requests in any span of that
//! length, and a slot frees up exactly one window after it was used.
//!
//! A request is checked against every quota of its scope before it is
//! recorded in any of them, so a rejected request consumes nothing.

use crate::config::RateLimits;
use crate::error::ServiceError;
use crate::server::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Which quotas apply to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    /// Daily and hourly quotas.
    Default,
    /// Per-minute quota of the summary endpoint plus the daily and hourly ones.
    Summary,
}

impl LimitScope {
    /// Quotas of this scope, most restrictive window first.
    fn windows(self) -> &'static [Window] {
        match self {
            LimitScope::Default => &[Window::Hour, Window::Day],
            LimitScope::Summary => &[Window::Minute, Window::Hour, Window::Day],
        }
    }
}

/// A rejected check: which limit was hit and when to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitExceeded {
    /// Human-readable limit, e.g. "10 per 1 minute".
    pub limit: String,
    pub retry_after: Duration,
}

impl From<LimitExceeded> for ServiceError {
    fn from(e: LimitExceeded) -> Self {
        ServiceError::RateLimited {
            limit: e.limit,
            // Round up so clients never retry early.
            retry_after_secs: e.retry_after.as_secs() + u64::from(e.retry_after.subsec_nanos() > 0),
        }
    }
}

/// Counting service keyed by client address.
pub trait RequestLimiter: Send + Sync {
    /// Record one request from `client` under `scope`, or reject it.
    fn check(&self, client: IpAddr, scope: LimitScope) -> Result<(), LimitExceeded>;

    /// Drop state for clients with no request inside any window.
    fn prune(&self) {}
}

// ── Quotas ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Minute,
    Hour,
    Day,
}

impl Window {
    const ALL: [Window; 3] = [Window::Minute, Window::Hour, Window::Day];

    fn index(self) -> usize {
        self as usize
    }

    fn length(self) -> Duration {
        match self {
            Window::Minute => MINUTE,
            Window::Hour => HOUR,
            Window::Day => DAY,
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Window::Minute => "minute",
            Window::Hour => "hour",
            Window::Day => "day",
        }
    }
}

/// Admission log of one client, one queue per [`Window`].
#[derive(Debug, Default)]
struct ClientLog {
    admitted: [VecDeque<Instant>; 3],
}

impl ClientLog {
    /// Forget admissions that left their window as of `now`.
    fn expire(&mut self, now: Instant) {
        for window in Window::ALL {
            let log = &mut self.admitted[window.index()];
            while log
                .front()
                .is_some_and(|t| now.saturating_duration_since(*t) >= window.length())
            {
                log.pop_front();
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.admitted.iter().all(VecDeque::is_empty)
    }
}

/// In-memory [`RequestLimiter`] with sliding-window logs.
pub struct WindowLimiter {
    /// Maximum admissions per window, indexed by [`Window::index`].
    max: [u32; 3],
    clients: Mutex<HashMap<IpAddr, ClientLog>>,
}

impl WindowLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            max: [limits.summary_per_minute, limits.per_hour, limits.per_day],
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// [`RequestLimiter::check`] as of `now`.
    pub fn check_at(
        &self,
        client: IpAddr,
        scope: LimitScope,
        now: Instant,
    ) -> Result<(), LimitExceeded> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let log = clients.entry(client).or_default();
        log.expire(now);

        for &window in scope.windows() {
            let max = self.max[window.index()];
            let admitted = &log.admitted[window.index()];
            if admitted.len() >= max as usize {
                let age = admitted
                    .front()
                    .map_or(Duration::ZERO, |oldest| now.saturating_duration_since(*oldest));
                let retry_after = window.length().saturating_sub(age);
                return Err(LimitExceeded {
                    limit: format!("{max} per 1 {}", window.unit()),
                    retry_after,
                });
            }
        }

        for &window in scope.windows() {
            log.admitted[window.index()].push_back(now);
        }
        Ok(())
    }

    /// [`RequestLimiter::prune`] as of `now`.
    pub fn prune_at(&self, now: Instant) {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        clients.retain(|_, log| {
            log.expire(now);
            !log.is_empty()
        });
        clients.shrink_to_fit();
        debug!("Rate limiter pruned: {} tracked clients", clients.len());
    }

    /// Number of clients with state.
    pub fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RequestLimiter for WindowLimiter {
    fn check(&self, client: IpAddr, scope: LimitScope) -> Result<(), LimitExceeded> {
        self.check_at(client, scope, Instant::now())
    }

    fn prune(&self) {
        self.prune_at(Instant::now());
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Middleware applying the daily and hourly quotas.
pub async fn default_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    state.limiter.check(addr.ip(), LimitScope::Default)?;
    Ok(next.run(request).await)
}

/// Middleware applying every quota of the summary endpoint.
pub async fn summary_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    state.limiter.check(addr.ip(), LimitScope::Summary)?;
    Ok(next.run(request).await)
}

/// Periodically prune idle clients from `limiter`.
pub async fn prune_loop(limiter: Arc<dyn RequestLimiter>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;
    loop {
        interval.tick().await;
        limiter.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn limits(per_day: u32, per_hour: u32, summary_per_minute: u32) -> RateLimits {
        RateLimits {
            per_day,
            per_hour,
            summary_per_minute,
        }
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn summary_quota_rejects_excess() {
        let limiter = WindowLimiter::new(limits(100, 30, 3));
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_ok());
        }
        let err = limiter
            .check_at(ip(1), LimitScope::Summary, t0 + secs(20.0))
            .unwrap_err();
        assert_eq!(err.limit, "3 per 1 minute");
        assert_eq!(err.retry_after, secs(40.0));
    }

    #[test]
    fn no_window_admits_more_than_quota() {
        let limiter = WindowLimiter::new(limits(1000, 1000, 60));
        let t0 = Instant::now();
        for _ in 0..60 {
            assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_ok());
        }

        // One even-spacing period later, nothing has left the window yet.
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0 + secs(1.0)).is_err());
        for _ in 0..10 {
            assert!(limiter.check_at(ip(1), LimitScope::Summary, t0 + secs(3.1)).is_err());
        }
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0 + secs(59.9)).is_err());

        // The whole burst expires together, one window after it was admitted.
        let t1 = t0 + MINUTE;
        for _ in 0..60 {
            assert!(limiter.check_at(ip(1), LimitScope::Summary, t1).is_ok());
        }
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t1).is_err());
    }

    #[test]
    fn spread_requests_never_exceed_quota_in_sliding_window() {
        let limiter = WindowLimiter::new(limits(1000, 1000, 10));
        let t0 = Instant::now();
        let mut admitted = Vec::new();
        for step in 0..600 {
            let now = t0 + Duration::from_millis(step * 500);
            if limiter.check_at(ip(1), LimitScope::Summary, now).is_ok() {
                admitted.push(now);
            }
        }
        for (i, start) in admitted.iter().enumerate() {
            let in_window = admitted[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < MINUTE)
                .count();
            assert!(in_window <= 10, "{in_window} admitted within one minute");
        }
    }

    #[test]
    fn quotas_are_per_client() {
        let limiter = WindowLimiter::new(limits(100, 30, 1));
        let t0 = Instant::now();
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_ok());
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_err());
        assert!(limiter.check_at(ip(2), LimitScope::Summary, t0).is_ok());
    }

    #[test]
    fn hourly_quota_applies_to_default_scope() {
        let limiter = WindowLimiter::new(limits(100, 2, 10));
        let t0 = Instant::now();
        assert!(limiter.check_at(ip(1), LimitScope::Default, t0).is_ok());
        assert!(limiter.check_at(ip(1), LimitScope::Default, t0).is_ok());
        let err = limiter.check_at(ip(1), LimitScope::Default, t0).unwrap_err();
        assert_eq!(err.limit, "2 per 1 hour");
        assert!(limiter.check_at(ip(1), LimitScope::Default, t0 + HOUR).is_ok());
    }

    #[test]
    fn daily_quota_applies_to_default_scope() {
        let limiter = WindowLimiter::new(limits(1, 30, 10));
        let t0 = Instant::now();
        assert!(limiter.check_at(ip(1), LimitScope::Default, t0).is_ok());
        let err = limiter
            .check_at(ip(1), LimitScope::Default, t0 + HOUR)
            .unwrap_err();
        assert_eq!(err.limit, "1 per 1 day");
    }

    #[test]
    fn summary_scope_counts_toward_global_quotas() {
        let limiter = WindowLimiter::new(limits(100, 2, 10));
        let t0 = Instant::now();
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_ok());
        assert!(limiter.check_at(ip(1), LimitScope::Default, t0).is_ok());
        let err = limiter.check_at(ip(1), LimitScope::Summary, t0).unwrap_err();
        assert_eq!(err.limit, "2 per 1 hour");
    }

    #[test]
    fn rejected_request_consumes_no_quota() {
        let limiter = WindowLimiter::new(limits(100, 2, 1));
        let t0 = Instant::now();
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_ok());
        // Rejected by the minute quota; must not take an hourly slot.
        for _ in 0..5 {
            assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_err());
        }
        assert!(limiter.check_at(ip(1), LimitScope::Default, t0).is_ok());
        assert!(limiter.check_at(ip(1), LimitScope::Default, t0).is_err());
    }

    #[test]
    fn daily_rejection_does_not_take_hourly_slot() {
        let limiter = WindowLimiter::new(limits(1, 5, 10));
        let t0 = Instant::now();
        assert!(limiter.check_at(ip(1), LimitScope::Default, t0).is_ok());
        for _ in 0..10 {
            assert!(limiter.check_at(ip(1), LimitScope::Default, t0).is_err());
        }
        let clients = limiter.clients.lock().unwrap();
        assert_eq!(clients[&ip(1)].admitted[Window::Hour.index()].len(), 1);
    }

    #[test]
    fn retry_after_rounds_up() {
        let e: ServiceError = LimitExceeded {
            limit: "10 per 1 minute".into(),
            retry_after: Duration::from_millis(5_200),
        }
        .into();
        assert!(matches!(e, ServiceError::RateLimited { retry_after_secs: 6, .. }));
    }

    #[test]
    fn prune_drops_idle_clients_only() {
        let limiter = WindowLimiter::new(limits(100, 30, 1));
        let t0 = Instant::now();
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_ok());
        assert!(limiter.check_at(ip(2), LimitScope::Summary, t0 + HOUR).is_ok());

        limiter.prune_at(t0 + DAY);
        assert_eq!(limiter.tracked_clients(), 1);

        limiter.prune_at(t0 + HOUR + DAY);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn prune_keeps_active_clients_limited() {
        let limiter = WindowLimiter::new(limits(100, 30, 1));
        let t0 = Instant::now();
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0).is_ok());
        limiter.prune_at(t0 + secs(1.0));
        assert!(limiter.check_at(ip(1), LimitScope::Summary, t0 + secs(1.0)).is_err());
    }
}
