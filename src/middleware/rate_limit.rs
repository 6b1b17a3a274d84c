//! Rate limiting
//!
//! Fixed-window counters keyed by client IP. One window is shared by all
//! routes; the threshold depends on the class of the route being hit. State is
//! local to the process: several instances each count on their own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use parking_lot::Mutex;

use crate::config::RateLimitConfig;

/// Bucket shared by every client without an identifiable address
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Route classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Ordinary API traffic
    General,
    /// Routes that spend paid AI calls; stricter limit, identity required
    Ai,
}

/// Result of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the window resets, set when refused
    pub retry_after: Option<Duration>,
}

/// Counter for one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Requests seen in this window
    pub count: u32,
    /// When the window expires
    pub reset_at: Instant,
}

/// Drop every window that has expired at `now`; returns how many were removed
pub fn sweep(windows: &mut HashMap<String, Window>, now: Instant) -> usize {
    let before = windows.len();
    windows.retain(|_, w| now <= w.reset_at);
    before - windows.len()
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then [`UNKNOWN_CLIENT`]
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    header("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header("x-real-ip").filter(|ip| !ip.is_empty()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Per-IP fixed-window rate limiter
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
    requests: AtomicU64,
}

impl RateLimiter {
    /// Empty limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
            requests: AtomicU64::new(0),
        }
    }

    /// Classify a request path
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.config.ai_routes.iter().any(|route| path.starts_with(route.as_str())) {
            RouteClass::Ai
        } else {
            RouteClass::General
        }
    }

    fn limit(&self, class: RouteClass) -> u32 {
        match class {
            RouteClass::General => self.config.max_general,
            RouteClass::Ai => self.config.max_ai,
        }
    }

    /// Count one request from `ip`
    pub fn check(&self, ip: &str, class: RouteClass) -> RateLimitOutcome {
        self.check_at(ip, class, Instant::now())
    }

    /// [`RateLimiter::check`] against an explicit clock
    pub fn check_at(&self, ip: &str, class: RouteClass, now: Instant) -> RateLimitOutcome {
        let limit = self.limit(class);
        let mut windows = self.windows.lock();

        let seen = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        if self.config.sweep_every > 0 && seen % self.config.sweep_every == 0 {
            let removed = sweep(&mut windows, now);
            if removed > 0 {
                tracing::debug!(removed, "expired rate limit windows swept");
            }
        }

        let window = windows
            .entry(ip.to_string())
            .and_modify(|w| {
                if now > w.reset_at {
                    *w = Window {
                        count: 0,
                        reset_at: now + self.config.window(),
                    };
                }
            })
            .or_insert(Window {
                count: 0,
                reset_at: now + self.config.window(),
            });
        window.count = window.count.saturating_add(1);

        if window.count > limit {
            RateLimitOutcome {
                allowed: false,
                remaining: 0,
                retry_after: Some(window.reset_at.saturating_duration_since(now)),
            }
        } else {
            RateLimitOutcome {
                allowed: true,
                remaining: limit - window.count,
                retry_after: None,
            }
        }
    }

    /// Number of clients currently tracked
    pub fn tracked(&self) -> usize {
        self.windows.lock().len()
    }

    /// Forget every client
    pub fn reset(&self) {
        self.windows.lock().clear();
        self.requests.store(0, Ordering::Relaxed);
    }
}
