// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter keyed by client address.
//!
//! Each address keeps a log of accepted request times. A request is
//! accepted while fewer than `max_requests` entries fall inside the trailing
//! window. Check-and-record happens under one write lock, so concurrent
//! requests from the same address cannot both slip under the cap.

use crate::config::RateLimitConfig;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + offset
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Configured cap per window
        limit: u32,
        /// Remaining requests in current window
        remaining: u32,
        /// Time until the oldest counted request leaves the window
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Configured cap per window
        limit: u32,
        /// Time until a request would be accepted
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Thread-safe per-address rate limiter.
pub struct RateLimiter {
    /// Configuration
    config: RateLimitConfig,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Accepted request times per address, oldest first
    windows: Arc<RwLock<HashMap<IpAddr, VecDeque<Instant>>>>,
}

impl RateLimiter {
    /// Create a new rate limiter on the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a new rate limiter with an injected clock.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn window(&self) -> Duration {
        self.config.window_duration()
    }

    /// Check and, if accepted, record a request from `ip`.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        let window = self.config.window_duration();
        let limit = self.config.max_requests;

        let mut windows = self.windows.write().await;
        let now = self.clock.now();
        let log = windows.entry(ip).or_default();
        prune(log, now, window);

        if (log.len() as u64) < u64::from(limit) {
            log.push_back(now);
            let remaining = limit - log.len() as u32;
            let reset_in = log
                .front()
                .map_or(window, |oldest| window.saturating_sub(now - *oldest));
            debug!(%ip, remaining, "Request within rate limit");
            RateLimitResult::Allowed {
                limit,
                remaining,
                reset_in,
            }
        } else {
            let retry_after = log
                .front()
                .map_or(window, |oldest| window.saturating_sub(now - *oldest));
            debug!(%ip, ?retry_after, "Rate limit exceeded");
            RateLimitResult::Limited { limit, retry_after }
        }
    }

    /// Drop addresses with no requests left in the window.
    pub async fn cleanup(&self) {
        let window = self.config.window_duration();
        let mut windows = self.windows.write().await;
        let now = self.clock.now();
        windows.retain(|_, log| {
            prune(log, now, window);
            !log.is_empty()
        });
    }

    /// Number of addresses currently tracked.
    pub async fn tracked(&self) -> usize {
        self.windows.read().await.len()
    }
}

fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = log.front() {
        if now.duration_since(*oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}
