//! Per-origin request quota with fixed-window counters.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    accepted: u32,
    started: Instant,
}

/// In-memory limiter keyed by origin (normally the client IP).
///
/// Independent of the target address: one origin is capped no matter which
/// addresses it asks for.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    /// `max_requests = 0` disables limiting.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                max_requests,
                window,
                windows: DashMap::new(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.max_requests > 0
    }

    /// Admit one request from `origin`, or say how long until its window resets.
    pub fn try_acquire(&self, origin: &str) -> Result<(), Duration> {
        if !self.is_enabled() {
            return Ok(());
        }

        let now = Instant::now();
        let mut entry = self
            .inner
            .windows
            .entry(origin.to_string())
            .or_insert(Window { accepted: 0, started: now });
        let window = entry.value_mut();

        if now.duration_since(window.started) >= self.inner.window {
            window.accepted = 0;
            window.started = now;
        }

        if window.accepted < self.inner.max_requests {
            window.accepted += 1;
            Ok(())
        } else {
            let elapsed = now.duration_since(window.started);
            Err(self.inner.window.saturating_sub(elapsed))
        }
    }

    /// Returns `true` if the request is admitted.
    pub fn allow(&self, origin: &str) -> bool {
        self.try_acquire(origin).is_ok()
    }

    /// Drop counters whose window has passed. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let window = self.inner.window;
        let before = self.inner.windows.len();
        self.inner
            .windows
            .retain(|_, w| w.started.elapsed() < window);
        before.saturating_sub(self.inner.windows.len())
    }

    /// Number of origins currently tracked.
    pub fn tracked_origins(&self) -> usize {
        self.inner.windows.len()
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }
}
