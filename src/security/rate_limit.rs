//! Fixed-window rate limiting for authentication endpoints.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::store::{RateLimitEntry, RateLimitStore};

/// Result of one `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_at_ms: u64,
    },
    Denied {
        limit: u32,
        reset_at_ms: u64,
        retry_after_secs: u64,
    },
}

impl RateLimitOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitOutcome::Allowed { .. })
    }

    pub fn limit(&self) -> u32 {
        match *self {
            RateLimitOutcome::Allowed { limit, .. } | RateLimitOutcome::Denied { limit, .. } => limit,
        }
    }

    pub fn remaining(&self) -> u32 {
        match *self {
            RateLimitOutcome::Allowed { remaining, .. } => remaining,
            RateLimitOutcome::Denied { .. } => 0,
        }
    }

    /// Window end as Unix seconds, rounded up.
    pub fn reset_epoch_secs(&self) -> u64 {
        let reset_at_ms = match *self {
            RateLimitOutcome::Allowed { reset_at_ms, .. }
            | RateLimitOutcome::Denied { reset_at_ms, .. } => reset_at_ms,
        };
        reset_at_ms.div_ceil(1000)
    }

    /// `X-RateLimit-*` headers, plus `Retry-After` when denied.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("x-ratelimit-limit", self.limit().to_string()),
            ("x-ratelimit-remaining", self.remaining().to_string()),
            ("x-ratelimit-reset", self.reset_epoch_secs().to_string()),
        ];
        if let RateLimitOutcome::Denied { retry_after_secs, .. } = *self {
            headers.insert(0, ("retry-after", retry_after_secs.to_string()));
        }
        headers
    }
}

/// Fixed-window limiter over a pluggable store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
    scope: String,
    sweep_probability: f64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: Duration::from_millis(config.window_ms),
            scope: config.scope.clone(),
            sweep_probability: config.sweep_probability.clamp(0.0, 1.0),
        }
    }

    /// Store key for a client: `"<scope>:<client>"`.
    pub fn key_for(&self, client: &str) -> String {
        format!("{}:{}", self.scope, client)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Count a request from `client` against the current window.
    pub fn check(&self, client: &str) -> RateLimitOutcome {
        let now = now_ms();
        if self.sweep_probability > 0.0 && rand::thread_rng().gen_bool(self.sweep_probability) {
            self.sweep_at(now);
        }
        self.check_at(&self.key_for(client), now)
    }

    /// Core algorithm against an explicit clock, in Unix milliseconds.
    pub fn check_at(&self, key: &str, now_ms: u64) -> RateLimitOutcome {
        let max = self.max_requests;
        let window_ms = self.window.as_millis() as u64;
        let mut outcome = None;

        self.store.update(key, &mut |existing| match existing {
            Some(entry) if !entry.is_expired(now_ms) && entry.count >= max => {
                let wait_ms = entry.window_reset_at_ms.saturating_sub(now_ms);
                outcome = Some(RateLimitOutcome::Denied {
                    limit: max,
                    reset_at_ms: entry.window_reset_at_ms,
                    // A request landing exactly on the reset instant still waits a second.
                    retry_after_secs: wait_ms.div_ceil(1000).max(1),
                });
                entry
            }
            Some(entry) if !entry.is_expired(now_ms) => {
                let next = RateLimitEntry {
                    count: entry.count + 1,
                    ..entry
                };
                outcome = Some(RateLimitOutcome::Allowed {
                    limit: max,
                    remaining: max - next.count,
                    reset_at_ms: next.window_reset_at_ms,
                });
                next
            }
            _ => {
                let fresh = RateLimitEntry {
                    count: 1,
                    window_reset_at_ms: now_ms.saturating_add(window_ms),
                };
                outcome = Some(RateLimitOutcome::Allowed {
                    limit: max,
                    remaining: max.saturating_sub(1),
                    reset_at_ms: fresh.window_reset_at_ms,
                });
                fresh
            }
        });

        match outcome {
            Some(outcome) => outcome,
            // `update` always calls the closure; fail open if a store does not.
            None => RateLimitOutcome::Allowed {
                limit: max,
                remaining: max,
                reset_at_ms: now_ms.saturating_add(window_ms),
            },
        }
    }

    /// Drop expired entries.
    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let removed = self.store.sweep(now_ms);
        if removed > 0 {
            tracing::debug!(removed, remaining = self.store.len(), "Swept expired rate limit entries");
        }
        metrics::record_sweep(removed, self.store.len());
        removed
    }

    /// Periodic deterministic sweep; complements the per-request random one.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limiter.sweep_at(now_ms());
            }
        })
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
