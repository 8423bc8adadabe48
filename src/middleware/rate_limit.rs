//! Rate limiting middleware
//!
//! This module provides per-member rate limiting to prevent abuse and
//! ensure fair usage of the API. Requests are tracked in a sliding window
//! with a small burst allowance on top of the steady limit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::settings::RateLimitConfig;
use crate::middleware::auth::AuthMember;
use crate::utils::errors::{Result, SkiAmiError};

/// Rate limit entry tracking one member's requests
#[derive(Debug, Clone)]
struct RateLimitEntry {
    requests: Vec<Instant>,
    burst_used: u32,
    last_reset: Instant,
}

impl RateLimitEntry {
    fn new() -> Self {
        Self {
            requests: Vec::new(),
            burst_used: 0,
            last_reset: Instant::now(),
        }
    }

    /// Drop requests that fell out of the window
    fn cleanup(&mut self, window_duration: Duration) {
        let cutoff = Instant::now() - window_duration;
        self.requests.retain(|&time| time > cutoff);

        if self.last_reset.elapsed() > window_duration {
            self.burst_used = 0;
            self.last_reset = Instant::now();
        }
    }

    fn is_allowed(&mut self, max_requests: u32, window: Duration, burst_allowance: u32) -> bool {
        self.cleanup(window);

        if (self.requests.len() as u32) < max_requests {
            return true;
        }

        if self.burst_used < burst_allowance {
            self.burst_used += 1;
            return true;
        }

        false
    }

    fn record_request(&mut self) {
        self.requests.push(Instant::now());
    }
}

/// Rate limiting middleware state, shared across requests
#[derive(Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window_duration: Duration,
    burst_allowance: u32,
    enabled: bool,
    entries: Arc<Mutex<HashMap<Uuid, RateLimitEntry>>>,
}

impl RateLimiter {
    /// Create a new RateLimiter from the rate limit configuration
    pub fn new(config: &RateLimitConfig, enabled: bool) -> Self {
        Self {
            max_requests: config.max_requests,
            window_duration: Duration::from_secs(config.window_seconds),
            burst_allowance: config.burst_allowance,
            enabled,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check whether a member may make another request, recording it if so
    pub fn check_rate_limit(&self, profile_id: Uuid) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(profile_id).or_insert_with(RateLimitEntry::new);

        if entry.is_allowed(self.max_requests, self.window_duration, self.burst_allowance) {
            entry.record_request();
            debug!(profile_id = %profile_id, "Rate limit check passed");
            Ok(())
        } else {
            warn!(profile_id = %profile_id, "Rate limit exceeded");
            Err(SkiAmiError::RateLimitExceeded)
        }
    }

    /// Drop members whose requests all fell out of the window. Called
    /// periodically so idle members do not accumulate.
    pub fn cleanup_old_entries(&self) {
        let mut entries = self.entries.lock().unwrap();
        let cutoff = Instant::now() - self.window_duration * 2;

        entries.retain(|_, entry| entry.requests.iter().any(|&time| time > cutoff));

        debug!(remaining_entries = entries.len(), "Cleaned up old rate limit entries");
    }
}

/// Middleware enforcing the per-member rate limit. Runs after the auth
/// middleware, which provides the member identity.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Result<Response> {
    let limiter = request
        .extensions()
        .get::<RateLimiter>()
        .ok_or_else(|| SkiAmiError::Config("rate limiter not configured".to_string()))?
        .clone();

    let member = request
        .extensions()
        .get::<AuthMember>()
        .ok_or_else(|| SkiAmiError::Authentication("missing authentication context".to_string()))?;

    limiter.check_rate_limit(member.profile_id)?;

    Ok(next.run(request).await)
}
