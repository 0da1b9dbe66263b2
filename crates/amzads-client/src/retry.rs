//! Retry policy with exponential backoff and jitter.
//!
//! - Exponential backoff with full jitter, floored at the base delay
//! - Honors the `Retry-After` header on 429 (delay-seconds or HTTP-date)
//! - Configurable budget, base and max delays

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

// =============================================================================
// Configuration
// =============================================================================

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Additional attempts after the first one for 429, 5xx and transport
    /// failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff (doubles each retry).
    pub base_delay: Duration,
    /// Maximum computed backoff. Server `Retry-After` hints are not capped.
    pub max_delay: Duration,
    /// Longest server `Retry-After` hint worth waiting for. A larger hint
    /// fails the call immediately instead of sleeping. `None` honors any hint.
    pub max_retry_after: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            max_retry_after: None,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let max_retries: u32 = std::env::var("AMAZON_ADS_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let base_delay_ms: u64 = std::env::var("AMAZON_ADS_RETRY_BASE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BASE_DELAY_MS);

        let max_delay_ms: u64 = std::env::var("AMAZON_ADS_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_DELAY_MS);

        let max_retry_after = std::env::var("AMAZON_ADS_MAX_RETRY_AFTER_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms.max(base_delay_ms)),
            max_retry_after,
        }
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base and max backoff delays.
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay.max(base_delay);
        self
    }

    /// Give up instead of waiting on server hints longer than `cap`.
    pub fn with_max_retry_after(mut self, cap: Duration) -> Self {
        self.max_retry_after = Some(cap);
        self
    }

    /// True if a server hint is larger than the configured cap.
    pub fn exceeds_retry_after_cap(&self, retry_after: Option<Duration>) -> bool {
        match (retry_after, self.max_retry_after) {
            (Some(hint), Some(cap)) => hint > cap,
            _ => false,
        }
    }

    /// Total attempts charged to the budget, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the next attempt.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed. A
    /// server hint wins over the computed backoff.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }

        let exponent = attempt.saturating_sub(1).min(31);
        let capped = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay);

        // Full jitter: uniform in [0, capped], then floored at base_delay.
        let capped_ms = capped.as_millis() as u64;
        let jittered_ms = if capped_ms > 0 {
            rand::thread_rng().gen_range(0..=capped_ms)
        } else {
            0
        };

        Duration::from_millis(jittered_ms).max(self.base_delay.min(capped))
    }
}

// =============================================================================
// Retry-After
// =============================================================================

/// Parse a `Retry-After` value: delay-seconds (integer or fractional) or an
/// HTTP-date. Dates in the past yield a zero delay.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(secs) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Read the retry hint from response headers.
pub fn retry_after_from_headers(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after)
}

// =============================================================================
// Tests
// =============================================================================
