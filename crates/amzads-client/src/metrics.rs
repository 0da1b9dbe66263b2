//! Client metrics collection.
//!
//! Standardized metrics for monitoring API traffic:
//! - Request counters by operation and outcome
//! - Latency histograms
//! - Retry counters by reason
//! - Token refresh outcomes

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total API calls by operation and final outcome.
    pub const REQUESTS_TOTAL: &str = "amazon_ads_requests_total";

    /// Total retry attempts by operation and reason.
    pub const RETRIES_TOTAL: &str = "amazon_ads_retries_total";

    /// End-to-end call latency in seconds by operation, retries included.
    pub const LATENCY_SECONDS: &str = "amazon_ads_latency_seconds";

    /// Token refreshes by outcome (`success`, `transient_failure`, `fatal_failure`).
    pub const TOKEN_REFRESHES_TOTAL: &str = "amazon_ads_token_refreshes_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed call. `outcome` is the HTTP status or an
/// error kind label.
pub fn record_request(operation: &str, outcome: &str, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str, reason: &'static str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a token refresh outcome.
pub fn record_token_refresh(outcome: &'static str) {
    counter!(names::TOKEN_REFRESHES_TOTAL, "outcome" => outcome).increment(1);
}

// =============================================================================
// Tests
// =============================================================================
