use std::time::Duration;

use reqwest::header::HeaderMap;

const MAX_BACKOFF_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bounded exponential backoff for REST reads and writes.
pub(crate) struct RetryPolicy {
    max_attempts: usize,
    base_delay_ms: u64,
}

impl RetryPolicy {
    pub(crate) fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay_ms.max(1),
        }
    }

    pub(crate) fn allows_another(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    /// `attempt` is 1-based. A `Retry-After` hint wins unless shorter than the base delay.
    pub(crate) fn delay_for(&self, attempt: usize, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.max(Duration::from_millis(self.base_delay_ms));
        }
        let shift = attempt.saturating_sub(1).min(10) as u32;
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(1_u64 << shift)
            .min(MAX_BACKOFF_MS);
        Duration::from_millis(delay_ms)
    }
}

pub(crate) fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Rate limiting and server-side failures are transient; other statuses are final.
pub(crate) fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn is_transient_transport(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

pub(crate) fn clip_error_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
