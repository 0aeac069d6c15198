//! Retry policy for upstream calls.
//!
//! The policy itself is pure: given the retry number it says whether to retry
//! and how long to wait. Sleeping and re-issuing the call belong to the
//! gateway, which re-sends through the transport only so a retry can never be
//! diverted into the offline queue.

use std::time::Duration;

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::HttpResponse;
use core_runtime::config::{CoreConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY};

/// Linear backoff: retry `n` waits `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.max_retries, config.retry_base_delay)
    }

    /// Decide whether retry number `attempt` (1-based) may be made.
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt == 0 || attempt > self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            delay: self.base_delay.saturating_mul(attempt),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            RetryDecision::Retry { delay } => Some(*delay),
            RetryDecision::GiveUp => None,
        }
    }
}

/// Why an attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// Final HTTP status, `None` for transport failures.
    pub status: Option<u16>,
    pub message: String,
}

/// Result of a single transport attempt.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Success(HttpResponse),
    /// Transport error, timeout, 5xx, 408 or 429.
    Retryable(AttemptFailure),
    /// Any other non-2xx status; retrying will not change the answer.
    Terminal(AttemptFailure),
}

impl AttemptOutcome {
    pub fn classify(result: BridgeResult<HttpResponse>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                return AttemptOutcome::Retryable(AttemptFailure {
                    status: None,
                    message: err.to_string(),
                })
            }
        };

        if response.is_success() {
            return AttemptOutcome::Success(response);
        }

        let failure = AttemptFailure {
            status: Some(response.status),
            message: failure_message(&response),
        };

        if response.is_server_error() || matches!(response.status, 408 | 429) {
            AttemptOutcome::Retryable(failure)
        } else {
            AttemptOutcome::Terminal(failure)
        }
    }
}

/// Prefer the server's `message` field, fall back to the status line.
fn failure_message(response: &HttpResponse) -> String {
    serde_json::from_slice::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", response.status))
}
