//! # Circuit Breaker Module
//!
//! Fail-fast guard for the remote capabilities. When a capability keeps
//! failing, further calls are rejected locally for a while instead of each
//! user waiting out another timeout.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker for capability calls
///
/// # State Machine
///
/// - **Closed**: normal operation, requests pass through
/// - **Open**: failure threshold reached, requests fail fast
/// - **Half-Open**: reset window elapsed, the next request is let through
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: consecutive failures before opening
/// - `circuit_breaker_reset_secs`: time before a request is let through again
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use recipe_bot::config::RecoveryConfig;
    /// use recipe_bot::circuit_breaker::CircuitBreaker;
    ///
    /// let circuit_breaker = CircuitBreaker::new(RecoveryConfig::default());
    /// assert!(!circuit_breaker.is_open());
    /// ```
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    // The state is two plain counters, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if the circuit is open (blocking requests)
    ///
    /// Once the reset window has elapsed the breaker moves to half-open: this
    /// returns `false` and the failure count is kept, so a single further
    /// failure re-opens it.
    pub fn is_open(&self) -> bool {
        let state = self.lock();
        if state.failure_count < self.config.circuit_breaker_threshold {
            return false;
        }
        match state.last_failure {
            Some(last) => {
                last.elapsed() < Duration::from_secs(self.config.circuit_breaker_reset_secs)
            }
            None => false,
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure = Some(Instant::now());
    }

    /// Record a successful call, closing the circuit.
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.failure_count = 0;
        state.last_failure = None;
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }
}
