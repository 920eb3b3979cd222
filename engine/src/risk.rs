//! Risk admission gate.
//!
//! Two concerns bound exposure:
//!   * a concurrent-cycle cap with reservation semantics — `allow_cycle`
//!     pre-increments so capacity can never be double-spent between
//!     admission and settlement;
//!   * a circuit breaker counting failures in a rolling window, which
//!     suppresses new admissions once saturated.
//!
//! All state lives behind one mutex; callers hold it only for the
//! duration of a counter update, never across an await point.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::warn;

const BREAKER_WINDOW: Duration = Duration::from_secs(60);
const BREAKER_MAX_FAILURES: usize = 5;

/// Rolling-window failure counter. Trips at `max_failures` failures within
/// `window`; clears as soon as the oldest failure ages out.
#[derive(Debug)]
pub struct CircuitBreaker {
    window: Duration,
    max_failures: usize,
    failures: VecDeque<Instant>,
}

impl CircuitBreaker {
    pub fn new(window: Duration, max_failures: usize) -> Self {
        Self {
            window,
            max_failures,
            failures: VecDeque::new(),
        }
    }

    pub fn record_failure(&mut self) {
        let now = Instant::now();
        self.failures.push_back(now);
        self.trim(now);
    }

    pub fn tripped(&mut self) -> bool {
        self.trim(Instant::now());
        self.failures.len() >= self.max_failures
    }

    fn trim(&mut self, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.duration_since(*oldest) > self.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BREAKER_WINDOW, BREAKER_MAX_FAILURES)
    }
}

#[derive(Debug, Default)]
struct RiskState {
    open_cycles: u32,
    breaker: CircuitBreaker,
}

pub struct RiskManager {
    max_open_cycles: u32,
    max_leg_notional: Decimal,
    state: Mutex<RiskState>,
}

impl RiskManager {
    pub fn new(max_open_cycles: u32, max_leg_notional: Decimal) -> Self {
        Self {
            max_open_cycles,
            max_leg_notional,
            state: Mutex::new(RiskState::default()),
        }
    }

    /// Admission check with reservation semantics: a `true` return has
    /// already incremented the open-cycle counter, and the caller owes
    /// exactly one `release_cycle` or `register_failure`.
    pub fn allow_cycle(&self, notional: Decimal) -> bool {
        let mut state = self.state.lock();

        if state.breaker.tripped() {
            warn!("circuit breaker open; cycle rejected");
            return false;
        }
        if state.open_cycles >= self.max_open_cycles {
            return false;
        }
        if notional > self.max_leg_notional {
            return false;
        }

        state.open_cycles += 1;
        true
    }

    /// Return a reservation, flooring at zero.
    pub fn release_cycle(&self) {
        let mut state = self.state.lock();
        state.open_cycles = state.open_cycles.saturating_sub(1);
    }

    /// Record a failed cycle: feeds the breaker window, then returns the
    /// reservation.
    pub fn register_failure(&self) {
        let mut state = self.state.lock();
        state.breaker.record_failure();
        state.open_cycles = state.open_cycles.saturating_sub(1);
    }

    pub fn open_cycles(&self) -> u32 {
        self.state.lock().open_cycles
    }
}
