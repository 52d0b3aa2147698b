//! GPU idle gating.
//!
//! [`IdleGate`] accumulates how long the GPU has stayed at or below a
//! utilization ceiling and reports whether the worker may pull work.
//! Time is passed in explicitly so the state machine is deterministic.
//!
//! When the telemetry source is unavailable the gate runs *degraded*:
//! every check reports eligible, so hosts without the GPU driver can
//! still process jobs.

use std::time::{Duration, Instant};

/// Default utilization ceiling (percent) at or below which a sample
/// counts as idle.
pub const DEFAULT_IDLE_UTILIZATION_PERCENT: u32 = 10;

/// Default time the GPU must stay idle before a job is pulled.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(15 * 60);

/// Observable state of an [`IdleGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    /// `initialize` has not been called yet.
    Uninitialized,
    /// Initialized (or reset), and idle time is still below the threshold.
    Sampling,
    /// Last sample was idle and the accumulator reached the threshold.
    Idle,
    /// Last sample was above the ceiling.
    Busy,
}

/// Per-worker idle accumulator.
#[derive(Debug, Clone)]
pub struct IdleGate {
    idle_threshold: Duration,
    utilization_ceiling: u32,
    accumulated: Duration,
    last_sample: Option<Instant>,
    state: IdleState,
    degraded: bool,
}

impl IdleGate {
    /// Create an uninitialized gate.
    ///
    /// * `idle_threshold` - continuous idle time required before pulling.
    /// * `utilization_ceiling` - samples at or below this percent are idle.
    pub fn new(idle_threshold: Duration, utilization_ceiling: u32) -> Self {
        Self {
            idle_threshold,
            utilization_ceiling,
            accumulated: Duration::ZERO,
            last_sample: None,
            state: IdleState::Uninitialized,
            degraded: false,
        }
    }

    /// Zero the accumulator and start measuring from `now`.
    pub fn initialize(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        self.last_sample = Some(now);
        self.state = IdleState::Sampling;
    }

    /// Switch to fail-open mode: telemetry is unavailable, so the GPU is
    /// treated as permanently idle.
    pub fn degrade(&mut self) {
        self.degraded = true;
    }

    /// Whether the gate is running without telemetry.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Feed one sample taken at `now`.
    ///
    /// `utilization` is the GPU utilization percent, or `None` when the
    /// sample could not be read (counted as idle). An idle sample adds
    /// the wall-clock delta since the previous tick; a busy sample resets
    /// the accumulator to zero. Ticking an uninitialized gate initializes
    /// it at `now` first.
    pub fn tick(&mut self, now: Instant, utilization: Option<u32>) -> IdleState {
        let last = match self.last_sample {
            Some(last) => last,
            None => {
                self.initialize(now);
                now
            }
        };
        let elapsed = now.saturating_duration_since(last);
        self.last_sample = Some(now);

        let idle = self.degraded || utilization.map_or(true, |u| u <= self.utilization_ceiling);

        if idle {
            self.accumulated += elapsed;
            self.state = if self.accumulated >= self.idle_threshold {
                IdleState::Idle
            } else {
                IdleState::Sampling
            };
        } else {
            self.accumulated = Duration::ZERO;
            self.state = IdleState::Busy;
        }
        self.state
    }

    /// True iff the accumulated idle time has reached the threshold, or
    /// the gate is degraded.
    pub fn is_eligible(&self) -> bool {
        self.degraded || self.accumulated >= self.idle_threshold
    }

    /// Require a fresh idle period before the next pull.
    pub fn reset(&mut self, now: Instant) {
        self.initialize(now);
    }

    /// Idle time accumulated so far.
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Configured idle threshold.
    pub fn idle_threshold(&self) -> Duration {
        self.idle_threshold
    }

    /// Current state.
    pub fn state(&self) -> IdleState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn becomes_eligible_exactly_at_threshold() {
        let start = Instant::now();
        let mut gate = IdleGate::new(secs(900), 10);
        gate.initialize(start);
        assert_eq!(gate.state(), IdleState::Sampling);

        for tick in 1..=899 {
            gate.tick(start + secs(tick), Some(0));
            assert!(!gate.is_eligible(), "eligible too early at tick {tick}");
        }
        assert_eq!(gate.tick(start + secs(900), Some(0)), IdleState::Idle);
        assert!(gate.is_eligible());
    }

    #[test]
    fn busy_sample_resets_accumulator() {
        let start = Instant::now();
        let mut gate = IdleGate::new(secs(10), 10);
        gate.initialize(start);

        gate.tick(start + secs(5), Some(3));
        assert_eq!(gate.accumulated(), secs(5));

        assert_eq!(gate.tick(start + secs(6), Some(95)), IdleState::Busy);
        assert_eq!(gate.accumulated(), Duration::ZERO);

        gate.tick(start + secs(12), Some(0));
        assert_eq!(gate.accumulated(), secs(6));
        assert!(!gate.is_eligible());
    }

    #[test]
    fn idle_samples_below_threshold_stay_sampling() {
        let start = Instant::now();
        let mut gate = IdleGate::new(secs(10), 10);
        gate.initialize(start);

        assert_eq!(gate.tick(start + secs(4), Some(0)), IdleState::Sampling);
        assert_eq!(gate.tick(start + secs(5), Some(50)), IdleState::Busy);
        assert_eq!(gate.tick(start + secs(6), Some(0)), IdleState::Sampling);
        assert_eq!(gate.tick(start + secs(16), Some(0)), IdleState::Idle);
    }

    #[test]
    fn sample_at_ceiling_counts_as_idle() {
        let start = Instant::now();
        let mut gate = IdleGate::new(secs(1), 10);
        gate.initialize(start);
        gate.tick(start + secs(1), Some(10));
        assert!(gate.is_eligible());
    }

    #[test]
    fn unreadable_sample_counts_as_idle() {
        let start = Instant::now();
        let mut gate = IdleGate::new(secs(2), 10);
        gate.initialize(start);
        gate.tick(start + secs(2), None);
        assert!(gate.is_eligible());
    }

    #[test]
    fn reset_requires_fresh_idle_period() {
        let start = Instant::now();
        let mut gate = IdleGate::new(secs(3), 10);
        gate.initialize(start);
        gate.tick(start + secs(3), Some(0));
        assert!(gate.is_eligible());

        gate.reset(start + secs(4));
        assert!(!gate.is_eligible());
        assert_eq!(gate.state(), IdleState::Sampling);

        // The gap before the reset does not count.
        gate.tick(start + secs(5), Some(0));
        assert_eq!(gate.accumulated(), secs(1));
    }

    #[test]
    fn degraded_gate_is_always_eligible() {
        let mut gate = IdleGate::new(secs(900), 10);
        gate.degrade();
        assert!(gate.is_eligible());

        let start = Instant::now();
        gate.initialize(start);
        gate.tick(start, Some(100));
        assert!(gate.is_eligible());
    }

    #[test]
    fn first_tick_on_uninitialized_gate_adds_nothing() {
        let mut gate = IdleGate::new(secs(1), 10);
        assert_eq!(gate.state(), IdleState::Uninitialized);
        gate.tick(Instant::now(), Some(0));
        assert_eq!(gate.accumulated(), Duration::ZERO);
    }
}
