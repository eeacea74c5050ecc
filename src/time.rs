//! Wall-clock sources and a fixed-step stepper for headless runs.
//!
//! The simulation itself only ever sees millisecond timestamps. `Clock`
//! decides where they come from: the system clock in the binary, a manual
//! clock in tests. `FixedStep` turns a long span into evenly sized steps so
//! a simulated session resolves like a live one ticking every frame.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Splits a span into whole steps of `step_ms`, carrying the remainder.
pub struct FixedStep {
    step_ms: u64,
    /// Milliseconds fed in but not yet handed out as steps.
    accumulator: u64,
    pub total_steps: u64,
}

impl FixedStep {
    /// `step_ms` of 0 is treated as 1.
    pub fn new(step_ms: u64) -> Self {
        Self {
            step_ms: step_ms.max(1),
            accumulator: 0,
            total_steps: 0,
        }
    }

    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }

    /// Feed `delta_ms` of wall time; returns how many steps to run.
    pub fn feed(&mut self, delta_ms: u64) -> u64 {
        self.accumulator = self.accumulator.saturating_add(delta_ms);
        let steps = self.accumulator / self.step_ms;
        self.accumulator -= steps * self.step_ms;
        self.total_steps += steps;
        steps
    }

    /// Whatever is left over after the last whole step.
    pub fn remainder(&self) -> u64 {
        self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_on_demand() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 1_250);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn whole_steps_and_remainder() {
        let mut fs = FixedStep::new(100);
        assert_eq!(fs.feed(350), 3); // 50 ms left over
        assert_eq!(fs.remainder(), 50);
        assert_eq!(fs.feed(50), 1);
        assert_eq!(fs.total_steps, 4);
    }

    #[test]
    fn sub_step_feeds_accumulate() {
        let mut fs = FixedStep::new(100);
        for _ in 0..6 {
            assert_eq!(fs.feed(16), 0);
        }
        assert_eq!(fs.feed(16), 1); // 112 ms → 1 step, 12 left
        assert_eq!(fs.remainder(), 12);
    }

    #[test]
    fn zero_step_is_clamped() {
        let mut fs = FixedStep::new(0);
        assert_eq!(fs.step_ms(), 1);
        assert_eq!(fs.feed(5), 5);
    }
}
