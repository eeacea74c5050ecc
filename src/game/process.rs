//! Timing primitives. Every timed behavior in the game is built from these two.
//!
//! Inputs and outputs are milliseconds. Neither function touches game state.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleAdvance {
    pub next_progress: f64,
    /// Full cycles completed during this advance.
    pub cycles: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CountdownAdvance {
    pub next_remaining: f64,
    /// True only on the advance that crosses zero.
    pub completed: bool,
}

/// Repeating cycle with carryover: `0 <= next_progress < cycle`.
pub fn advance_cycle(progress: f64, elapsed: f64, cycle: f64) -> CycleAdvance {
    if cycle <= 0.0 || !cycle.is_finite() {
        return CycleAdvance {
            next_progress: 0.0,
            cycles: 0,
        };
    }
    let total = progress.max(0.0) + elapsed.max(0.0);
    let cycles = (total / cycle).floor();
    let mut next_progress = total - cycles * cycle;
    // Guard the floating edge where the remainder rounds up to a full cycle.
    if next_progress >= cycle {
        next_progress -= cycle;
        return CycleAdvance {
            next_progress: next_progress.max(0.0),
            cycles: cycles as u64 + 1,
        };
    }
    CycleAdvance {
        next_progress: next_progress.max(0.0),
        cycles: cycles as u64,
    }
}

/// One-shot countdown clamped at zero.
pub fn advance_countdown(remaining: f64, elapsed: f64) -> CountdownAdvance {
    let next_remaining = (remaining - elapsed.max(0.0)).max(0.0);
    CountdownAdvance {
        next_remaining,
        completed: remaining > 0.0 && next_remaining <= 0.0,
    }
}

// ── Render-time projections (pure) ────────────────────────────

/// Fraction of the current cycle done, projecting `extra` ms past the stored
/// progress.
pub fn cycle_fraction(progress: f64, extra: f64, cycle: f64) -> f64 {
    if cycle <= 0.0 {
        return 0.0;
    }
    advance_cycle(progress, extra, cycle).next_progress / cycle
}

/// Fraction of a countdown done (0 idle, approaching 1 near completion).
pub fn countdown_fraction(remaining: f64, extra: f64, duration: f64) -> f64 {
    if remaining <= 0.0 || duration <= 0.0 {
        return 0.0;
    }
    let left = advance_countdown(remaining, extra).next_remaining;
    (1.0 - left / duration).clamp(0.0, 1.0)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_cycle_progress_in_range(
            p in 0.0f64..100_000.0,
            e in 0.0f64..10_000_000.0,
            c in 1.0f64..100_000.0,
        ) {
            let r = advance_cycle(p, e, c);
            prop_assert!(r.next_progress >= 0.0);
            prop_assert!(r.next_progress < c, "{} >= {}", r.next_progress, c);
        }

        #[test]
        fn prop_cycle_count_matches_floor(
            p in 0u32..100_000,
            e in 0u32..10_000_000,
            c in 1u32..100_000,
        ) {
            let r = advance_cycle(p as f64, e as f64, c as f64);
            prop_assert_eq!(r.cycles, ((p as u64 + e as u64) / c as u64));
        }

        #[test]
        fn prop_countdown_fires_exactly_once(
            remaining in 1.0f64..50_000.0,
            step in 1.0f64..5_000.0,
        ) {
            let mut left = remaining;
            let mut fired = 0;
            for _ in 0..((remaining / step).ceil() as usize + 5) {
                let r = advance_countdown(left, step);
                if r.completed {
                    fired += 1;
                }
                left = r.next_remaining;
            }
            prop_assert_eq!(fired, 1);
            prop_assert_eq!(left, 0.0);
        }
    }
}
