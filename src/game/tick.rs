//! Tick engine: resolves an elapsed interval across every timed subsystem
//! in one synchronous pass.

use rand::Rng;

use super::actions::{action_remaining, advance_crafting, advance_gathering, craft_remaining};
use super::combat::resolve_combat;
use super::content::{action_info, production_info, recipe_info};
use super::process::{countdown_fraction, cycle_fraction};
use super::production::{advance_production, is_running, production_units};
use super::state::{GameState, GatherAction, ProductionKey, Recipe};
use super::unlocks::check_unlocks;

/// Offline catch-up is capped at one day; anything beyond is dropped.
pub const MAX_CATCH_UP_MS: f64 = 86_400_000.0;

/// Advance the whole simulation by `elapsed_ms`.
///
/// Order is fixed: production, crafting, gathering, combat, unlocks.
/// Non-positive elapsed time is a no-op.
pub fn advance<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R, elapsed_ms: f64) {
    if !(elapsed_ms > 0.0) {
        return;
    }
    let elapsed = if elapsed_ms > MAX_CATCH_UP_MS {
        log::debug!(
            "catch-up of {} ms clamped to {} ms",
            elapsed_ms,
            MAX_CATCH_UP_MS
        );
        MAX_CATCH_UP_MS
    } else {
        elapsed_ms
    };

    advance_production(state, rng, elapsed);
    advance_crafting(state, rng, elapsed);
    advance_gathering(state, elapsed);
    resolve_combat(state, rng, elapsed);
    check_unlocks(state);
}

/// Advance from `last_update` to `now` (wall-clock ms).
///
/// A state that has never ticked only gets stamped, so a fresh game does
/// not replay time since the epoch.
pub fn tick<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R, now: u64) {
    if state.last_update == 0 {
        state.last_update = now;
        return;
    }
    let elapsed = now.saturating_sub(state.last_update);
    advance(state, rng, elapsed as f64);
    state.last_update = now;
}

// ── Smoothed projections ──────────────────────────────────────

fn extra_since_update(state: &GameState, now: u64) -> f64 {
    if state.last_update == 0 {
        return 0.0;
    }
    (now.saturating_sub(state.last_update) as f64).min(MAX_CATCH_UP_MS)
}

/// Fraction of the current production cycle as it would read at `now`.
pub fn smoothed_production(state: &GameState, key: ProductionKey, now: u64) -> f64 {
    let progress = state.production_progress.get(&key).copied().unwrap_or(0.0);
    let cycle = production_info(key).cycle_ms;
    if production_units(state, key) == 0 {
        return 0.0;
    }
    let extra = if is_running(state, key) {
        extra_since_update(state, now)
    } else {
        0.0
    };
    cycle_fraction(progress, extra, cycle)
}

pub fn smoothed_action(state: &GameState, action: GatherAction, now: u64) -> f64 {
    countdown_fraction(
        action_remaining(state, action),
        extra_since_update(state, now),
        action_info(action).duration_ms,
    )
}

pub fn smoothed_craft(state: &GameState, recipe: Recipe, now: u64) -> f64 {
    countdown_fraction(
        craft_remaining(state, recipe),
        extra_since_update(state, now),
        recipe_info(recipe).duration_ms,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actions::start_action;
    use crate::game::ledger::amount;
    use crate::game::state::{BuildingId, ResourceId, UnlockId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(2)
    }

    fn busy_state() -> GameState {
        let mut s = GameState::new();
        s.buildings.insert(BuildingId::Collector, 2);
        s.buildings.insert(BuildingId::Smelter, 1);
        s.resources.insert(ResourceId::Scrap, 10.0);
        s.production_progress.insert(ProductionKey::Collector, 3_000.0);
        start_action(&mut s, GatherAction::Scavenge);
        s.last_update = 1_000;
        s
    }

    #[test]
    fn null_tick_is_idempotent() {
        let mut s = busy_state();
        let before = s.clone();
        advance(&mut s, &mut rng(), 0.0);
        advance(&mut s, &mut rng(), -50.0);
        advance(&mut s, &mut rng(), f64::NAN);
        assert_eq!(s, before);

        tick(&mut s, &mut rng(), 1_000);
        assert_eq!(s, before);
    }

    #[test]
    fn first_tick_only_stamps_time() {
        let mut s = GameState::new();
        s.buildings.insert(BuildingId::Collector, 1);
        tick(&mut s, &mut rng(), 1_700_000_000_000);
        assert_eq!(s.last_update, 1_700_000_000_000);
        assert_eq!(s.production_progress[&ProductionKey::Collector], 0.0);
    }

    #[test]
    fn tick_uses_wall_clock_delta() {
        let mut s = busy_state();
        tick(&mut s, &mut rng(), 11_000);
        // 3000 + 10000 → one collector cycle
        assert_eq!(s.last_update, 11_000);
        assert_eq!(s.production_progress[&ProductionKey::Collector], 3_000.0);
        assert_eq!(s.action_progress[&GatherAction::Scavenge], 0.0);
    }

    #[test]
    fn catch_up_is_clamped_to_a_day() {
        let mut s = GameState::new();
        s.buildings.insert(BuildingId::Collector, 1);
        advance(&mut s, &mut rng(), MAX_CATCH_UP_MS * 7.0);
        // one day of 10 s cycles
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 8_640.0);
    }

    #[test]
    fn unlocks_checked_after_production() {
        let mut s = GameState::new();
        s.buildings.insert(BuildingId::Collector, 5);
        advance(&mut s, &mut rng(), 10_000.0);
        assert!(s.is_unlocked(UnlockId::Woodcutting));
    }

    #[test]
    fn smoothing_does_not_mutate() {
        let s = busy_state();
        let before = s.clone();
        let p = smoothed_production(&s, ProductionKey::Collector, 6_000);
        // 3000 + 5000 of 10000
        assert!((p - 0.8).abs() < 1e-9);
        let a = smoothed_action(&s, GatherAction::Scavenge, 2_000);
        assert!((a - 0.5).abs() < 1e-9);
        assert_eq!(smoothed_craft(&s, Recipe::Rifle, 2_000), 0.0);
        assert_eq!(s, before);
    }

    #[test]
    fn paused_production_projection_holds_still() {
        let mut s = busy_state();
        s.production_running.insert(ProductionKey::Collector, false);
        let p = smoothed_production(&s, ProductionKey::Collector, 900_000);
        assert!((p - 0.3).abs() < 1e-9);
    }
}
