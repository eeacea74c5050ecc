//! Cyclic production: buildings and the shovel-driven scavengers.
//!
//! N producers are modeled as "N yields per completed cycle", not as N
//! independent phase offsets.

use rand::Rng;

use super::content::{production_info, SMELTER_COPPER_CHANCE};
use super::ledger::{add, amount, format_amount};
use super::process::advance_cycle;
use super::state::{BuildingId, GameState, Keyed, ProductionKey, ResourceId};

/// Producing units for `key`, 0 when the gate is closed.
pub fn production_units(state: &GameState, key: ProductionKey) -> u64 {
    match key {
        ProductionKey::Collector => state.building_count(BuildingId::Collector) as u64,
        ProductionKey::Lumberyard => state.building_count(BuildingId::Lumberyard) as u64,
        ProductionKey::Smelter => state.building_count(BuildingId::Smelter) as u64,
        ProductionKey::Scavenger => {
            let shovels = amount(&state.resources, ResourceId::Shovel).floor();
            if state.building_count(BuildingId::Camp) == 0 || shovels <= 0.0 {
                0
            } else {
                shovels as u64
            }
        }
    }
}

pub fn is_running(state: &GameState, key: ProductionKey) -> bool {
    state.production_running.get(&key).copied().unwrap_or(true)
}

/// Pause or resume a process. Paused progress is frozen exactly.
pub fn toggle_production(state: &mut GameState, key: ProductionKey) -> bool {
    let running = !is_running(state, key);
    state.production_running.insert(key, running);
    let name = production_info(key).name;
    if running {
        state.add_log(&format!("{} resumed.", name));
    } else {
        state.add_log(&format!("{} paused.", name));
    }
    true
}

pub(crate) fn advance_production<R: Rng + ?Sized>(
    state: &mut GameState,
    rng: &mut R,
    elapsed: f64,
) {
    for key in ProductionKey::all() {
        advance_one(state, rng, *key, elapsed);
    }
}

fn advance_one<R: Rng + ?Sized>(
    state: &mut GameState,
    rng: &mut R,
    key: ProductionKey,
    elapsed: f64,
) {
    let units = production_units(state, key);
    if units == 0 {
        state.production_progress.insert(key, 0.0);
        return;
    }
    if !is_running(state, key) {
        return;
    }

    let info = production_info(key);
    let progress = state.production_progress.get(&key).copied().unwrap_or(0.0);
    let advance = advance_cycle(progress, elapsed, info.cycle_ms);
    state.production_progress.insert(key, advance.next_progress);
    if advance.cycles == 0 {
        return;
    }

    let would_produce = advance.cycles as f64 * units as f64 * info.per_cycle;
    match info.input {
        None => {
            add(&mut state.resources, info.output, would_produce);
            state.add_log(&format!(
                "{} produced {} {}.",
                info.name,
                format_amount(would_produce),
                info.output.name()
            ));
        }
        Some(input) => {
            let stock = amount(&state.resources, input).floor().max(0.0);
            let produced = would_produce.min(stock);
            if produced <= 0.0 {
                return;
            }
            add(&mut state.resources, input, -produced);
            add(&mut state.resources, info.output, produced);

            let mut copper = 0u64;
            for _ in 0..produced as u64 {
                if rng.gen_bool(SMELTER_COPPER_CHANCE) {
                    copper += 1;
                }
            }
            if copper > 0 {
                add(&mut state.resources, ResourceId::Copper, copper as f64);
                state.add_log(&format!(
                    "{} refined {} {} into {} {} (+{} copper).",
                    info.name,
                    format_amount(produced),
                    input.name(),
                    format_amount(produced),
                    info.output.name(),
                    copper
                ));
            } else {
                state.add_log(&format!(
                    "{} refined {} {} into {} {}.",
                    info.name,
                    format_amount(produced),
                    input.name(),
                    format_amount(produced),
                    info.output.name()
                ));
            }
        }
    }
}
