//! Player-initiated actions: gathering, crafting, construction and research,
//! plus the countdown resolution the tick engine runs for them.
//!
//! Every action returns `true` on success. A rejection leaves the state
//! untouched apart from one log line explaining why.

use rand::seq::SliceRandom;
use rand::Rng;

use super::content::{
    action_info, building_info, recipe_info, upgrade_info, weapon_info, CraftOutput,
    MAX_RESEARCH_DISCOUNT, RESEARCH_DISCOUNT_PER_WORKSHOP,
};
use super::ledger::{
    add, amount, can_afford, describe_cost, format_amount, from_table, pay_cost, scaled_cost,
    Resources,
};
use super::process::advance_countdown;
use super::state::{
    BuildingId, GameState, GatherAction, Keyed, Recipe, UpgradeId, Weapon, WeaponType,
};
use super::unlocks::check_unlocks;

// ── Gathering ─────────────────────────────────────────────────

pub fn action_remaining(state: &GameState, action: GatherAction) -> f64 {
    state.action_progress.get(&action).copied().unwrap_or(0.0)
}

/// Reward for one completed gather, including upgrades.
pub fn action_reward(state: &GameState, action: GatherAction) -> f64 {
    let info = action_info(action);
    let bonus = match info.boosted_by {
        Some(upgrade) if state.has_upgrade(upgrade) => 1.0,
        _ => 0.0,
    };
    info.base_amount + bonus
}

pub fn start_action(state: &mut GameState, action: GatherAction) -> bool {
    let info = action_info(action);
    if action_remaining(state, action) > 0.0 {
        state.add_log(&format!("{} is already in progress.", info.name));
        return false;
    }
    if let Some(missing) = info.requirement.missing(state) {
        state.add_log(&format!("{} requires {}.", info.name, missing));
        return false;
    }
    state.action_progress.insert(action, info.duration_ms);
    true
}

pub(crate) fn advance_gathering(state: &mut GameState, elapsed: f64) {
    for action in GatherAction::all() {
        let remaining = action_remaining(state, *action);
        let step = advance_countdown(remaining, elapsed);
        state.action_progress.insert(*action, step.next_remaining);
        if step.completed {
            let info = action_info(*action);
            let reward = action_reward(state, *action);
            add(&mut state.resources, info.reward, reward);
            state.add_log(&format!(
                "{}: +{} {}.",
                info.name,
                format_amount(reward),
                info.reward.name()
            ));
        }
    }
}

// ── Crafting ──────────────────────────────────────────────────

pub fn craft_remaining(state: &GameState, recipe: Recipe) -> f64 {
    state.craft_progress.get(&recipe).copied().unwrap_or(0.0)
}

/// Pays the recipe cost up front and starts the countdown.
pub fn start_craft(state: &mut GameState, recipe: Recipe) -> bool {
    let info = recipe_info(recipe);
    if craft_remaining(state, recipe) > 0.0 {
        state.add_log(&format!("{} is already being crafted.", info.name));
        return false;
    }
    if let Some(missing) = info.requirement.missing(state) {
        state.add_log(&format!("{} requires {}.", info.name, missing));
        return false;
    }
    let cost = from_table(info.cost);
    if !can_afford(&state.resources, &cost) {
        state.add_log(&format!(
            "Not enough materials for {} (needs {}).",
            info.name,
            describe_cost(&cost)
        ));
        return false;
    }
    pay_cost(&mut state.resources, &cost);
    state.craft_progress.insert(recipe, info.duration_ms);
    state.add_log(&format!("Started crafting {}.", info.name));
    check_unlocks(state);
    true
}

pub(crate) fn advance_crafting<R: Rng + ?Sized>(
    state: &mut GameState,
    rng: &mut R,
    elapsed: f64,
) {
    for recipe in Recipe::all() {
        let remaining = craft_remaining(state, *recipe);
        let step = advance_countdown(remaining, elapsed);
        state.craft_progress.insert(*recipe, step.next_remaining);
        if step.completed {
            for output in recipe_info(*recipe).outputs {
                apply_output(state, rng, output);
            }
        }
    }
}

fn apply_output<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R, output: &CraftOutput) {
    match output {
        CraftOutput::Weapon(kind) => {
            create_weapon(state, *kind);
        }
        CraftOutput::CappedResource {
            resource,
            amount: gained,
            cap,
        } => {
            let have = amount(&state.resources, *resource);
            let cap = *cap as f64;
            if have >= cap {
                state.add_log(&format!(
                    "Your {} stack is already at max ({}).",
                    resource.name(),
                    format_amount(cap)
                ));
                return;
            }
            let next = (have + *gained as f64).min(cap);
            state.resources.insert(*resource, next);
            state.add_log(&format!(
                "Crafted {} {} ({}/{}).",
                format_amount(next - have),
                resource.name(),
                format_amount(next),
                format_amount(cap)
            ));
        }
        CraftOutput::RandomModule(pool) => {
            if let Some(kind) = pool.choose(rng) {
                *state.modules.entry(*kind).or_insert(0) += 1;
                state.add_log(&format!("Crafted a {}.", kind.name()));
            }
        }
    }
}

/// Allocates a fresh id, appends the weapon and selects it if nothing was.
/// Returns `None` once the id space is exhausted.
pub fn create_weapon(state: &mut GameState, kind: WeaponType) -> Option<u32> {
    let id = state.next_weapon_id;
    let Some(next) = id.checked_add(1) else {
        state.add_log("The armory ledger is full. The weapon is scrapped.");
        return None;
    };
    state.next_weapon_id = next;
    state.weapons.push(Weapon::new(id, kind));
    if state.selected_weapon_id.is_none() {
        state.selected_weapon_id = Some(id);
    }
    state.add_log(&format!("Crafted a {} (#{}).", weapon_info(kind).name, id));
    Some(id)
}

pub fn select_weapon(state: &mut GameState, id: u32) -> bool {
    if state.exploration.is_active() {
        state.add_log("You can't swap weapons in the field.");
        return false;
    }
    match state.weapon(id) {
        Some(w) => {
            let name = weapon_info(w.kind).name;
            state.selected_weapon_id = Some(id);
            state.add_log(&format!("Selected {} (#{}).", name, id));
            true
        }
        None => {
            state.add_log(&format!("There is no weapon #{}.", id));
            false
        }
    }
}

// ── Construction ──────────────────────────────────────────────

pub fn building_cost(state: &GameState, id: BuildingId) -> Resources {
    scaled_cost(
        &from_table(building_info(id).base_cost),
        state.building_count(id),
    )
}

pub fn buy_building(state: &mut GameState, id: BuildingId) -> bool {
    let info = building_info(id);
    if let Some(missing) = info.requirement.missing(state) {
        state.add_log(&format!("{} requires {}.", info.name, missing));
        return false;
    }
    let cost = building_cost(state, id);
    if !can_afford(&state.resources, &cost) {
        state.add_log(&format!(
            "Not enough materials for a {} (needs {}).",
            info.name,
            describe_cost(&cost)
        ));
        return false;
    }
    pay_cost(&mut state.resources, &cost);
    let count = state.building_count(id) + 1;
    state.buildings.insert(id, count);
    state.add_log(&format!("Built a {} ({} total).", info.name, count));
    check_unlocks(state);
    true
}

// ── Research ──────────────────────────────────────────────────

pub fn research_discount(state: &GameState) -> f64 {
    (state.building_count(BuildingId::Workshop) as f64 * RESEARCH_DISCOUNT_PER_WORKSHOP)
        .min(MAX_RESEARCH_DISCOUNT)
}

pub fn research_cost(state: &GameState, id: UpgradeId) -> Resources {
    let factor = 1.0 - research_discount(state);
    from_table(upgrade_info(id).base_cost)
        .into_iter()
        .map(|(res, value)| (res, (value * factor).ceil()))
        .collect()
}

pub fn buy_upgrade(state: &mut GameState, id: UpgradeId) -> bool {
    let info = upgrade_info(id);
    if state.has_upgrade(id) {
        state.add_log(&format!("{} is already researched.", info.name));
        return false;
    }
    if let Some(missing) = info.requirement.missing(state) {
        state.add_log(&format!("{} requires {}.", info.name, missing));
        return false;
    }
    let cost = research_cost(state, id);
    if !can_afford(&state.resources, &cost) {
        state.add_log(&format!(
            "Not enough materials to research {} (needs {}).",
            info.name,
            describe_cost(&cost)
        ));
        return false;
    }
    pay_cost(&mut state.resources, &cost);
    state.upgrades.insert(id, true);
    state.add_log(&format!("Researched {}: {}.", info.name, info.description));
    check_unlocks(state);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{ModuleType, ResourceId, UnlockId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(9)
    }

    fn workshop_state() -> GameState {
        let mut s = GameState::new();
        s.buildings.insert(BuildingId::Workshop, 1);
        s
    }

    #[test]
    fn scavenge_is_free_and_completes() {
        let mut s = GameState::new();
        assert!(start_action(&mut s, GatherAction::Scavenge));
        assert_eq!(action_remaining(&s, GatherAction::Scavenge), 2000.0);
        advance_gathering(&mut s, 1500.0);
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 0.0);
        advance_gathering(&mut s, 600.0);
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 1.0);
        // idle afterwards, no auto-restart
        advance_gathering(&mut s, 10_000.0);
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 1.0);
    }

    #[test]
    fn action_in_flight_rejected() {
        let mut s = GameState::new();
        assert!(start_action(&mut s, GatherAction::Scavenge));
        advance_gathering(&mut s, 500.0);
        assert!(!start_action(&mut s, GatherAction::Scavenge));
        assert_eq!(action_remaining(&s, GatherAction::Scavenge), 1500.0);
        assert!(s.log.last().unwrap().contains("already in progress"));
    }

    #[test]
    fn chop_wood_needs_unlock() {
        let mut s = GameState::new();
        assert!(!start_action(&mut s, GatherAction::ChopWood));
        assert!(s.log.last().unwrap().contains("Woodcutting unlocked"));
        s.unlocks.insert(UnlockId::Woodcutting, true);
        assert!(start_action(&mut s, GatherAction::ChopWood));
    }

    #[test]
    fn gloves_boost_scavenging() {
        let mut s = GameState::new();
        s.upgrades.insert(UpgradeId::ReinforcedGloves, true);
        start_action(&mut s, GatherAction::Scavenge);
        advance_gathering(&mut s, 2000.0);
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 2.0);
    }

    #[test]
    fn craft_pays_at_start_not_completion() {
        let mut s = workshop_state();
        s.resources.insert(ResourceId::Scrap, 25.0);
        s.resources.insert(ResourceId::Iron, 5.0);
        assert!(start_craft(&mut s, Recipe::PipeGun));
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 5.0);
        assert_eq!(amount(&s.resources, ResourceId::Iron), 0.0);
        assert!(s.weapons.is_empty());

        advance_crafting(&mut s, &mut rng(), 10_000.0);
        assert_eq!(s.weapons.len(), 1);
        assert_eq!(s.weapons[0].id, 1);
        assert_eq!(s.weapons[0].slots, [None; crate::game::state::SLOT_COUNT]);
        assert_eq!(s.selected_weapon_id, Some(1));
        assert_eq!(s.next_weapon_id, 2);
    }

    #[test]
    fn craft_rejected_without_materials() {
        let mut s = workshop_state();
        let before = s.resources.clone();
        assert!(!start_craft(&mut s, Recipe::Crossbow));
        assert_eq!(s.resources, before);
        assert_eq!(craft_remaining(&s, Recipe::Crossbow), 0.0);
        assert!(s.log.last().unwrap().contains("Not enough materials"));
    }

    #[test]
    fn craft_rejected_without_workshop() {
        let mut s = GameState::new();
        s.resources.insert(ResourceId::Scrap, 100.0);
        s.resources.insert(ResourceId::Iron, 100.0);
        assert!(!start_craft(&mut s, Recipe::PipeGun));
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 100.0);
    }

    #[test]
    fn second_weapon_keeps_selection() {
        let mut s = GameState::new();
        let a = create_weapon(&mut s, WeaponType::Pipe).unwrap();
        let b = create_weapon(&mut s, WeaponType::Crossbow).unwrap();
        assert_ne!(a, b);
        assert_eq!(s.selected_weapon_id, Some(a));
    }

    #[test]
    fn weapon_ids_never_reused() {
        let mut s = GameState::new();
        let a = create_weapon(&mut s, WeaponType::Pipe).unwrap();
        s.weapons.clear();
        s.selected_weapon_id = None;
        let b = create_weapon(&mut s, WeaponType::Pipe).unwrap();
        assert!(b > a);
    }

    #[test]
    fn exhausted_weapon_ids_refuse_new_weapon() {
        let mut s = GameState::new();
        s.next_weapon_id = u32::MAX;
        assert_eq!(create_weapon(&mut s, WeaponType::Pipe), None);
        assert!(s.weapons.is_empty());
        assert_eq!(s.next_weapon_id, u32::MAX);
        assert!(s.log.last().unwrap().contains("full"));
    }

    #[test]
    fn shovel_output_respects_cap() {
        let mut s = workshop_state();
        s.resources.insert(ResourceId::Shovel, 5.0);
        s.resources.insert(ResourceId::Wood, 5.0);
        s.resources.insert(ResourceId::Iron, 2.0);
        assert!(start_craft(&mut s, Recipe::Shovel));
        advance_crafting(&mut s, &mut rng(), 8_000.0);
        assert_eq!(amount(&s.resources, ResourceId::Shovel), 5.0);
        assert!(s.log.last().unwrap().contains("already at max"));
    }

    #[test]
    fn module_kit_adds_one_module() {
        let mut s = workshop_state();
        s.resources.insert(ResourceId::Iron, 8.0);
        s.resources.insert(ResourceId::Copper, 2.0);
        assert!(start_craft(&mut s, Recipe::ModuleKit));
        advance_crafting(&mut s, &mut rng(), 15_000.0);
        let total: u32 = ModuleType::all().iter().map(|m| s.module_count(*m)).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn survival_kit_resolves_every_output() {
        let mut s = workshop_state();
        s.resources.insert(ResourceId::Wood, 10.0);
        s.resources.insert(ResourceId::Iron, 12.0);
        s.resources.insert(ResourceId::Copper, 3.0);
        assert!(start_craft(&mut s, Recipe::SurvivalKit));
        advance_crafting(&mut s, &mut rng(), 25_000.0);
        assert_eq!(amount(&s.resources, ResourceId::Shovel), 1.0);
        assert_eq!(s.module_count(ModuleType::Amplifier), 0);
        assert_eq!(
            s.module_count(ModuleType::Damage) + s.module_count(ModuleType::Cooldown),
            1
        );
    }

    #[test]
    fn building_cost_scales_with_count() {
        let mut s = GameState::new();
        s.unlocks.insert(UnlockId::Construction, true);
        s.resources.insert(ResourceId::Scrap, 100.0);
        s.resources.insert(ResourceId::Wood, 100.0);
        assert!(buy_building(&mut s, BuildingId::Collector));
        assert_eq!(s.building_count(BuildingId::Collector), 1);
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 88.0);
        // 12 × 1.15 = 13.8 → 14
        let next = building_cost(&s, BuildingId::Collector);
        assert_eq!(amount(&next, ResourceId::Scrap), 14.0);
    }

    #[test]
    fn building_gated_by_requirement() {
        let mut s = GameState::new();
        s.resources.insert(ResourceId::Scrap, 100.0);
        s.resources.insert(ResourceId::Wood, 100.0);
        s.unlocks.insert(UnlockId::Construction, true);
        // lumberyard needs a collector first
        assert!(!buy_building(&mut s, BuildingId::Lumberyard));
        assert!(s.log.last().unwrap().contains("1 Collector"));
    }

    #[test]
    fn upgrade_bought_once_with_discount() {
        let mut s = GameState::new();
        s.unlocks.insert(UnlockId::Construction, true);
        s.buildings.insert(BuildingId::Workshop, 2);
        s.resources.insert(ResourceId::Scrap, 100.0);
        s.resources.insert(ResourceId::Wood, 100.0);
        // 30 × 0.9 = 27, 10 × 0.9 = 9
        let cost = research_cost(&s, UpgradeId::ReinforcedGloves);
        assert_eq!(amount(&cost, ResourceId::Scrap), 27.0);
        assert_eq!(amount(&cost, ResourceId::Wood), 9.0);
        assert!(buy_upgrade(&mut s, UpgradeId::ReinforcedGloves));
        assert!(s.has_upgrade(UpgradeId::ReinforcedGloves));
        assert!(!buy_upgrade(&mut s, UpgradeId::ReinforcedGloves));
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 73.0);
    }

    #[test]
    fn research_discount_capped() {
        let mut s = GameState::new();
        s.buildings.insert(BuildingId::Workshop, 40);
        assert!((research_discount(&s) - MAX_RESEARCH_DISCOUNT).abs() < 1e-9);
    }
}
