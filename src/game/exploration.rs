//! Expedition state machine: loadout → moving ⇄ combat → loot → moving,
//! ending in either a return to base or death.

use rand::Rng;

use super::content::{biome_at, biome_info, enemy_info, weapon_info, DEFAULT_ENEMY};
use super::ledger::{add, format_amount, Resources};
use super::state::{
    CombatState, EnemyId, Exploration, ExplorationMode, ExplorationPhase, GameState, LootItem, Pos,
    Tab, UnlockId, UpgradeId, MAP_SIZE, PLAYER_MAX_HP,
};
use super::unlocks::check_unlocks;

/// Tiles within this squared distance of the player get revealed.
pub const REVEAL_RADIUS_SQ: i32 = 2;
pub const ENCOUNTER_CHANCE: f64 = 0.25;
/// Steps that must pass after an encounter before the next roll.
pub const ENCOUNTER_COOLDOWN_STEPS: u32 = 2;
pub const BACKPACK_CAPACITY: u32 = 20;
pub const RUCKSACK_BONUS: u32 = 10;
pub const FLEE_DURATION_MS: f64 = 3_000.0;

pub fn backpack_capacity(state: &GameState) -> u32 {
    if state.has_upgrade(UpgradeId::Rucksack) {
        BACKPACK_CAPACITY + RUCKSACK_BONUS
    } else {
        BACKPACK_CAPACITY
    }
}

fn reveal_around(exploration: &mut Exploration, center: Pos) {
    for dy in -2..=2 {
        for dx in -2..=2 {
            if dx * dx + dy * dy > REVEAL_RADIUS_SQ {
                continue;
            }
            let tile = Pos::new(center.x + dx, center.y + dy);
            if tile.in_bounds() {
                exploration.visited.insert(tile);
            }
        }
    }
}

fn merge_item(list: &mut Vec<LootItem>, item: LootItem) {
    match list.iter_mut().find(|i| i.resource == item.resource) {
        Some(existing) => existing.amount = existing.amount.saturating_add(item.amount),
        None => list.push(item),
    }
}

// ── Start ─────────────────────────────────────────────────────

pub fn start_expedition(state: &mut GameState, allow_unarmed: bool) -> bool {
    if state.exploration.is_active() {
        state.add_log("You are already out in the wastes.");
        return false;
    }
    if !state.is_unlocked(UnlockId::Expeditions) {
        state.add_log("You aren't ready to leave the scrapyard yet.");
        return false;
    }
    let weapon = state
        .selected_weapon_id
        .and_then(|id| state.weapon(id))
        .map(|w| (w.id, weapon_info(w.kind).name));
    if weapon.is_none() && !allow_unarmed {
        state.add_log("You need a weapon before heading out.");
        return false;
    }

    let start = Pos::center();
    let mut exploration = Exploration {
        mode: ExplorationMode::Active,
        phase: ExplorationPhase::Moving,
        position: start,
        start,
        carried_weapon_id: weapon.map(|(id, _)| id),
        player_hp: PLAYER_MAX_HP,
        ..Exploration::new()
    };
    reveal_around(&mut exploration, start);
    state.exploration = exploration;
    state.active_tab = Tab::Expedition;

    match weapon {
        Some((_, name)) => state.add_log(&format!("You head out into the wastes with your {}.", name)),
        None => state.add_log("You head out into the wastes with bare hands."),
    }
    true
}

// ── Movement ──────────────────────────────────────────────────

/// Move one step by `(dx, dy)`, clamped to the map. Returns false when the
/// move is rejected or changes nothing. `now` stamps first encounters.
pub fn move_player<R: Rng + ?Sized>(
    state: &mut GameState,
    rng: &mut R,
    dx: i32,
    dy: i32,
    now: u64,
) -> bool {
    if !state.exploration.is_active() || state.exploration.phase != ExplorationPhase::Moving {
        state.add_log("You can't move right now.");
        return false;
    }
    let from = state.exploration.position;
    let to = Pos::new(
        from.x.saturating_add(dx).clamp(0, MAP_SIZE - 1),
        from.y.saturating_add(dy).clamp(0, MAP_SIZE - 1),
    );
    if to == from {
        state.add_log("You can't go any further that way.");
        return false;
    }

    let exploration = &mut state.exploration;
    exploration.position = to;
    exploration.steps += 1;
    exploration.steps_since_encounter += 1;
    reveal_around(exploration, to);

    if to == state.exploration.start {
        return_to_base(state);
        return true;
    }

    let (old_biome, new_biome) = (biome_at(from), biome_at(to));
    if old_biome != new_biome {
        state.add_log(&format!("You enter the {}.", biome_info(new_biome).name));
    }

    if state.exploration.steps_since_encounter > ENCOUNTER_COOLDOWN_STEPS
        && rng.gen_bool(ENCOUNTER_CHANCE)
    {
        state.exploration.steps_since_encounter = 0;
        begin_combat(state, DEFAULT_ENEMY, now);
    }
    true
}

/// Enter combat against a fresh `enemy` and record it in the codex.
pub fn begin_combat(state: &mut GameState, enemy: EnemyId, now: u64) {
    let info = enemy_info(enemy);
    state.exploration.combat = Some(CombatState {
        enemy,
        enemy_hp: info.max_hp,
        enemy_max_hp: info.max_hp,
        enemy_damage: info.damage,
        enemy_cooldown_ms: info.cooldown_ms,
        enemy_timer_ms: 0.0,
        player_timer_ms: 0.0,
        flee_remaining_ms: 0.0,
    });
    state.exploration.phase = ExplorationPhase::Combat;

    let entry = state.enemy_codex.entry(enemy).or_default();
    if !entry.encountered {
        entry.encountered = true;
        entry.first_encountered_at = Some(now);
        log::debug!("codex: first {} at {}", info.name, now);
    }
    state.add_log(&format!("A {} attacks!", info.name));
}

// ── Combat exits ──────────────────────────────────────────────

/// Start the flee gauge. Rejected while it is already running.
pub fn flee(state: &mut GameState) -> bool {
    if state.exploration.phase != ExplorationPhase::Combat {
        state.add_log("There is nothing to flee from.");
        return false;
    }
    let Some(combat) = state.exploration.combat.as_mut() else {
        return false;
    };
    if combat.flee_remaining_ms > 0.0 {
        state.add_log("You are already trying to get away.");
        return false;
    }
    combat.flee_remaining_ms = FLEE_DURATION_MS;
    state.add_log("You look for an opening to run.");
    true
}

/// HP hit zero: the carried weapon and the whole backpack are lost.
pub(crate) fn die(state: &mut GameState) {
    let lost = state.exploration.carried_weapon_id;
    let mut lost_name = None;
    if let Some(id) = lost {
        lost_name = state.weapon(id).map(|w| weapon_info(w.kind).name);
        state.weapons.retain(|w| w.id != id);
        if state.selected_weapon_id == Some(id) {
            state.selected_weapon_id = state.weapons.first().map(|w| w.id);
        }
    }
    state.exploration = Exploration::new();
    state.active_tab = Tab::Base;

    state.add_log("You collapse in the dust and everything goes dark.");
    match lost_name {
        Some(name) => state.add_log(&format!(
            "You wake up back at base. Your {} and your pack are gone.",
            name
        )),
        None => state.add_log("You wake up back at base. Your pack is gone."),
    }
}

// ── Loot ──────────────────────────────────────────────────────

pub fn take_loot(state: &mut GameState, index: usize) -> bool {
    if state.exploration.phase != ExplorationPhase::Loot {
        state.add_log("There is nothing to pick up.");
        return false;
    }
    let Some(item) = state.exploration.pending_loot.get(index).cloned() else {
        state.add_log("That item isn't there.");
        return false;
    };
    let used = state.exploration.backpack_used();
    let capacity = backpack_capacity(state);
    let packed = used.saturating_add(item.amount);
    if packed > capacity {
        state.add_log(&format!(
            "Your backpack is too full for that ({}/{}).",
            used, capacity
        ));
        return false;
    }
    state.exploration.pending_loot.remove(index);
    merge_item(&mut state.exploration.backpack, item.clone());
    state.add_log(&format!(
        "You pack {} {}. ({}/{})",
        item.amount,
        item.resource.name(),
        packed,
        capacity
    ));
    true
}

/// Leave whatever is still on the ground and keep moving.
pub fn continue_exploring(state: &mut GameState) -> bool {
    if state.exploration.phase != ExplorationPhase::Loot {
        state.add_log("You are not looting anything.");
        return false;
    }
    let left_behind = state.exploration.pending_loot.len();
    state.exploration.pending_loot.clear();
    state.exploration.phase = ExplorationPhase::Moving;
    if left_behind > 0 {
        state.add_log(&format!("You leave {} item(s) behind.", left_behind));
    }
    true
}

// ── Return ────────────────────────────────────────────────────

/// Commit the backpack to the base. Only works on the start tile.
pub fn return_to_base(state: &mut GameState) -> bool {
    let exploration = &state.exploration;
    if !exploration.is_active()
        || exploration.phase != ExplorationPhase::Moving
        || exploration.position != exploration.start
    {
        state.add_log("You have to be back at the gate to return.");
        return false;
    }

    let mut haul = Resources::new();
    for item in &state.exploration.backpack {
        add(&mut haul, item.resource, item.amount as f64);
    }
    super::ledger::merge(&mut state.resources, &haul);
    let summary: Vec<String> = haul
        .iter()
        .map(|(id, v)| format!("{} {}", format_amount(*v), id.name()))
        .collect();

    state.exploration = Exploration::new();
    state.active_tab = Tab::Base;
    if summary.is_empty() {
        state.add_log("You return to base empty-handed.");
    } else {
        state.add_log(&format!("You return to base with {}.", summary.join(", ")));
    }
    check_unlocks(state);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actions::create_weapon;
    use crate::game::ledger::amount;
    use crate::game::state::{ResourceId, WeaponType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ready() -> GameState {
        let mut s = GameState::new();
        s.unlocks.insert(UnlockId::Expeditions, true);
        create_weapon(&mut s, WeaponType::Pipe);
        s
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(11)
    }

    #[test]
    fn start_requires_weapon_unless_overridden() {
        let mut s = GameState::new();
        s.unlocks.insert(UnlockId::Expeditions, true);
        assert!(!start_expedition(&mut s, false));
        assert!(start_expedition(&mut s, true));
        assert_eq!(s.exploration.carried_weapon_id, None);
    }

    #[test]
    fn start_requires_unlock() {
        let mut s = GameState::new();
        create_weapon(&mut s, WeaponType::Pipe);
        assert!(!start_expedition(&mut s, false));
        assert!(!s.exploration.is_active());
    }

    #[test]
    fn start_reveals_around_center() {
        let mut s = ready();
        assert!(start_expedition(&mut s, false));
        assert_eq!(s.exploration.position, Pos::center());
        // 3×3 block around the start
        assert_eq!(s.exploration.visited.len(), 9);
        assert_eq!(s.active_tab, Tab::Expedition);
        assert_eq!(s.exploration.carried_weapon_id, s.selected_weapon_id);
    }

    #[test]
    fn boundary_move_rejected() {
        let mut s = ready();
        start_expedition(&mut s, false);
        s.exploration.position = Pos::new(0, 3);
        let steps = s.exploration.steps;
        assert!(!move_player(&mut s, &mut rng(), -1, 0, 0));
        assert_eq!(s.exploration.position, Pos::new(0, 3));
        assert_eq!(s.exploration.steps, steps);

        s.exploration.position = Pos::new(MAP_SIZE - 1, MAP_SIZE - 1);
        assert!(!move_player(&mut s, &mut rng(), 1, 1, 0));
        assert_eq!(s.exploration.position, Pos::new(MAP_SIZE - 1, MAP_SIZE - 1));
    }

    #[test]
    fn extreme_delta_clamps_to_edge() {
        let mut s = ready();
        start_expedition(&mut s, false);
        assert!(move_player(&mut s, &mut rng(), i32::MAX, i32::MIN, 0));
        assert_eq!(s.exploration.position, Pos::new(MAP_SIZE - 1, 0));
    }

    #[test]
    fn no_encounter_during_cooldown() {
        let mut s = ready();
        start_expedition(&mut s, false);
        let mut r = rng();
        assert!(move_player(&mut s, &mut r, 1, 0, 0));
        assert!(move_player(&mut s, &mut r, 1, 0, 0));
        assert_eq!(s.exploration.phase, ExplorationPhase::Moving);
        assert_eq!(s.exploration.steps, 2);
    }

    #[test]
    fn walking_eventually_meets_a_rat() {
        let mut s = ready();
        start_expedition(&mut s, false);
        let mut r = rng();
        let mut dir = 1;
        for _ in 0..200 {
            if s.exploration.phase == ExplorationPhase::Combat {
                break;
            }
            if !move_player(&mut s, &mut r, dir, 0, 42) {
                dir = -dir;
            }
            if !s.exploration.is_active() {
                start_expedition(&mut s, false);
            }
        }
        assert_eq!(s.exploration.phase, ExplorationPhase::Combat);
        assert_eq!(s.exploration.steps_since_encounter, 0);
        let codex = &s.enemy_codex[&DEFAULT_ENEMY];
        assert!(codex.encountered);
        assert_eq!(codex.first_encountered_at, Some(42));
    }

    #[test]
    fn stepping_back_on_start_returns() {
        let mut s = ready();
        start_expedition(&mut s, false);
        s.exploration.backpack.push(LootItem {
            resource: ResourceId::Scrap,
            amount: 5,
        });
        s.exploration.position = Pos::new(8, 7);
        assert!(move_player(&mut s, &mut rng(), -1, 0, 0));
        assert_eq!(s.exploration.mode, ExplorationMode::Loadout);
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 5.0);
        assert!(s.exploration.backpack.is_empty());
    }

    #[test]
    fn return_only_from_start_tile() {
        let mut s = ready();
        start_expedition(&mut s, false);
        s.exploration.position = Pos::new(3, 3);
        assert!(!return_to_base(&mut s));
        assert!(s.exploration.is_active());
    }

    fn looting(items: Vec<LootItem>) -> GameState {
        let mut s = ready();
        start_expedition(&mut s, false);
        s.exploration.phase = ExplorationPhase::Loot;
        s.exploration.pending_loot = items;
        s
    }

    #[test]
    fn take_loot_merges_same_resource() {
        let mut s = looting(vec![
            LootItem {
                resource: ResourceId::Scrap,
                amount: 2,
            },
            LootItem {
                resource: ResourceId::Scrap,
                amount: 3,
            },
        ]);
        assert!(take_loot(&mut s, 0));
        assert!(take_loot(&mut s, 0));
        assert_eq!(s.exploration.backpack.len(), 1);
        assert_eq!(s.exploration.backpack[0].amount, 5);
        assert!(s.exploration.pending_loot.is_empty());
    }

    #[test]
    fn take_loot_respects_capacity() {
        let mut s = looting(vec![LootItem {
            resource: ResourceId::Iron,
            amount: 4,
        }]);
        s.exploration.backpack.push(LootItem {
            resource: ResourceId::Scrap,
            amount: BACKPACK_CAPACITY - 3,
        });
        assert!(!take_loot(&mut s, 0));
        assert_eq!(s.exploration.pending_loot.len(), 1);

        s.upgrades.insert(UpgradeId::Rucksack, true);
        assert!(take_loot(&mut s, 0));
    }

    #[test]
    fn overstuffed_backpack_rejects_without_overflow() {
        let mut s = looting(vec![LootItem {
            resource: ResourceId::Iron,
            amount: u32::MAX,
        }]);
        s.exploration.backpack = vec![
            LootItem {
                resource: ResourceId::Scrap,
                amount: u32::MAX,
            },
            LootItem {
                resource: ResourceId::Wood,
                amount: u32::MAX,
            },
        ];
        assert_eq!(s.exploration.backpack_used(), u32::MAX);
        assert!(!take_loot(&mut s, 0));
        assert_eq!(s.exploration.pending_loot.len(), 1);
    }

    #[test]
    fn continue_discards_pending() {
        let mut s = looting(vec![LootItem {
            resource: ResourceId::Copper,
            amount: 1,
        }]);
        assert!(continue_exploring(&mut s));
        assert!(s.exploration.pending_loot.is_empty());
        assert_eq!(s.exploration.phase, ExplorationPhase::Moving);
    }

    #[test]
    fn death_loses_weapon_and_backpack() {
        let mut s = ready();
        let spare = create_weapon(&mut s, WeaponType::Crossbow).unwrap();
        start_expedition(&mut s, false);
        let carried = s.exploration.carried_weapon_id.unwrap();
        s.exploration.backpack.push(LootItem {
            resource: ResourceId::Scrap,
            amount: 7,
        });
        die(&mut s);
        assert!(s.weapon(carried).is_none());
        assert_eq!(s.selected_weapon_id, Some(spare));
        assert_eq!(s.exploration, Exploration::new());
        assert_eq!(amount(&s.resources, ResourceId::Scrap), 0.0);
        assert_eq!(s.active_tab, Tab::Base);
    }

    #[test]
    fn flee_outside_combat_rejected() {
        let mut s = ready();
        start_expedition(&mut s, false);
        assert!(!flee(&mut s));
    }
}
