//! Weapon stats and real-time combat resolution.

use rand::Rng;

use super::content::{enemy_info, weapon_info, UNARMED_COOLDOWN_MS, UNARMED_DAMAGE};
use super::exploration::die;
use super::modules::is_active_slot;
use super::process::advance_countdown;
use super::state::{
    EnemyId, ExplorationPhase, GameState, LootItem, ModuleType, Weapon, SLOT_COLUMNS, SLOT_COUNT,
};

/// Attack speed never drops below this.
pub const MIN_COOLDOWN_MS: f64 = 500.0;
/// Cooldown shaved off per cooldown-module effect.
pub const COOLDOWN_STEP_MS: f64 = 250.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeaponStats {
    pub damage: u32,
    pub cooldown_ms: f64,
}

// ── Stats ─────────────────────────────────────────────────────

fn active_module(weapon: &Weapon, slot: usize) -> Option<ModuleType> {
    if is_active_slot(weapon.kind, slot) {
        weapon.slots[slot]
    } else {
        None
    }
}

/// Stacking power of each active amplifier, 0 for every other slot.
///
/// Computed right to left per row: an amplifier is worth one more than the
/// amplifier directly to its right.
pub fn amplifier_power(weapon: &Weapon) -> [u32; SLOT_COUNT] {
    let mut power = [0; SLOT_COUNT];
    for row_start in (0..SLOT_COUNT).step_by(SLOT_COLUMNS) {
        for col in (0..SLOT_COLUMNS).rev() {
            let i = row_start + col;
            if active_module(weapon, i) != Some(ModuleType::Amplifier) {
                continue;
            }
            let right = if col + 1 < SLOT_COLUMNS { power[i + 1] } else { 0 };
            power[i] = 1 + right;
        }
    }
    power
}

/// Extra effect copies a non-amplifier module in `slot` gets from the
/// amplifier run ending directly to its left (the power of that run's
/// leftmost amplifier).
pub fn amplification_bonus(power: &[u32; SLOT_COUNT], slot: usize) -> u32 {
    let col = slot % SLOT_COLUMNS;
    if col == 0 || power[slot - 1] == 0 {
        return 0;
    }
    let mut leftmost = slot - 1;
    while leftmost % SLOT_COLUMNS > 0 && power[leftmost - 1] > 0 {
        leftmost -= 1;
    }
    power[leftmost]
}

pub fn weapon_stats(weapon: &Weapon) -> WeaponStats {
    let info = weapon_info(weapon.kind);
    let power = amplifier_power(weapon);
    let mut damage_effects = 0;
    let mut cooldown_effects = 0;
    for slot in 0..SLOT_COUNT {
        match active_module(weapon, slot) {
            Some(ModuleType::Damage) => {
                damage_effects += 1 + amplification_bonus(&power, slot);
            }
            Some(ModuleType::Cooldown) => {
                cooldown_effects += 1 + amplification_bonus(&power, slot);
            }
            Some(ModuleType::Amplifier) | None => {}
        }
    }
    WeaponStats {
        damage: info.damage + damage_effects,
        cooldown_ms: (info.cooldown_ms - COOLDOWN_STEP_MS * cooldown_effects as f64)
            .max(MIN_COOLDOWN_MS),
    }
}

/// Stats of `weapon`, or bare fists when there is none.
pub fn carried_stats(weapon: Option<&Weapon>) -> WeaponStats {
    weapon.map(weapon_stats).unwrap_or(WeaponStats {
        damage: UNARMED_DAMAGE,
        cooldown_ms: UNARMED_COOLDOWN_MS,
    })
}

/// Stats of whatever the player carries on the current expedition.
pub fn player_stats(state: &GameState) -> WeaponStats {
    carried_stats(
        state
            .exploration
            .carried_weapon_id
            .and_then(|id| state.weapon(id)),
    )
}

// ── Loot ──────────────────────────────────────────────────────

/// Rolls each drop independently: chance first, then a uniform amount.
pub fn roll_loot<R: Rng + ?Sized>(enemy: EnemyId, rng: &mut R) -> Vec<LootItem> {
    let mut loot = Vec::new();
    for drop in enemy_info(enemy).drops {
        if !rng.gen_bool(drop.chance.clamp(0.0, 1.0)) {
            continue;
        }
        let amount = rng.gen_range(drop.min..=drop.max.max(drop.min));
        if amount > 0 {
            loot.push(LootItem {
                resource: drop.resource,
                amount,
            });
        }
    }
    loot
}

fn describe_loot(loot: &[LootItem]) -> String {
    if loot.is_empty() {
        return "nothing".to_string();
    }
    loot.iter()
        .map(|item| format!("{} {}", item.amount, item.resource.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Resolution ────────────────────────────────────────────────

/// Advance an ongoing fight by `elapsed` ms. Player swings first, then the
/// enemy, then the flee gauge.
pub(crate) fn resolve_combat<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R, elapsed: f64) {
    if !state.exploration.is_active() || state.exploration.phase != ExplorationPhase::Combat {
        return;
    }
    let Some(mut combat) = state.exploration.combat.take() else {
        state.exploration.phase = ExplorationPhase::Moving;
        return;
    };
    let enemy = enemy_info(combat.enemy);
    let stats = player_stats(state);

    combat.player_timer_ms += elapsed;
    while combat.player_timer_ms >= stats.cooldown_ms && combat.enemy_hp > 0 {
        combat.player_timer_ms -= stats.cooldown_ms;
        combat.enemy_hp = combat.enemy_hp.saturating_sub(stats.damage);
        state.add_log(&format!(
            "You hit the {} for {}. ({}/{} HP)",
            enemy.name, stats.damage, combat.enemy_hp, combat.enemy_max_hp
        ));
    }

    if combat.enemy_hp == 0 {
        let loot = roll_loot(combat.enemy, rng);
        state.add_log(&format!(
            "The {} is dead. It dropped {}.",
            enemy.name,
            describe_loot(&loot)
        ));
        state.exploration.pending_loot = loot;
        state.exploration.phase = ExplorationPhase::Loot;
        state
            .enemy_codex
            .entry(combat.enemy)
            .or_default()
            .defeat_count += 1;
        return;
    }

    let enemy_cooldown = combat.enemy_cooldown_ms.max(1.0);
    combat.enemy_timer_ms += elapsed;
    while combat.enemy_timer_ms >= enemy_cooldown && state.exploration.player_hp > 0 {
        combat.enemy_timer_ms -= enemy_cooldown;
        let hp = state.exploration.player_hp.saturating_sub(combat.enemy_damage);
        state.exploration.player_hp = hp;
        state.add_log(&format!(
            "The {} hits you for {}. ({} HP left)",
            enemy.name, combat.enemy_damage, hp
        ));
    }
    if state.exploration.player_hp == 0 {
        die(state);
        return;
    }

    if combat.flee_remaining_ms > 0.0 {
        let step = advance_countdown(combat.flee_remaining_ms, elapsed);
        combat.flee_remaining_ms = step.next_remaining;
        if step.completed {
            state.exploration.phase = ExplorationPhase::Moving;
            state.add_log(&format!("You slip away from the {}.", enemy.name));
            return;
        }
    }

    state.exploration.combat = Some(combat);
}
