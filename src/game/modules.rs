//! Equip, unequip and move modules between the inventory and weapon slots.
//!
//! Every operation only moves units: `modules[kind]` plus the equipped copies
//! of `kind` stays constant.

use super::content::weapon_info;
use super::state::{GameState, ModuleType, WeaponType, SLOT_COUNT};

pub fn is_active_slot(kind: WeaponType, slot: usize) -> bool {
    slot < SLOT_COUNT && weapon_info(kind).active_slots.contains(&slot)
}

/// Checks that `weapon_id` exists, is not out in the field, and that `slot`
/// can hold a module. Logs and returns the weapon type on success.
fn check_slot(state: &mut GameState, weapon_id: u32, slot: usize) -> Option<WeaponType> {
    let Some(kind) = state.weapon(weapon_id).map(|w| w.kind) else {
        state.add_log(&format!("There is no weapon #{}.", weapon_id));
        return None;
    };
    if state.exploration.is_active() && state.exploration.carried_weapon_id == Some(weapon_id) {
        state.add_log("You can't rework a weapon you're carrying in the field.");
        return None;
    }
    if !is_active_slot(kind, slot) {
        state.add_log(&format!(
            "Slot {} of the {} can't hold a module.",
            slot + 1,
            weapon_info(kind).name
        ));
        return None;
    }
    Some(kind)
}

fn evict(state: &mut GameState, weapon_id: u32, slot: usize) {
    let occupant = state
        .weapon_mut(weapon_id)
        .and_then(|w| w.slots[slot].take());
    if let Some(old) = occupant {
        *state.modules.entry(old).or_insert(0) += 1;
        state.add_log(&format!("{} auto-unequipped.", old.name()));
    }
}

pub fn equip_module(state: &mut GameState, weapon_id: u32, slot: usize, kind: ModuleType) -> bool {
    if check_slot(state, weapon_id, slot).is_none() {
        return false;
    }
    if state.module_count(kind) == 0 {
        state.add_log(&format!("You have no {} to spare.", kind.name()));
        return false;
    }
    if state.weapon(weapon_id).and_then(|w| w.slots[slot]) == Some(kind) {
        state.add_log(&format!("That slot already holds a {}.", kind.name()));
        return false;
    }

    evict(state, weapon_id, slot);
    if let Some(count) = state.modules.get_mut(&kind) {
        *count -= 1;
    }
    if let Some(w) = state.weapon_mut(weapon_id) {
        w.slots[slot] = Some(kind);
    }
    state.add_log(&format!("Fitted a {} into slot {}.", kind.name(), slot + 1));
    true
}

pub fn unequip_module(state: &mut GameState, weapon_id: u32, slot: usize) -> bool {
    if check_slot(state, weapon_id, slot).is_none() {
        return false;
    }
    let taken = state
        .weapon_mut(weapon_id)
        .and_then(|w| w.slots[slot].take());
    match taken {
        Some(kind) => {
            *state.modules.entry(kind).or_insert(0) += 1;
            state.add_log(&format!("Removed the {} from slot {}.", kind.name(), slot + 1));
            true
        }
        None => {
            state.add_log(&format!("Slot {} is already empty.", slot + 1));
            false
        }
    }
}

/// Move a fitted module to another slot, possibly on another weapon. An
/// occupant of the target slot goes back to the inventory.
pub fn move_module(
    state: &mut GameState,
    from_weapon: u32,
    from_slot: usize,
    to_weapon: u32,
    to_slot: usize,
) -> bool {
    if check_slot(state, from_weapon, from_slot).is_none()
        || check_slot(state, to_weapon, to_slot).is_none()
    {
        return false;
    }
    if from_weapon == to_weapon && from_slot == to_slot {
        state.add_log("The module is already there.");
        return false;
    }
    let Some(kind) = state.weapon(from_weapon).and_then(|w| w.slots[from_slot]) else {
        state.add_log(&format!("Slot {} is empty.", from_slot + 1));
        return false;
    };

    evict(state, to_weapon, to_slot);
    if let Some(w) = state.weapon_mut(from_weapon) {
        w.slots[from_slot] = None;
    }
    if let Some(w) = state.weapon_mut(to_weapon) {
        w.slots[to_slot] = Some(kind);
    }
    state.add_log(&format!("Moved the {} to slot {}.", kind.name(), to_slot + 1));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actions::create_weapon;
    use crate::game::state::ExplorationMode;

    fn armed() -> (GameState, u32) {
        let mut s = GameState::new();
        let id = create_weapon(&mut s, WeaponType::Crossbow).unwrap();
        s.modules.insert(ModuleType::Damage, 2);
        s.modules.insert(ModuleType::Amplifier, 1);
        (s, id)
    }

    #[test]
    fn equip_moves_from_inventory() {
        let (mut s, id) = armed();
        assert!(equip_module(&mut s, id, 0, ModuleType::Damage));
        assert_eq!(s.module_count(ModuleType::Damage), 1);
        assert_eq!(s.weapon(id).unwrap().slots[0], Some(ModuleType::Damage));
    }

    #[test]
    fn inactive_slot_rejected() {
        let (mut s, id) = armed();
        // crossbow only has the top row
        assert!(!equip_module(&mut s, id, 3, ModuleType::Damage));
        assert_eq!(s.module_count(ModuleType::Damage), 2);
        assert!(!equip_module(&mut s, id, 99, ModuleType::Damage));
    }

    #[test]
    fn empty_inventory_rejected() {
        let (mut s, id) = armed();
        assert!(!equip_module(&mut s, id, 0, ModuleType::Cooldown));
        assert!(s.log.last().unwrap().contains("no Cooldown module"));
    }

    #[test]
    fn equip_over_occupant_evicts_it() {
        let (mut s, id) = armed();
        equip_module(&mut s, id, 1, ModuleType::Damage);
        assert!(equip_module(&mut s, id, 1, ModuleType::Amplifier));
        assert_eq!(s.module_count(ModuleType::Damage), 2);
        assert_eq!(s.module_count(ModuleType::Amplifier), 0);
        assert!(s.log.iter().any(|l| l.contains("auto-unequipped")));
    }

    #[test]
    fn move_to_occupied_slot_evicts() {
        let (mut s, id) = armed();
        equip_module(&mut s, id, 0, ModuleType::Damage);
        equip_module(&mut s, id, 2, ModuleType::Amplifier);
        assert!(move_module(&mut s, id, 0, id, 2));
        let w = s.weapon(id).unwrap();
        assert_eq!(w.slots[0], None);
        assert_eq!(w.slots[2], Some(ModuleType::Damage));
        assert_eq!(s.module_count(ModuleType::Amplifier), 1);
    }

    #[test]
    fn move_between_weapons() {
        let (mut s, a) = armed();
        let b = create_weapon(&mut s, WeaponType::Pipe).unwrap();
        equip_module(&mut s, a, 2, ModuleType::Damage);
        // pipe slot 2 is inactive
        assert!(!move_module(&mut s, a, 2, b, 2));
        assert!(move_module(&mut s, a, 2, b, 1));
        assert_eq!(s.weapon(b).unwrap().slots[1], Some(ModuleType::Damage));
    }

    #[test]
    fn unequip_empty_slot_rejected() {
        let (mut s, id) = armed();
        assert!(!unequip_module(&mut s, id, 0));
    }

    #[test]
    fn carried_weapon_locked_in_field() {
        let (mut s, id) = armed();
        s.exploration.mode = ExplorationMode::Active;
        s.exploration.carried_weapon_id = Some(id);
        assert!(!equip_module(&mut s, id, 0, ModuleType::Damage));
    }
}
