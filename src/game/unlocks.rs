//! Unlock evaluator: flips unlock flags the first time their threshold is met.

use super::content::unlock_info;
use super::ledger::{can_afford, from_table};
use super::state::{GameState, Keyed, UnlockId};

/// Returns how many flags flipped. Each transition logs exactly once.
pub fn check_unlocks(state: &mut GameState) -> usize {
    let mut flipped = 0;
    for id in UnlockId::all() {
        if state.is_unlocked(*id) {
            continue;
        }
        let info = unlock_info(*id);
        if can_afford(&state.resources, &from_table(info.condition)) {
            state.unlocks.insert(*id, true);
            state.add_log(info.message);
            log::debug!("unlock {} reached", id.key());
            flipped += 1;
        }
    }
    flipped
}
