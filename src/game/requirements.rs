//! Requirement trees gating buildings, actions, recipes and upgrades.

use super::ledger::{amount, format_amount};
use super::state::{BuildingId, GameState, ResourceId, UnlockId};

#[derive(Clone, Debug, PartialEq)]
pub enum Requirement {
    Resource { id: ResourceId, at_least: f64 },
    Building { id: BuildingId, at_least: u32 },
    Unlock { id: UnlockId, expected: bool },
    All(Vec<Requirement>),
    Any(Vec<Requirement>),
}

impl Requirement {
    pub fn is_met(&self, state: &GameState) -> bool {
        match self {
            Requirement::Resource { id, at_least } => amount(&state.resources, *id) >= *at_least,
            Requirement::Building { id, at_least } => state.building_count(*id) >= *at_least,
            Requirement::Unlock { id, expected } => state.is_unlocked(*id) == *expected,
            Requirement::All(list) => list.iter().all(|r| r.is_met(state)),
            Requirement::Any(list) => list.iter().any(|r| r.is_met(state)),
        }
    }

    /// Human-readable description of what is missing, `None` when met.
    pub fn missing(&self, state: &GameState) -> Option<String> {
        match self {
            Requirement::Resource { id, at_least } => {
                if self.is_met(state) {
                    None
                } else {
                    Some(format!("{} {}", format_amount(*at_least), id.name()))
                }
            }
            Requirement::Building { id, at_least } => {
                if self.is_met(state) {
                    None
                } else {
                    Some(format!("{} {}", at_least, super::content::building_info(*id).name))
                }
            }
            Requirement::Unlock { id, expected } => {
                if self.is_met(state) {
                    None
                } else if *expected {
                    Some(format!("{} unlocked", super::content::unlock_info(*id).name))
                } else {
                    Some(format!("{} still locked", super::content::unlock_info(*id).name))
                }
            }
            Requirement::All(list) => list.iter().find_map(|r| r.missing(state)),
            Requirement::Any(list) => {
                if self.is_met(state) {
                    return None;
                }
                let parts: Vec<String> = list.iter().filter_map(|r| r.missing(state)).collect();
                Some(parts.join(" or "))
            }
        }
    }
}

/// Convenience for `All` with nothing in it.
pub fn always() -> Requirement {
    Requirement::All(Vec::new())
}
