/// Wasteland Idle: a scrapyard idle game with crafting and expeditions.

pub mod actions;
pub mod combat;
pub mod content;
pub mod exploration;
pub mod ledger;
pub mod modules;
pub mod process;
pub mod production;
pub mod requirements;
pub mod save;
pub mod state;
pub mod tick;
pub mod unlocks;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use save::{Autosave, Storage, StorageError};
use state::{BuildingId, GameState, GatherAction, ModuleType, ProductionKey, Recipe, Tab, UpgradeId};

/// Everything a player can do. Each command maps onto one action function.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Gather(GatherAction),
    Build(BuildingId),
    Research(UpgradeId),
    Craft(Recipe),
    ToggleProduction(ProductionKey),
    SelectWeapon(u32),
    Equip {
        weapon: u32,
        slot: usize,
        module: ModuleType,
    },
    Unequip {
        weapon: u32,
        slot: usize,
    },
    MoveModule {
        from_weapon: u32,
        from_slot: usize,
        to_weapon: u32,
        to_slot: usize,
    },
    Embark {
        allow_unarmed: bool,
    },
    Step {
        dx: i32,
        dy: i32,
    },
    TakeLoot(usize),
    ContinueExploring,
    ReturnToBase,
    Flee,
    ShowTab(Tab),
}

/// One play session: the state, its random stream and the autosave timer.
pub struct WastelandGame {
    pub state: GameState,
    rng: ChaCha8Rng,
    autosave: Autosave,
}

impl WastelandGame {
    pub fn new(seed: u64) -> Self {
        Self::from_state(GameState::new(), seed)
    }

    pub fn from_state(state: GameState, seed: u64) -> Self {
        Self {
            state,
            rng: ChaCha8Rng::seed_from_u64(seed),
            autosave: Autosave::default(),
        }
    }

    /// Catch up to wall-clock `now` (ms).
    pub fn update(&mut self, now: u64) {
        tick::tick(&mut self.state, &mut self.rng, now);
    }

    /// Advance by a fixed interval without touching `last_update`.
    pub fn advance_by(&mut self, elapsed_ms: f64) {
        tick::advance(&mut self.state, &mut self.rng, elapsed_ms);
    }

    /// Apply one command. Returns false when the game rejected it; the
    /// reason is the last log line.
    pub fn handle(&mut self, command: &Command, now: u64) -> bool {
        let state = &mut self.state;
        match *command {
            Command::Gather(action) => actions::start_action(state, action),
            Command::Build(id) => actions::buy_building(state, id),
            Command::Research(id) => actions::buy_upgrade(state, id),
            Command::Craft(recipe) => actions::start_craft(state, recipe),
            Command::ToggleProduction(key) => production::toggle_production(state, key),
            Command::SelectWeapon(id) => actions::select_weapon(state, id),
            Command::Equip {
                weapon,
                slot,
                module,
            } => modules::equip_module(state, weapon, slot, module),
            Command::Unequip { weapon, slot } => modules::unequip_module(state, weapon, slot),
            Command::MoveModule {
                from_weapon,
                from_slot,
                to_weapon,
                to_slot,
            } => modules::move_module(state, from_weapon, from_slot, to_weapon, to_slot),
            Command::Embark { allow_unarmed } => exploration::start_expedition(state, allow_unarmed),
            Command::Step { dx, dy } => {
                exploration::move_player(state, &mut self.rng, dx, dy, now)
            }
            Command::TakeLoot(index) => exploration::take_loot(state, index),
            Command::ContinueExploring => exploration::continue_exploring(state),
            Command::ReturnToBase => exploration::return_to_base(state),
            Command::Flee => exploration::flee(state),
            Command::ShowTab(tab) => {
                state.active_tab = tab;
                true
            }
        }
    }

    /// Write a save if the autosave interval has passed. Returns whether it
    /// saved.
    pub fn save_if_due<S: Storage + ?Sized>(
        &mut self,
        storage: &mut S,
        now: u64,
    ) -> Result<bool, StorageError> {
        if !self.autosave.due(now) {
            return Ok(false);
        }
        self.save(storage, now)?;
        Ok(true)
    }

    /// Unconditional save, e.g. on session end.
    pub fn save<S: Storage + ?Sized>(&mut self, storage: &mut S, now: u64) -> Result<(), StorageError> {
        save::save_game(storage, &self.state)?;
        self.autosave.mark(now);
        Ok(())
    }
}
