//! Wasteland Idle game state: all data structures, no logic.
//!
//! `GameState` is the single mutable aggregate. Player actions and the tick
//! engine both take it as `&mut GameState`; nothing else holds a reference.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::ledger::Resources;

/// Most recent log lines kept; older ones drop off the front.
pub const MAX_LOG: usize = 30;
/// Slot array length of every weapon (2 rows × 3 columns).
pub const SLOT_COUNT: usize = 6;
pub const SLOT_COLUMNS: usize = 3;
/// Edge length of the square exploration map.
pub const MAP_SIZE: i32 = 15;
pub const PLAYER_MAX_HP: u32 = 30;

// ── Keys ──────────────────────────────────────────────────────

/// Enums persisted as string keys.
///
/// `key()` must match the camelCase serde name of the variant so a snapshot
/// can be read back by the save normalizer.
pub trait Keyed: Copy + Sized + 'static {
    fn all() -> &'static [Self];
    fn key(&self) -> &'static str;

    fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.key() == key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceId {
    Scrap,
    Wood,
    Stone,
    Iron,
    Copper,
    Shovel,
}

impl Keyed for ResourceId {
    fn all() -> &'static [Self] {
        &[
            ResourceId::Scrap,
            ResourceId::Wood,
            ResourceId::Stone,
            ResourceId::Iron,
            ResourceId::Copper,
            ResourceId::Shovel,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            ResourceId::Scrap => "scrap",
            ResourceId::Wood => "wood",
            ResourceId::Stone => "stone",
            ResourceId::Iron => "iron",
            ResourceId::Copper => "copper",
            ResourceId::Shovel => "shovel",
        }
    }
}

impl ResourceId {
    /// Display name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ResourceId::Scrap => "scrap",
            ResourceId::Wood => "wood",
            ResourceId::Stone => "stone",
            ResourceId::Iron => "iron",
            ResourceId::Copper => "copper",
            ResourceId::Shovel => "shovel",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildingId {
    Collector,
    Lumberyard,
    Smelter,
    Workshop,
    Camp,
}

impl Keyed for BuildingId {
    fn all() -> &'static [Self] {
        &[
            BuildingId::Collector,
            BuildingId::Lumberyard,
            BuildingId::Smelter,
            BuildingId::Workshop,
            BuildingId::Camp,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            BuildingId::Collector => "collector",
            BuildingId::Lumberyard => "lumberyard",
            BuildingId::Smelter => "smelter",
            BuildingId::Workshop => "workshop",
            BuildingId::Camp => "camp",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnlockId {
    Woodcutting,
    Construction,
    Smelting,
    Workshop,
    Expeditions,
}

impl Keyed for UnlockId {
    fn all() -> &'static [Self] {
        &[
            UnlockId::Woodcutting,
            UnlockId::Construction,
            UnlockId::Smelting,
            UnlockId::Workshop,
            UnlockId::Expeditions,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            UnlockId::Woodcutting => "woodcutting",
            UnlockId::Construction => "construction",
            UnlockId::Smelting => "smelting",
            UnlockId::Workshop => "workshop",
            UnlockId::Expeditions => "expeditions",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeId {
    ReinforcedGloves,
    SharpAxe,
    PneumaticDrill,
    Rucksack,
}

impl Keyed for UpgradeId {
    fn all() -> &'static [Self] {
        &[
            UpgradeId::ReinforcedGloves,
            UpgradeId::SharpAxe,
            UpgradeId::PneumaticDrill,
            UpgradeId::Rucksack,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            UpgradeId::ReinforcedGloves => "reinforcedGloves",
            UpgradeId::SharpAxe => "sharpAxe",
            UpgradeId::PneumaticDrill => "pneumaticDrill",
            UpgradeId::Rucksack => "rucksack",
        }
    }
}

/// Cyclic production processes. Most map to a building; `Scavenger` is
/// driven by shovels at the camp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductionKey {
    Collector,
    Lumberyard,
    Smelter,
    Scavenger,
}

impl Keyed for ProductionKey {
    fn all() -> &'static [Self] {
        &[
            ProductionKey::Collector,
            ProductionKey::Lumberyard,
            ProductionKey::Smelter,
            ProductionKey::Scavenger,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            ProductionKey::Collector => "collector",
            ProductionKey::Lumberyard => "lumberyard",
            ProductionKey::Smelter => "smelter",
            ProductionKey::Scavenger => "scavenger",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GatherAction {
    Scavenge,
    ChopWood,
    DigStone,
}

impl Keyed for GatherAction {
    fn all() -> &'static [Self] {
        &[
            GatherAction::Scavenge,
            GatherAction::ChopWood,
            GatherAction::DigStone,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            GatherAction::Scavenge => "scavenge",
            GatherAction::ChopWood => "chopWood",
            GatherAction::DigStone => "digStone",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Recipe {
    PipeGun,
    Crossbow,
    Rifle,
    Shovel,
    ModuleKit,
    SurvivalKit,
}

impl Keyed for Recipe {
    fn all() -> &'static [Self] {
        &[
            Recipe::PipeGun,
            Recipe::Crossbow,
            Recipe::Rifle,
            Recipe::Shovel,
            Recipe::ModuleKit,
            Recipe::SurvivalKit,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            Recipe::PipeGun => "pipeGun",
            Recipe::Crossbow => "crossbow",
            Recipe::Rifle => "rifle",
            Recipe::Shovel => "shovel",
            Recipe::ModuleKit => "moduleKit",
            Recipe::SurvivalKit => "survivalKit",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WeaponType {
    Pipe,
    Crossbow,
    Rifle,
}

impl Keyed for WeaponType {
    fn all() -> &'static [Self] {
        &[WeaponType::Pipe, WeaponType::Crossbow, WeaponType::Rifle]
    }

    fn key(&self) -> &'static str {
        match self {
            WeaponType::Pipe => "pipe",
            WeaponType::Crossbow => "crossbow",
            WeaponType::Rifle => "rifle",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleType {
    Damage,
    Cooldown,
    Amplifier,
}

impl Keyed for ModuleType {
    fn all() -> &'static [Self] {
        &[ModuleType::Damage, ModuleType::Cooldown, ModuleType::Amplifier]
    }

    fn key(&self) -> &'static str {
        match self {
            ModuleType::Damage => "damage",
            ModuleType::Cooldown => "cooldown",
            ModuleType::Amplifier => "amplifier",
        }
    }
}

impl ModuleType {
    pub fn name(&self) -> &'static str {
        match self {
            ModuleType::Damage => "Damage module",
            ModuleType::Cooldown => "Cooldown module",
            ModuleType::Amplifier => "Amplifier module",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnemyId {
    Rat,
    Raider,
    Drone,
}

impl Keyed for EnemyId {
    fn all() -> &'static [Self] {
        &[EnemyId::Rat, EnemyId::Raider, EnemyId::Drone]
    }

    fn key(&self) -> &'static str {
        match self {
            EnemyId::Rat => "rat",
            EnemyId::Raider => "raider",
            EnemyId::Drone => "drone",
        }
    }
}

/// Which panel the renderer should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tab {
    Base,
    Crafting,
    Expedition,
}

impl Keyed for Tab {
    fn all() -> &'static [Self] {
        &[Tab::Base, Tab::Crafting, Tab::Expedition]
    }

    fn key(&self) -> &'static str {
        match self {
            Tab::Base => "base",
            Tab::Crafting => "crafting",
            Tab::Expedition => "expedition",
        }
    }
}

// ── Weapons ───────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Weapon {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: WeaponType,
    pub slots: [Option<ModuleType>; SLOT_COUNT],
}

impl Weapon {
    pub fn new(id: u32, kind: WeaponType) -> Self {
        Self {
            id,
            kind,
            slots: [None; SLOT_COUNT],
        }
    }
}

// ── Exploration ───────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplorationMode {
    Loadout,
    Active,
}

impl Keyed for ExplorationMode {
    fn all() -> &'static [Self] {
        &[ExplorationMode::Loadout, ExplorationMode::Active]
    }

    fn key(&self) -> &'static str {
        match self {
            ExplorationMode::Loadout => "loadout",
            ExplorationMode::Active => "active",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplorationPhase {
    Moving,
    Combat,
    Loot,
}

impl Keyed for ExplorationPhase {
    fn all() -> &'static [Self] {
        &[
            ExplorationPhase::Moving,
            ExplorationPhase::Combat,
            ExplorationPhase::Loot,
        ]
    }

    fn key(&self) -> &'static str {
        match self {
            ExplorationPhase::Moving => "moving",
            ExplorationPhase::Combat => "combat",
            ExplorationPhase::Loot => "loot",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn center() -> Self {
        Self::new(MAP_SIZE / 2, MAP_SIZE / 2)
    }

    pub fn in_bounds(&self) -> bool {
        (0..MAP_SIZE).contains(&self.x) && (0..MAP_SIZE).contains(&self.y)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LootItem {
    pub resource: ResourceId,
    pub amount: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatState {
    pub enemy: EnemyId,
    pub enemy_hp: u32,
    pub enemy_max_hp: u32,
    pub enemy_damage: u32,
    pub enemy_cooldown_ms: f64,
    pub enemy_timer_ms: f64,
    pub player_timer_ms: f64,
    /// Remaining time of the flee gauge; 0 when idle.
    pub flee_remaining_ms: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exploration {
    pub mode: ExplorationMode,
    pub phase: ExplorationPhase,
    pub position: Pos,
    pub start: Pos,
    pub visited: BTreeSet<Pos>,
    pub backpack: Vec<LootItem>,
    pub pending_loot: Vec<LootItem>,
    pub carried_weapon_id: Option<u32>,
    pub combat: Option<CombatState>,
    pub player_hp: u32,
    pub steps: u32,
    pub steps_since_encounter: u32,
}

impl Exploration {
    pub fn new() -> Self {
        Self {
            mode: ExplorationMode::Loadout,
            phase: ExplorationPhase::Moving,
            position: Pos::center(),
            start: Pos::center(),
            visited: BTreeSet::new(),
            backpack: Vec::new(),
            pending_loot: Vec::new(),
            carried_weapon_id: None,
            combat: None,
            player_hp: PLAYER_MAX_HP,
            steps: 0,
            steps_since_encounter: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.mode == ExplorationMode::Active
    }

    pub fn backpack_used(&self) -> u32 {
        self.backpack
            .iter()
            .fold(0u32, |used, item| used.saturating_add(item.amount))
    }
}

impl Default for Exploration {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodexEntry {
    pub encountered: bool,
    pub first_encountered_at: Option<u64>,
    pub defeat_count: u32,
}

// ── Root aggregate ────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub resources: Resources,
    pub buildings: BTreeMap<BuildingId, u32>,
    pub unlocks: BTreeMap<UnlockId, bool>,
    pub upgrades: BTreeMap<UpgradeId, bool>,
    /// Milliseconds into the current cycle, per process.
    pub production_progress: BTreeMap<ProductionKey, f64>,
    pub production_running: BTreeMap<ProductionKey, bool>,
    /// Remaining milliseconds; 0 means idle.
    pub action_progress: BTreeMap<GatherAction, f64>,
    pub craft_progress: BTreeMap<Recipe, f64>,
    pub log: Vec<String>,
    pub weapons: Vec<Weapon>,
    pub modules: BTreeMap<ModuleType, u32>,
    pub selected_weapon_id: Option<u32>,
    pub exploration: Exploration,
    pub enemy_codex: BTreeMap<EnemyId, CodexEntry>,
    /// Wall-clock ms of the last tick; 0 before the first one.
    pub last_update: u64,
    pub next_weapon_id: u32,
    pub active_tab: Tab,
}

pub const WELCOME_MESSAGE: &str = "You wake up in a scrapyard. Everything here is junk, for now.";

fn keyed_map<K: Keyed + Ord, V: Clone>(value: V) -> BTreeMap<K, V> {
    K::all().iter().map(|k| (*k, value.clone())).collect()
}

impl GameState {
    /// The documented initial state: every key present, everything empty.
    pub fn new() -> Self {
        Self {
            resources: keyed_map(0.0),
            buildings: keyed_map(0),
            unlocks: keyed_map(false),
            upgrades: keyed_map(false),
            production_progress: keyed_map(0.0),
            production_running: keyed_map(true),
            action_progress: keyed_map(0.0),
            craft_progress: keyed_map(0.0),
            log: vec![WELCOME_MESSAGE.to_string()],
            weapons: Vec::new(),
            modules: keyed_map(0),
            selected_weapon_id: None,
            exploration: Exploration::new(),
            enemy_codex: keyed_map(CodexEntry::default()),
            last_update: 0,
            next_weapon_id: 1,
            active_tab: Tab::Base,
        }
    }

    pub fn add_log(&mut self, text: &str) {
        self.log.push(text.to_string());
        if self.log.len() > MAX_LOG {
            let excess = self.log.len() - MAX_LOG;
            self.log.drain(..excess);
        }
    }

    pub fn building_count(&self, id: BuildingId) -> u32 {
        self.buildings.get(&id).copied().unwrap_or(0)
    }

    pub fn is_unlocked(&self, id: UnlockId) -> bool {
        self.unlocks.get(&id).copied().unwrap_or(false)
    }

    pub fn has_upgrade(&self, id: UpgradeId) -> bool {
        self.upgrades.get(&id).copied().unwrap_or(false)
    }

    pub fn module_count(&self, kind: ModuleType) -> u32 {
        self.modules.get(&kind).copied().unwrap_or(0)
    }

    pub fn weapon(&self, id: u32) -> Option<&Weapon> {
        self.weapons.iter().find(|w| w.id == id)
    }

    pub fn weapon_mut(&mut self, id: u32) -> Option<&mut Weapon> {
        self.weapons.iter_mut().find(|w| w.id == id)
    }

    /// Units of `kind` currently sitting in weapon slots.
    pub fn equipped_count(&self, kind: ModuleType) -> u32 {
        self.weapons
            .iter()
            .flat_map(|w| w.slots.iter())
            .filter(|slot| **slot == Some(kind))
            .count() as u32
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
