//! Save/load for Wasteland Idle.
//!
//! ## Versioning
//!
//! - `SAVE_VERSION`: current snapshot format. Bump when fields are added.
//! - `MIN_COMPATIBLE_VERSION`: oldest snapshot the normalizer still accepts.
//!   Only raise it for breaking changes; additive changes keep old saves.
//!
//! The snapshot is the camelCase JSON form of `GameState` plus a `version`
//! tag. Loading never trusts it: `normalize` rebuilds a `GameState` field by
//! field from an untyped `serde_json::Value`, defaulting anything absent,
//! mistyped or out of range.
//!
//! ## v3 changes
//! - `scavengerHut` building folded into `camp` (old count kept as a floor)
//! - module slots hold typed keys; v1 free-form strings (`dmg+1`, `cd_small`,
//!   `amp`) are mapped by prefix

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use super::combat::{carried_stats, MIN_COOLDOWN_MS};
use super::content::{action_info, enemy_info, production_info, recipe_info, SHOVEL_CAP};
use super::exploration::{BACKPACK_CAPACITY, FLEE_DURATION_MS, RUCKSACK_BONUS};
use super::ledger::Resources;
use super::modules::is_active_slot;
use super::state::{
    BuildingId, CodexEntry, CombatState, EnemyId, Exploration, ExplorationMode, ExplorationPhase,
    GameState, GatherAction, Keyed, LootItem, ModuleType, Pos, ProductionKey, Recipe, ResourceId,
    Tab, UpgradeId, Weapon, WeaponType, MAX_LOG, PLAYER_MAX_HP, SLOT_COUNT,
};

pub const SAVE_VERSION: u32 = 3;
pub const MIN_COMPATIBLE_VERSION: u32 = 1;
pub const STORAGE_KEY: &str = "wasteland_idle_save_v3";
/// Periodic save interval in ms.
pub const AUTOSAVE_INTERVAL_MS: u64 = 30_000;
pub const MAX_WEAPONS: usize = 64;
/// Entries kept per loot list (backpack or pending drops).
pub const MAX_LOOT_ENTRIES: usize = 16;
/// Highest id a loaded weapon may carry; leaves room for `nextWeaponId`.
const MAX_WEAPON_ID: u32 = u32::MAX - 1;

const LEGACY_CAMP_KEY: &str = "scavengerHut";

// ── Snapshot ──────────────────────────────────────────────────

pub fn snapshot(state: &GameState) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(state)?;
    if let Value::Object(map) = &mut value {
        map.insert("version".to_string(), Value::from(SAVE_VERSION));
    }
    Ok(value)
}

pub fn snapshot_string(state: &GameState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&snapshot(state)?)
}

/// Parse a stored snapshot. Invalid JSON means "no save".
pub fn parse_save(json: &str) -> Option<GameState> {
    let value: Value = serde_json::from_str(json).ok()?;
    Some(normalize(&value))
}

// ── Field readers ─────────────────────────────────────────────

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn non_negative(value: Option<&Value>, default: f64) -> f64 {
    number(value).map(|v| v.max(0.0)).unwrap_or(default)
}

fn count(value: Option<&Value>, default: u32) -> u32 {
    number(value)
        .map(|v| v.max(0.0).floor().min(u32::MAX as f64) as u32)
        .unwrap_or(default)
}

fn flag(value: Option<&Value>, default: bool) -> bool {
    value.and_then(Value::as_bool).unwrap_or(default)
}

fn object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

fn keyed<T: Keyed>(value: Option<&Value>) -> Option<T> {
    value.and_then(Value::as_str).and_then(T::from_key)
}

/// One entry per key of `K`, read with `read` from the matching field.
fn keyed_map<K, V>(
    value: Option<&Value>,
    defaults: &BTreeMap<K, V>,
    read: impl Fn(Option<&Value>, &V) -> V,
) -> BTreeMap<K, V>
where
    K: Keyed + Ord,
    V: Clone,
{
    let fields = object(value);
    defaults
        .iter()
        .map(|(k, default)| {
            let field = fields.and_then(|m| m.get(k.key()));
            (*k, read(field, default))
        })
        .collect()
}

/// Maps v1 free-form module strings onto the closed module enum.
fn legacy_module(raw: &str) -> Option<ModuleType> {
    if let Some(kind) = ModuleType::from_key(raw) {
        return Some(kind);
    }
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("dmg") || lower.starts_with("damage") {
        Some(ModuleType::Damage)
    } else if lower.starts_with("cool") || lower.starts_with("cd") {
        Some(ModuleType::Cooldown)
    } else if lower.starts_with("amp") {
        Some(ModuleType::Amplifier)
    } else {
        None
    }
}

fn module_in_slot(value: &Value) -> Option<ModuleType> {
    match value {
        Value::String(raw) => legacy_module(raw),
        Value::Object(map) => map.get("type").and_then(Value::as_str).and_then(legacy_module),
        _ => None,
    }
}

fn position(value: Option<&Value>) -> Option<Pos> {
    let pos = match value? {
        Value::Object(map) => {
            let x = number(map.get("x"))?;
            let y = number(map.get("y"))?;
            if x.fract() != 0.0 || y.fract() != 0.0 {
                return None;
            }
            Pos::new(x as i32, y as i32)
        }
        // v1 stored visited tiles as "x,y"
        Value::String(raw) => {
            let (x, y) = raw.split_once(',')?;
            Pos::new(x.trim().parse().ok()?, y.trim().parse().ok()?)
        }
        _ => return None,
    };
    pos.in_bounds().then_some(pos)
}

/// Reads loot entries until their amounts add up to `budget`; whatever does
/// not fit is dropped.
fn loot_list(value: Option<&Value>, budget: u32) -> Vec<LootItem> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut out: Vec<LootItem> = Vec::new();
    let mut total = 0u32;
    for item in items {
        if out.len() >= MAX_LOOT_ENTRIES || total >= budget {
            break;
        }
        let Some(map) = item.as_object() else {
            continue;
        };
        let Some(resource) = keyed::<ResourceId>(map.get("resource")) else {
            continue;
        };
        let amount = count(map.get("amount"), 0).min(budget - total);
        if amount > 0 {
            total += amount;
            out.push(LootItem { resource, amount });
        }
    }
    out
}

/// Wraps a saved swing timer back into `[0, cooldown)`.
fn swing_timer(value: Option<&Value>, cooldown: f64) -> f64 {
    let timer = non_negative(value, 0.0);
    if timer >= cooldown {
        timer % cooldown
    } else {
        timer
    }
}

// ── Normalizer ────────────────────────────────────────────────

/// Rebuild a consistent `GameState` from any JSON value.
///
/// `{}`, `null` and non-objects give the initial state; a snapshot of a
/// valid state gives back an equal state.
pub fn normalize(value: &Value) -> GameState {
    let initial = GameState::new();
    let Some(root) = value.as_object() else {
        return initial;
    };

    let mut resources: Resources = keyed_map(root.get("resources"), &initial.resources, |v, d| {
        non_negative(v, *d)
    });
    if let Some(shovels) = resources.get_mut(&ResourceId::Shovel) {
        *shovels = shovels.floor().min(SHOVEL_CAP as f64);
    }

    let mut buildings = keyed_map(root.get("buildings"), &initial.buildings, |v, d| count(v, *d));
    let legacy_camp = count(
        object(root.get("buildings")).and_then(|m| m.get(LEGACY_CAMP_KEY)),
        0,
    );
    if let Some(camp) = buildings.get_mut(&BuildingId::Camp) {
        *camp = (*camp).max(legacy_camp);
    }

    let unlocks = keyed_map(root.get("unlocks"), &initial.unlocks, |v, d| flag(v, *d));
    let upgrades = keyed_map(root.get("upgrades"), &initial.upgrades, |v, d| flag(v, *d));

    let production_progress: BTreeMap<ProductionKey, f64> = keyed_map(
        root.get("productionProgress"),
        &initial.production_progress,
        |v, d| non_negative(v, *d),
    )
    .into_iter()
    .map(|(key, progress)| {
        let cycle = production_info(key).cycle_ms;
        (key, if progress >= cycle { progress % cycle } else { progress })
    })
    .collect();
    let production_running = keyed_map(
        root.get("productionRunning"),
        &initial.production_running,
        |v, d| flag(v, *d),
    );
    let action_progress: BTreeMap<GatherAction, f64> = keyed_map(
        root.get("actionProgress"),
        &initial.action_progress,
        |v, d| non_negative(v, *d),
    )
    .into_iter()
    .map(|(key, left)| (key, left.min(action_info(key).duration_ms)))
    .collect();
    let craft_progress: BTreeMap<Recipe, f64> = keyed_map(
        root.get("craftProgress"),
        &initial.craft_progress,
        |v, d| non_negative(v, *d),
    )
    .into_iter()
    .map(|(key, left)| (key, left.min(recipe_info(key).duration_ms)))
    .collect();

    let log = match root.get("log").and_then(Value::as_array) {
        Some(lines) => {
            let lines: Vec<String> = lines
                .iter()
                .filter_map(|l| l.as_str().map(str::to_string))
                .collect();
            let skip = lines.len().saturating_sub(MAX_LOG);
            lines.into_iter().skip(skip).collect()
        }
        None => initial.log.clone(),
    };

    let mut modules = keyed_map(root.get("modules"), &initial.modules, |v, d| count(v, *d));
    let weapons = normalize_weapons(root.get("weapons"), &mut modules);

    let max_id = weapons.iter().map(|w| w.id).max().unwrap_or(0);
    let next_weapon_id = count(root.get("nextWeaponId"), 1).max(max_id.saturating_add(1)).max(1);
    let selected_weapon_id = number(root.get("selectedWeaponId"))
        .map(|v| v as u32)
        .filter(|id| weapons.iter().any(|w| w.id == *id));

    let enemy_codex = keyed_map(root.get("enemyCodex"), &initial.enemy_codex, |v, d| {
        normalize_codex(v, d)
    });

    let pack_capacity = if upgrades.get(&UpgradeId::Rucksack).copied().unwrap_or(false) {
        BACKPACK_CAPACITY + RUCKSACK_BONUS
    } else {
        BACKPACK_CAPACITY
    };
    let exploration = normalize_exploration(root.get("exploration"), &weapons, pack_capacity);
    let last_update = number(root.get("lastUpdate"))
        .map(|v| v.max(0.0).floor() as u64)
        .unwrap_or(0);
    let active_tab = keyed::<Tab>(root.get("activeTab")).unwrap_or(initial.active_tab);

    GameState {
        resources,
        buildings,
        unlocks,
        upgrades,
        production_progress,
        production_running,
        action_progress,
        craft_progress,
        log,
        weapons,
        modules,
        selected_weapon_id,
        exploration,
        enemy_codex,
        last_update,
        next_weapon_id,
        active_tab,
    }
}

/// Drops malformed and duplicate weapons. Modules found in inactive slots go
/// back to the inventory.
fn normalize_weapons(
    value: Option<&Value>,
    modules: &mut BTreeMap<ModuleType, u32>,
) -> Vec<Weapon> {
    let Some(list) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    let mut weapons = Vec::new();
    for entry in list {
        if weapons.len() >= MAX_WEAPONS {
            break;
        }
        let Some(map) = entry.as_object() else {
            continue;
        };
        let Some(kind) = keyed::<WeaponType>(map.get("type")) else {
            continue;
        };
        let Some(id) = number(map.get("id"))
            .filter(|v| *v >= 1.0 && *v <= MAX_WEAPON_ID as f64 && v.fract() == 0.0)
        else {
            continue;
        };
        let id = id as u32;
        if !seen.insert(id) {
            continue;
        }

        let mut weapon = Weapon::new(id, kind);
        if let Some(slots) = map.get("slots").and_then(Value::as_array) {
            for (i, raw) in slots.iter().take(SLOT_COUNT).enumerate() {
                let Some(module) = module_in_slot(raw) else {
                    continue;
                };
                if is_active_slot(kind, i) {
                    weapon.slots[i] = Some(module);
                } else {
                    *modules.entry(module).or_insert(0) += 1;
                }
            }
        }
        weapons.push(weapon);
    }
    if weapons.len() < list.len() {
        log::debug!("dropped {} weapon entries on load", list.len() - weapons.len());
    }
    weapons
}

fn normalize_codex(value: Option<&Value>, default: &CodexEntry) -> CodexEntry {
    let Some(map) = object(value) else {
        return default.clone();
    };
    let first_encountered_at = number(map.get("firstEncounteredAt")).map(|v| v.max(0.0) as u64);
    CodexEntry {
        encountered: flag(map.get("encountered"), false) || first_encountered_at.is_some(),
        first_encountered_at,
        defeat_count: count(map.get("defeatCount"), 0),
    }
}

/// `player_cooldown` is the swing time of whatever the player carries.
fn normalize_combat(value: Option<&Value>, player_cooldown: f64) -> Option<CombatState> {
    let map = object(value)?;
    let enemy = keyed::<EnemyId>(map.get("enemy"))?;
    let info = enemy_info(enemy);
    let enemy_max_hp = count(map.get("enemyMaxHp"), info.max_hp).max(1);
    let enemy_hp = count(map.get("enemyHp"), enemy_max_hp).min(enemy_max_hp);
    if enemy_hp == 0 {
        return None;
    }
    let cooldown = number(map.get("enemyCooldownMs"))
        .filter(|v| *v > 0.0)
        .unwrap_or(info.cooldown_ms)
        .max(MIN_COOLDOWN_MS);
    Some(CombatState {
        enemy,
        enemy_hp,
        enemy_max_hp,
        enemy_damage: count(map.get("enemyDamage"), info.damage).max(1),
        enemy_cooldown_ms: cooldown,
        enemy_timer_ms: swing_timer(map.get("enemyTimerMs"), cooldown),
        player_timer_ms: swing_timer(map.get("playerTimerMs"), player_cooldown),
        flee_remaining_ms: non_negative(map.get("fleeRemainingMs"), 0.0).min(FLEE_DURATION_MS),
    })
}

fn normalize_exploration(
    value: Option<&Value>,
    weapons: &[Weapon],
    pack_capacity: u32,
) -> Exploration {
    let Some(map) = object(value) else {
        return Exploration::new();
    };
    if keyed::<ExplorationMode>(map.get("mode")) != Some(ExplorationMode::Active) {
        return Exploration::new();
    }

    let start = position(map.get("start")).unwrap_or_else(Pos::center);
    let position_now = position(map.get("position")).unwrap_or(start);
    let mut visited: BTreeSet<Pos> = map
        .get("visited")
        .and_then(Value::as_array)
        .map(|tiles| tiles.iter().filter_map(|t| position(Some(t))).collect())
        .unwrap_or_default();
    visited.insert(start);
    visited.insert(position_now);

    let carried_weapon_id = number(map.get("carriedWeaponId"))
        .map(|v| v as u32)
        .filter(|id| weapons.iter().any(|w| w.id == *id));
    let carried = carried_weapon_id.and_then(|id| weapons.iter().find(|w| w.id == id));

    let mut phase = keyed::<ExplorationPhase>(map.get("phase")).unwrap_or(ExplorationPhase::Moving);
    let combat = if phase == ExplorationPhase::Combat {
        normalize_combat(map.get("combat"), carried_stats(carried).cooldown_ms)
    } else {
        None
    };
    if phase == ExplorationPhase::Combat && combat.is_none() {
        phase = ExplorationPhase::Moving;
    }
    let pending_loot = if phase == ExplorationPhase::Loot {
        loot_list(map.get("pendingLoot"), BACKPACK_CAPACITY + RUCKSACK_BONUS)
    } else {
        Vec::new()
    };

    Exploration {
        mode: ExplorationMode::Active,
        phase,
        position: position_now,
        start,
        visited,
        backpack: loot_list(map.get("backpack"), pack_capacity),
        pending_loot,
        carried_weapon_id,
        combat,
        player_hp: count(map.get("playerHp"), PLAYER_MAX_HP).clamp(1, PLAYER_MAX_HP),
        steps: count(map.get("steps"), 0),
        steps_since_encounter: count(map.get("stepsSinceEncounter"), 0),
    }
}

fn snapshot_version(json: &str) -> Option<u32> {
    let value: Value = serde_json::from_str(json).ok()?;
    Some(count(value.get("version"), 1))
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for key `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("could not serialize save: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key/value store in the shape of browser `localStorage`.
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        // write-then-rename so a crash never leaves half a save behind
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, self.path_for(key)).map_err(io_err)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StorageError::Io {
                key: key.to_string(),
                source: e,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

pub fn save_game<S: Storage + ?Sized>(
    storage: &mut S,
    state: &GameState,
) -> Result<(), StorageError> {
    let json = snapshot_string(state)?;
    storage.set_item(STORAGE_KEY, &json)?;
    log::debug!("saved {} bytes under {}", json.len(), STORAGE_KEY);
    Ok(())
}

/// `Ok(None)` when there is no usable save. Unreadable or too-old data is
/// discarded.
pub fn load_game<S: Storage + ?Sized>(storage: &mut S) -> Result<Option<GameState>, StorageError> {
    let Some(json) = storage.get_item(STORAGE_KEY)? else {
        return Ok(None);
    };
    let Some(version) = snapshot_version(&json) else {
        log::warn!("save data under {} is not valid JSON, discarding", STORAGE_KEY);
        storage.remove_item(STORAGE_KEY)?;
        return Ok(None);
    };
    if version < MIN_COMPATIBLE_VERSION {
        log::info!(
            "save version too old (saved={}, min_compatible={}), starting fresh",
            version,
            MIN_COMPATIBLE_VERSION
        );
        storage.remove_item(STORAGE_KEY)?;
        return Ok(None);
    }
    if version < SAVE_VERSION {
        log::info!(
            "migrating save (saved={}, current={})",
            version,
            SAVE_VERSION
        );
    }
    Ok(parse_save(&json))
}

pub fn delete_save<S: Storage + ?Sized>(storage: &mut S) -> Result<(), StorageError> {
    storage.remove_item(STORAGE_KEY)
}

/// Tracks when the next periodic save is due.
#[derive(Debug, Clone)]
pub struct Autosave {
    interval_ms: u64,
    last_save: Option<u64>,
}

impl Autosave {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_save: None,
        }
    }

    /// The first call is always due.
    pub fn due(&self, now: u64) -> bool {
        match self.last_save {
            Some(last) => now.saturating_sub(last) >= self.interval_ms,
            None => true,
        }
    }

    pub fn mark(&mut self, now: u64) {
        self.last_save = Some(now);
    }
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new(AUTOSAVE_INTERVAL_MS)
    }
}
