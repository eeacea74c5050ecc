//! Static game content: buildings, actions, recipes, upgrades, unlocks,
//! weapons, enemies and biomes.
//!
//! Everything here is a pure lookup keyed by id. The simulation reads these
//! tables and never mutates them.

use rand::Rng;

use super::requirements::{always, Requirement};
use super::state::{
    BuildingId, EnemyId, GatherAction, ModuleType, Pos, ProductionKey, Recipe, ResourceId,
    UnlockId, UpgradeId, WeaponType, MAP_SIZE,
};

/// Hard cap on the shovel stack.
pub const SHOVEL_CAP: u32 = 5;
/// Research gets 5% cheaper per workshop, up to 25%.
pub const RESEARCH_DISCOUNT_PER_WORKSHOP: f64 = 0.05;
pub const MAX_RESEARCH_DISCOUNT: f64 = 0.25;
/// Chance of a copper nugget per unit of iron smelted.
pub const SMELTER_COPPER_CHANCE: f64 = 0.12;

// ── Buildings ─────────────────────────────────────────────────

pub struct BuildingInfo {
    pub name: &'static str,
    pub base_cost: &'static [(ResourceId, f64)],
    pub requirement: Requirement,
}

pub fn building_info(id: BuildingId) -> BuildingInfo {
    match id {
        BuildingId::Collector => BuildingInfo {
            name: "Collector",
            base_cost: &[(ResourceId::Scrap, 12.0), (ResourceId::Wood, 4.0)],
            requirement: Requirement::Unlock {
                id: UnlockId::Construction,
                expected: true,
            },
        },
        BuildingId::Lumberyard => BuildingInfo {
            name: "Lumberyard",
            base_cost: &[(ResourceId::Scrap, 20.0), (ResourceId::Wood, 10.0)],
            requirement: Requirement::All(vec![
                Requirement::Unlock {
                    id: UnlockId::Construction,
                    expected: true,
                },
                Requirement::Building {
                    id: BuildingId::Collector,
                    at_least: 1,
                },
            ]),
        },
        BuildingId::Smelter => BuildingInfo {
            name: "Smelter",
            base_cost: &[(ResourceId::Scrap, 30.0), (ResourceId::Stone, 15.0)],
            requirement: Requirement::Unlock {
                id: UnlockId::Smelting,
                expected: true,
            },
        },
        BuildingId::Workshop => BuildingInfo {
            name: "Workshop",
            base_cost: &[
                (ResourceId::Wood, 20.0),
                (ResourceId::Stone, 10.0),
                (ResourceId::Iron, 10.0),
            ],
            requirement: Requirement::Unlock {
                id: UnlockId::Workshop,
                expected: true,
            },
        },
        BuildingId::Camp => BuildingInfo {
            name: "Camp",
            base_cost: &[(ResourceId::Scrap, 25.0), (ResourceId::Wood, 25.0)],
            requirement: Requirement::Unlock {
                id: UnlockId::Construction,
                expected: true,
            },
        },
    }
}

// ── Cyclic production ─────────────────────────────────────────

pub struct ProductionInfo {
    pub name: &'static str,
    pub cycle_ms: f64,
    pub output: ResourceId,
    /// Output per completed cycle per unit.
    pub per_cycle: f64,
    /// Consumed 1:1 per unit of output, capped by stock.
    pub input: Option<ResourceId>,
}

pub fn production_info(key: ProductionKey) -> ProductionInfo {
    match key {
        ProductionKey::Collector => ProductionInfo {
            name: "Collectors",
            cycle_ms: 10_000.0,
            output: ResourceId::Scrap,
            per_cycle: 1.0,
            input: None,
        },
        ProductionKey::Lumberyard => ProductionInfo {
            name: "Lumberyards",
            cycle_ms: 12_000.0,
            output: ResourceId::Wood,
            per_cycle: 1.0,
            input: None,
        },
        ProductionKey::Smelter => ProductionInfo {
            name: "Smelters",
            cycle_ms: 8_000.0,
            output: ResourceId::Iron,
            per_cycle: 1.0,
            input: Some(ResourceId::Scrap),
        },
        ProductionKey::Scavenger => ProductionInfo {
            name: "Scavengers",
            cycle_ms: 15_000.0,
            output: ResourceId::Scrap,
            per_cycle: 2.0,
            input: None,
        },
    }
}

// ── Gathering actions ─────────────────────────────────────────

pub struct ActionInfo {
    pub name: &'static str,
    pub duration_ms: f64,
    pub reward: ResourceId,
    pub base_amount: f64,
    /// Upgrade adding +1 to the reward.
    pub boosted_by: Option<UpgradeId>,
    pub requirement: Requirement,
}

pub fn action_info(action: GatherAction) -> ActionInfo {
    match action {
        GatherAction::Scavenge => ActionInfo {
            name: "Scavenge",
            duration_ms: 2_000.0,
            reward: ResourceId::Scrap,
            base_amount: 1.0,
            boosted_by: Some(UpgradeId::ReinforcedGloves),
            requirement: always(),
        },
        GatherAction::ChopWood => ActionInfo {
            name: "Chop wood",
            duration_ms: 3_000.0,
            reward: ResourceId::Wood,
            base_amount: 1.0,
            boosted_by: Some(UpgradeId::SharpAxe),
            requirement: Requirement::Unlock {
                id: UnlockId::Woodcutting,
                expected: true,
            },
        },
        GatherAction::DigStone => ActionInfo {
            name: "Dig stone",
            duration_ms: 4_000.0,
            reward: ResourceId::Stone,
            base_amount: 2.0,
            boosted_by: Some(UpgradeId::PneumaticDrill),
            requirement: Requirement::Any(vec![
                Requirement::Resource {
                    id: ResourceId::Shovel,
                    at_least: 1.0,
                },
                Requirement::Building {
                    id: BuildingId::Camp,
                    at_least: 1,
                },
            ]),
        },
    }
}

// ── Crafting ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CraftOutput {
    Weapon(WeaponType),
    CappedResource {
        resource: ResourceId,
        amount: u32,
        cap: u32,
    },
    RandomModule(&'static [ModuleType]),
}

pub struct RecipeInfo {
    pub name: &'static str,
    pub duration_ms: f64,
    pub cost: &'static [(ResourceId, f64)],
    pub outputs: &'static [CraftOutput],
    pub requirement: Requirement,
}

fn workshop(at_least: u32) -> Requirement {
    Requirement::Building {
        id: BuildingId::Workshop,
        at_least,
    }
}

pub fn recipe_info(recipe: Recipe) -> RecipeInfo {
    match recipe {
        Recipe::PipeGun => RecipeInfo {
            name: "Pipe gun",
            duration_ms: 10_000.0,
            cost: &[(ResourceId::Scrap, 20.0), (ResourceId::Iron, 5.0)],
            outputs: &[CraftOutput::Weapon(WeaponType::Pipe)],
            requirement: workshop(1),
        },
        Recipe::Crossbow => RecipeInfo {
            name: "Crossbow",
            duration_ms: 20_000.0,
            cost: &[(ResourceId::Wood, 30.0), (ResourceId::Iron, 10.0)],
            outputs: &[CraftOutput::Weapon(WeaponType::Crossbow)],
            requirement: workshop(1),
        },
        Recipe::Rifle => RecipeInfo {
            name: "Rifle",
            duration_ms: 45_000.0,
            cost: &[(ResourceId::Iron, 30.0), (ResourceId::Copper, 5.0)],
            outputs: &[CraftOutput::Weapon(WeaponType::Rifle)],
            requirement: workshop(2),
        },
        Recipe::Shovel => RecipeInfo {
            name: "Shovel",
            duration_ms: 8_000.0,
            cost: &[(ResourceId::Wood, 5.0), (ResourceId::Iron, 2.0)],
            outputs: &[CraftOutput::CappedResource {
                resource: ResourceId::Shovel,
                amount: 1,
                cap: SHOVEL_CAP,
            }],
            requirement: workshop(1),
        },
        Recipe::ModuleKit => RecipeInfo {
            name: "Module kit",
            duration_ms: 15_000.0,
            cost: &[(ResourceId::Iron, 8.0), (ResourceId::Copper, 2.0)],
            outputs: &[CraftOutput::RandomModule(&[
                ModuleType::Damage,
                ModuleType::Cooldown,
                ModuleType::Amplifier,
            ])],
            requirement: workshop(1),
        },
        Recipe::SurvivalKit => RecipeInfo {
            name: "Survival kit",
            duration_ms: 25_000.0,
            cost: &[
                (ResourceId::Wood, 10.0),
                (ResourceId::Iron, 12.0),
                (ResourceId::Copper, 3.0),
            ],
            outputs: &[
                CraftOutput::CappedResource {
                    resource: ResourceId::Shovel,
                    amount: 1,
                    cap: SHOVEL_CAP,
                },
                CraftOutput::RandomModule(&[ModuleType::Damage, ModuleType::Cooldown]),
            ],
            requirement: workshop(1),
        },
    }
}

// ── Upgrades ──────────────────────────────────────────────────

pub struct UpgradeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub base_cost: &'static [(ResourceId, f64)],
    pub requirement: Requirement,
}

pub fn upgrade_info(id: UpgradeId) -> UpgradeInfo {
    match id {
        UpgradeId::ReinforcedGloves => UpgradeInfo {
            name: "Reinforced gloves",
            description: "Scavenging yields +1 scrap",
            base_cost: &[(ResourceId::Scrap, 30.0), (ResourceId::Wood, 10.0)],
            requirement: Requirement::Unlock {
                id: UnlockId::Construction,
                expected: true,
            },
        },
        UpgradeId::SharpAxe => UpgradeInfo {
            name: "Sharp axe",
            description: "Chopping yields +1 wood",
            base_cost: &[(ResourceId::Wood, 25.0), (ResourceId::Iron, 5.0)],
            requirement: Requirement::Building {
                id: BuildingId::Lumberyard,
                at_least: 1,
            },
        },
        UpgradeId::PneumaticDrill => UpgradeInfo {
            name: "Pneumatic drill",
            description: "Digging yields +1 stone",
            base_cost: &[(ResourceId::Iron, 20.0), (ResourceId::Copper, 4.0)],
            requirement: workshop(1),
        },
        UpgradeId::Rucksack => UpgradeInfo {
            name: "Rucksack",
            description: "Backpack holds 10 more items",
            base_cost: &[(ResourceId::Wood, 40.0), (ResourceId::Iron, 15.0)],
            requirement: Requirement::Unlock {
                id: UnlockId::Expeditions,
                expected: true,
            },
        },
    }
}

// ── Unlocks ───────────────────────────────────────────────────

pub struct UnlockInfo {
    pub name: &'static str,
    /// Cost-like threshold: unlocked once the ledger could "afford" it.
    pub condition: &'static [(ResourceId, f64)],
    pub message: &'static str,
}

pub fn unlock_info(id: UnlockId) -> UnlockInfo {
    match id {
        UnlockId::Woodcutting => UnlockInfo {
            name: "Woodcutting",
            condition: &[(ResourceId::Scrap, 5.0)],
            message: "You fashion a crude blade from scrap. Woodcutting unlocked.",
        },
        UnlockId::Construction => UnlockInfo {
            name: "Construction",
            condition: &[(ResourceId::Scrap, 15.0), (ResourceId::Wood, 5.0)],
            message: "Enough material to build something. Construction unlocked.",
        },
        UnlockId::Smelting => UnlockInfo {
            name: "Smelting",
            condition: &[(ResourceId::Stone, 5.0)],
            message: "Stone could hold a furnace's heat. Smelting unlocked.",
        },
        UnlockId::Workshop => UnlockInfo {
            name: "Workshop",
            condition: &[(ResourceId::Iron, 5.0)],
            message: "Iron bars gleam in the pile. The workshop is within reach.",
        },
        UnlockId::Expeditions => UnlockInfo {
            name: "Expeditions",
            condition: &[(ResourceId::Iron, 20.0)],
            message: "The wastes beyond the fence call. Expeditions unlocked.",
        },
    }
}

// ── Weapons ───────────────────────────────────────────────────

pub struct WeaponInfo {
    pub name: &'static str,
    pub damage: u32,
    pub cooldown_ms: f64,
    /// Slot indices able to hold a module.
    pub active_slots: &'static [usize],
}

pub fn weapon_info(kind: WeaponType) -> WeaponInfo {
    match kind {
        WeaponType::Pipe => WeaponInfo {
            name: "Pipe gun",
            damage: 3,
            cooldown_ms: 2_000.0,
            active_slots: &[0, 1],
        },
        WeaponType::Crossbow => WeaponInfo {
            name: "Crossbow",
            damage: 5,
            cooldown_ms: 3_000.0,
            active_slots: &[0, 1, 2],
        },
        WeaponType::Rifle => WeaponInfo {
            name: "Rifle",
            damage: 8,
            cooldown_ms: 2_500.0,
            active_slots: &[0, 1, 2, 3, 4, 5],
        },
    }
}

pub const UNARMED_DAMAGE: u32 = 1;
pub const UNARMED_COOLDOWN_MS: f64 = 1_500.0;

// ── Enemies ───────────────────────────────────────────────────

pub struct DropInfo {
    pub resource: ResourceId,
    pub chance: f64,
    pub min: u32,
    pub max: u32,
}

pub struct EnemyInfo {
    pub name: &'static str,
    pub max_hp: u32,
    pub damage: u32,
    pub cooldown_ms: f64,
    pub drops: &'static [DropInfo],
}

pub fn enemy_info(id: EnemyId) -> EnemyInfo {
    match id {
        EnemyId::Rat => EnemyInfo {
            name: "Mutant rat",
            max_hp: 8,
            damage: 1,
            cooldown_ms: 2_000.0,
            drops: &[
                DropInfo {
                    resource: ResourceId::Scrap,
                    chance: 0.8,
                    min: 1,
                    max: 3,
                },
                DropInfo {
                    resource: ResourceId::Copper,
                    chance: 0.1,
                    min: 1,
                    max: 1,
                },
            ],
        },
        EnemyId::Raider => EnemyInfo {
            name: "Raider",
            max_hp: 20,
            damage: 3,
            cooldown_ms: 2_500.0,
            drops: &[
                DropInfo {
                    resource: ResourceId::Scrap,
                    chance: 1.0,
                    min: 3,
                    max: 6,
                },
                DropInfo {
                    resource: ResourceId::Iron,
                    chance: 0.5,
                    min: 1,
                    max: 3,
                },
            ],
        },
        EnemyId::Drone => EnemyInfo {
            name: "Rogue drone",
            max_hp: 14,
            damage: 2,
            cooldown_ms: 1_200.0,
            drops: &[
                DropInfo {
                    resource: ResourceId::Copper,
                    chance: 0.6,
                    min: 1,
                    max: 2,
                },
                DropInfo {
                    resource: ResourceId::Iron,
                    chance: 0.3,
                    min: 1,
                    max: 2,
                },
            ],
        },
    }
}

/// Every encounter spawns this enemy for now.
pub const DEFAULT_ENEMY: EnemyId = EnemyId::Rat;

// ── Biomes ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Biome {
    Scrapfield,
    Ruins,
    Wastes,
}

pub struct BiomeInfo {
    pub name: &'static str,
    /// Weighted encounter pool.
    pub encounters: &'static [(EnemyId, u32)],
}

pub fn biome_info(biome: Biome) -> BiomeInfo {
    match biome {
        Biome::Scrapfield => BiomeInfo {
            name: "Scrapfield",
            encounters: &[(EnemyId::Rat, 1)],
        },
        Biome::Ruins => BiomeInfo {
            name: "Ruins",
            encounters: &[(EnemyId::Rat, 3), (EnemyId::Raider, 2)],
        },
        Biome::Wastes => BiomeInfo {
            name: "Wastes",
            encounters: &[(EnemyId::Raider, 2), (EnemyId::Drone, 3)],
        },
    }
}

/// Rings around the map center: scrapfield, then ruins, then open wastes.
pub fn biome_at(pos: Pos) -> Biome {
    let center = Pos::center();
    let ring = (pos.x - center.x).abs().max((pos.y - center.y).abs());
    if ring <= 3 {
        Biome::Scrapfield
    } else if ring <= MAP_SIZE / 3 {
        Biome::Ruins
    } else {
        Biome::Wastes
    }
}

/// Weighted pick from a biome's encounter pool.
///
/// Expeditions do not roll from the pools; every encounter is `DEFAULT_ENEMY`.
pub fn pick_encounter<R: Rng + ?Sized>(biome: Biome, rng: &mut R) -> EnemyId {
    let pool = biome_info(biome).encounters;
    let total: u32 = pool.iter().map(|(_, w)| *w).sum();
    if total == 0 {
        return DEFAULT_ENEMY;
    }
    let mut roll = rng.gen_range(0..total);
    for (enemy, weight) in pool {
        if roll < *weight {
            return *enemy;
        }
        roll -= weight;
    }
    DEFAULT_ENEMY
}
