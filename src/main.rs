//! Headless terminal driver for Wasteland Idle.
//!
//! Every invocation loads the save, catches up on the time that passed since
//! the last run, applies at most one command, prints the state and saves.
//!
//! ```bash
//! wasteland-idle gather scavenge
//! wasteland-idle build collector
//! wasteland-idle simulate --minutes 30
//! RUST_LOG=debug wasteland-idle status
//! ```

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use wasteland_idle::game::combat::{player_stats, weapon_stats};
use wasteland_idle::game::content::{
    action_info, building_info, enemy_info, production_info, recipe_info, upgrade_info,
    weapon_info,
};
use wasteland_idle::game::exploration::backpack_capacity;
use wasteland_idle::game::ledger::{amount, format_amount};
use wasteland_idle::game::production::{is_running, production_units};
use wasteland_idle::game::save::{delete_save, load_game, FileStorage};
use wasteland_idle::game::state::{
    BuildingId, ExplorationPhase, GameState, GatherAction, Keyed, ModuleType, ProductionKey,
    Recipe, ResourceId, UpgradeId,
};
use wasteland_idle::game::tick::{smoothed_action, smoothed_craft, smoothed_production};
use wasteland_idle::game::{Command, WastelandGame};
use wasteland_idle::time::{Clock, FixedStep, SystemClock};

#[derive(Debug, Parser)]
#[command(name = "wasteland-idle")]
#[command(about = "Scrapyard idle game, one command per run")]
#[command(version)]
struct Cli {
    /// Directory holding the save file
    #[arg(long, default_value = ".wasteland")]
    save_dir: PathBuf,

    /// Seed for this run's random stream (defaults to the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Log lines to print after the command
    #[arg(long, default_value_t = 8)]
    log_lines: usize,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Show resources, buildings, timers and the recent log
    Status,
    /// Fast-forward the simulation in fixed steps
    Simulate {
        #[arg(long, default_value_t = 10)]
        minutes: u64,
        #[arg(long, default_value_t = 1_000)]
        step_ms: u64,
    },
    /// Start a gathering action (scavenge, chopWood, digStone)
    Gather {
        #[arg(value_parser = parse_key::<GatherAction>)]
        action: GatherAction,
    },
    /// Build one more of a building
    Build {
        #[arg(value_parser = parse_key::<BuildingId>)]
        building: BuildingId,
    },
    /// Research an upgrade
    Research {
        #[arg(value_parser = parse_key::<UpgradeId>)]
        upgrade: UpgradeId,
    },
    /// Start crafting a recipe
    Craft {
        #[arg(value_parser = parse_key::<Recipe>)]
        recipe: Recipe,
    },
    /// Pause or resume a production process
    Toggle {
        #[arg(value_parser = parse_key::<ProductionKey>)]
        process: ProductionKey,
    },
    /// Select the weapon to take on expeditions
    Select { weapon: u32 },
    /// Fit a module from the inventory (slots count from 1)
    Equip {
        weapon: u32,
        slot: usize,
        #[arg(value_parser = parse_key::<ModuleType>)]
        module: ModuleType,
    },
    /// Take a module out of a slot
    Unequip { weapon: u32, slot: usize },
    /// Move a fitted module to another slot
    MoveModule {
        from_weapon: u32,
        from_slot: usize,
        to_weapon: u32,
        to_slot: usize,
    },
    /// Head out on an expedition
    Embark {
        /// Go without a weapon
        #[arg(long)]
        unarmed: bool,
    },
    /// Walk across the map
    Step {
        #[arg(value_enum)]
        direction: Direction,
        #[arg(long, default_value_t = 1)]
        times: u32,
    },
    /// Pick up an offered loot item (counts from 1)
    Take { index: usize },
    /// Leave remaining loot and keep moving
    Continue,
    /// Return to base from the start tile
    Return,
    /// Try to escape the current fight
    Flee,
    /// Delete the save and start over
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    #[value(alias = "n")]
    North,
    #[value(alias = "s")]
    South,
    #[value(alias = "e")]
    East,
    #[value(alias = "w")]
    West,
}

impl Direction {
    fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

fn parse_key<T: Keyed>(raw: &str) -> Result<T, String> {
    T::from_key(raw).ok_or_else(|| {
        let keys: Vec<&str> = T::all().iter().map(|k| k.key()).collect();
        format!("unknown key `{}` (expected one of: {})", raw, keys.join(", "))
    })
}

/// CLI numbers slots and loot from 1.
fn one_based(n: usize, what: &str) -> Result<usize> {
    ensure!(n >= 1, "{} are numbered from 1", what);
    Ok(n - 1)
}

fn to_command(cmd: &Cmd) -> Result<Option<Command>> {
    let command = match *cmd {
        Cmd::Status | Cmd::Simulate { .. } | Cmd::Reset | Cmd::Step { .. } => return Ok(None),
        Cmd::Gather { action } => Command::Gather(action),
        Cmd::Build { building } => Command::Build(building),
        Cmd::Research { upgrade } => Command::Research(upgrade),
        Cmd::Craft { recipe } => Command::Craft(recipe),
        Cmd::Toggle { process } => Command::ToggleProduction(process),
        Cmd::Select { weapon } => Command::SelectWeapon(weapon),
        Cmd::Equip {
            weapon,
            slot,
            module,
        } => Command::Equip {
            weapon,
            slot: one_based(slot, "slots")?,
            module,
        },
        Cmd::Unequip { weapon, slot } => Command::Unequip {
            weapon,
            slot: one_based(slot, "slots")?,
        },
        Cmd::MoveModule {
            from_weapon,
            from_slot,
            to_weapon,
            to_slot,
        } => Command::MoveModule {
            from_weapon,
            from_slot: one_based(from_slot, "slots")?,
            to_weapon,
            to_slot: one_based(to_slot, "slots")?,
        },
        Cmd::Embark { unarmed } => Command::Embark {
            allow_unarmed: unarmed,
        },
        Cmd::Take { index } => Command::TakeLoot(one_based(index, "loot items")?),
        Cmd::Continue => Command::ContinueExploring,
        Cmd::Return => Command::ReturnToBase,
        Cmd::Flee => Command::Flee,
    };
    Ok(Some(command))
}

fn simulate(game: &mut WastelandGame, minutes: u64, step_ms: u64) {
    let mut stepper = FixedStep::new(step_ms);
    let steps = stepper.feed(minutes.saturating_mul(60_000));
    for _ in 0..steps {
        game.advance_by(stepper.step_ms() as f64);
    }
    game.advance_by(stepper.remainder() as f64);
    log::info!("simulated {} min in {} steps", minutes, steps);
}

fn print_status(state: &GameState, now: u64) {
    println!("== Resources ==");
    for id in ResourceId::all() {
        println!("  {:<8} {}", id.name(), format_amount(amount(&state.resources, *id)));
    }

    println!("== Buildings ==");
    for id in BuildingId::all() {
        let count = state.building_count(*id);
        if count > 0 {
            println!("  {:<12} {}", building_info(*id).name, count);
        }
    }

    println!("== Production ==");
    for key in ProductionKey::all() {
        if production_units(state, *key) == 0 {
            continue;
        }
        let status = if is_running(state, *key) { "" } else { " (paused)" };
        println!(
            "  {:<12} {:>3.0}%{}",
            production_info(*key).name,
            smoothed_production(state, *key, now) * 100.0,
            status
        );
    }

    for action in GatherAction::all() {
        let fraction = smoothed_action(state, *action, now);
        if fraction > 0.0 {
            println!("  {:<12} {:>3.0}%", action_info(*action).name, fraction * 100.0);
        }
    }
    for recipe in Recipe::all() {
        let fraction = smoothed_craft(state, *recipe, now);
        if fraction > 0.0 {
            println!("  {:<12} {:>3.0}%", recipe_info(*recipe).name, fraction * 100.0);
        }
    }

    let researched: Vec<&str> = UpgradeId::all()
        .iter()
        .filter(|u| state.has_upgrade(**u))
        .map(|u| upgrade_info(*u).name)
        .collect();
    if !researched.is_empty() {
        println!("== Research ==\n  {}", researched.join(", "));
    }

    if !state.weapons.is_empty() {
        println!("== Weapons ==");
        for w in &state.weapons {
            let stats = weapon_stats(w);
            let marker = if state.selected_weapon_id == Some(w.id) { "*" } else { " " };
            let slots: Vec<&str> = w
                .slots
                .iter()
                .map(|s| s.map(|m| m.key()).unwrap_or("-"))
                .collect();
            println!(
                " {}#{:<3} {:<10} {} dmg / {} ms  [{}]",
                marker,
                w.id,
                weapon_info(w.kind).name,
                stats.damage,
                stats.cooldown_ms,
                slots.join(" ")
            );
        }
    }
    let spare: Vec<String> = ModuleType::all()
        .iter()
        .filter(|m| state.module_count(**m) > 0)
        .map(|m| format!("{} × {}", state.module_count(*m), m.name()))
        .collect();
    if !spare.is_empty() {
        println!("== Modules ==\n  {}", spare.join(", "));
    }

    let ex = &state.exploration;
    if ex.is_active() {
        println!("== Expedition ==");
        println!(
            "  at ({}, {})  {}  HP {}  pack {}/{}  {} tiles seen",
            ex.position.x,
            ex.position.y,
            ex.phase.key(),
            ex.player_hp,
            ex.backpack_used(),
            backpack_capacity(state),
            ex.visited.len()
        );
        if let Some(combat) = &ex.combat {
            let stats = player_stats(state);
            println!(
                "  fighting {}: {}/{} HP (you hit {} every {} ms)",
                enemy_info(combat.enemy).name,
                combat.enemy_hp, combat.enemy_max_hp, stats.damage, stats.cooldown_ms
            );
        }
        for (i, item) in ex.pending_loot.iter().enumerate() {
            println!("  [{}] {} {}", i + 1, item.amount, item.resource.name());
        }
    }
}

fn print_log(state: &GameState, lines: usize) {
    println!("== Log ==");
    let skip = state.log.len().saturating_sub(lines);
    for line in state.log.iter().skip(skip) {
        println!("  {}", line);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut storage = FileStorage::new(cli.save_dir.clone());
    let now = SystemClock.now_ms();

    if let Cmd::Reset = cli.command {
        delete_save(&mut storage).context("deleting save")?;
        println!("Save deleted.");
        return Ok(());
    }

    let state = load_game(&mut storage)
        .with_context(|| format!("loading save from {}", cli.save_dir.display()))?
        .unwrap_or_default();
    let mut game = WastelandGame::from_state(state, cli.seed.unwrap_or(now));
    game.update(now);

    match &cli.command {
        Cmd::Simulate { minutes, step_ms } => simulate(&mut game, *minutes, *step_ms),
        Cmd::Step { direction, times } => {
            let (dx, dy) = direction.delta();
            for _ in 0..*times {
                if !game.handle(&Command::Step { dx, dy }, now) {
                    break;
                }
                let ex = &game.state.exploration;
                if !ex.is_active() || ex.phase != ExplorationPhase::Moving {
                    break;
                }
            }
        }
        other => {
            if let Some(command) = to_command(other)? {
                if !game.handle(&command, now) {
                    log::debug!("command rejected: {:?}", command);
                }
            }
        }
    }

    print_status(&game.state, now);
    print_log(&game.state, cli.log_lines);
    game.save(&mut storage, now)
        .with_context(|| format!("writing save to {}", cli.save_dir.display()))?;
    Ok(())
}
