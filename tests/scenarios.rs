//! End-to-end play scenarios driven through the public API.

use wasteland_idle::game::actions::create_weapon;
use wasteland_idle::game::content::DEFAULT_ENEMY;
use wasteland_idle::game::exploration::{begin_combat, move_player, start_expedition};
use wasteland_idle::game::ledger::amount;
use wasteland_idle::game::save::{load_game, normalize, save_game, snapshot, FileStorage};
use wasteland_idle::game::state::{
    ExplorationMode, GameState, GatherAction, LootItem, Pos, ResourceId, UnlockId, WeaponType,
    MAP_SIZE,
};
use wasteland_idle::game::tick::{advance, tick};
use wasteland_idle::game::{Command, WastelandGame};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn expedition_ready() -> GameState {
    let mut s = GameState::new();
    s.unlocks.insert(UnlockId::Expeditions, true);
    create_weapon(&mut s, WeaponType::Pipe);
    s
}

#[test]
fn scavenging_unlocks_woodcutting() {
    let mut game = WastelandGame::new(3);
    let mut now = 1_000;
    game.update(now);
    for _ in 0..5 {
        assert!(game.handle(&Command::Gather(GatherAction::Scavenge), now));
        now += 2_000;
        game.update(now);
    }
    assert_eq!(amount(&game.state.resources, ResourceId::Scrap), 5.0);
    assert!(game.state.is_unlocked(UnlockId::Woodcutting));
    assert!(game.handle(&Command::Gather(GatherAction::ChopWood), now));
}

#[test]
fn death_loses_weapon_and_backpack() {
    let mut s = expedition_ready();
    let weapon = s.selected_weapon_id.unwrap();
    assert!(start_expedition(&mut s, false));
    s.exploration.backpack.push(LootItem {
        resource: ResourceId::Iron,
        amount: 6,
    });
    begin_combat(&mut s, DEFAULT_ENEMY, 10);
    s.exploration.player_hp = 1;
    if let Some(combat) = s.exploration.combat.as_mut() {
        combat.enemy_hp = 500;
        combat.enemy_max_hp = 500;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(4);
    advance(&mut s, &mut rng, 5_000.0);

    assert!(s.weapons.iter().all(|w| w.id != weapon));
    assert!(s.exploration.backpack.is_empty());
    assert_eq!(s.selected_weapon_id, None);
    assert_eq!(s.exploration.mode, ExplorationMode::Loadout);
    assert_eq!(amount(&s.resources, ResourceId::Iron), 0.0);
}

#[test]
fn return_commits_backpack() {
    let mut s = expedition_ready();
    assert!(start_expedition(&mut s, false));
    let start = Pos::new(MAP_SIZE / 2, MAP_SIZE / 2);
    assert_eq!(s.exploration.start, start);

    // the first two steps never roll an encounter
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    assert!(move_player(&mut s, &mut rng, 1, 0, 0));
    s.exploration.backpack.push(LootItem {
        resource: ResourceId::Scrap,
        amount: 5,
    });
    assert!(move_player(&mut s, &mut rng, -1, 0, 0));

    assert_eq!(amount(&s.resources, ResourceId::Scrap), 5.0);
    assert!(s.exploration.backpack.is_empty());
    assert_eq!(s.exploration.mode, ExplorationMode::Loadout);
}

#[test]
fn null_tick_changes_nothing() {
    let mut s = expedition_ready();
    s.last_update = 50_000;
    let before = s.clone();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    advance(&mut s, &mut rng, 0.0);
    tick(&mut s, &mut rng, 50_000);
    assert_eq!(s, before);
}

#[test]
fn save_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FileStorage::new(dir.path());

    let mut game = WastelandGame::new(9);
    game.update(1_000);
    game.handle(&Command::Gather(GatherAction::Scavenge), 1_000);
    game.update(1_500);
    game.save(&mut storage, 1_500).unwrap();

    let restored = load_game(&mut storage).unwrap().unwrap();
    assert_eq!(restored, game.state);

    // the interrupted scavenge finishes after the restart
    let mut game = WastelandGame::from_state(restored, 9);
    game.update(4_000);
    assert_eq!(amount(&game.state.resources, ResourceId::Scrap), 1.0);
}

#[test]
fn overwritten_save_keeps_latest() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FileStorage::new(dir.path());
    let mut s = GameState::new();
    save_game(&mut storage, &s).unwrap();
    s.resources.insert(ResourceId::Wood, 12.0);
    save_game(&mut storage, &s).unwrap();
    assert_eq!(load_game(&mut storage).unwrap(), Some(s));
}

#[test]
fn mid_combat_snapshot_resumes() {
    let mut s = expedition_ready();
    start_expedition(&mut s, false);
    begin_combat(&mut s, DEFAULT_ENEMY, 77);
    let restored = normalize(&snapshot(&s).unwrap());
    assert_eq!(restored, s);
}
