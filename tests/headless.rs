//! Headless integration tests for farmhost.
//!
//! These tests run the host's ECS logic without a game process. They use
//! Bevy's `MinimalPlugins` to tick the app, register the shared state and
//! events the way `main.rs` does, and verify the start-farm bootstrap end to
//! end: which commands reach the host, in what order, and how often.
//!
//! Run with: `cargo test --test headless`

use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use farmhost::config::{ConfigPlugin, HostConfig};
use farmhost::host::{HostCommand, HostPlugin, HostWorld, PendingTransition, WorldOption};
use farmhost::lifecycle::{ActiveAutomatedHost, LifecyclePlugin};
use farmhost::save::{
    FarmSaveFile, FarmerProfile, NewGameOptions, SaveDirectory, SavePlugin, SaveSlotRecord,
    SlotLocator, WorldSettings, SAVE_VERSION,
};
use farmhost::shared::*;
use farmhost::stage::{run_start_farm_stage, StageState, StagePlugin, StartFarmStage};
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Test App Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Fresh per-test directory for config and saves.
fn scratch_paths(test_name: &str) -> HostPaths {
    let root = std::env::temp_dir().join(format!(
        "farmhost-headless-{}-{}",
        test_name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&root);
    HostPaths::new(root.join("config.json"), root.join("saves"))
}

/// Builds a minimal Bevy app with the shared state and events registered and
/// every host plugin except config loading. Tests insert the `HostConfig`
/// (and optionally a `SlotLocator`) themselves.
fn build_test_app(paths: &HostPaths) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(StatesPlugin);

    // ── Host State ───────────────────────────────────────────────────────
    app.init_state::<HostScreen>();
    app.insert_resource(paths.clone());

    // ── Shared Events (mirrors main.rs) ──────────────────────────────────
    app.add_event::<SaveLoadedEvent>()
        .add_event::<LoadFailedEvent>()
        .add_event::<ReturnedToTitleEvent>();

    app.add_plugins(SavePlugin)
        .add_plugins(HostPlugin)
        .add_plugins(StagePlugin)
        .add_plugins(LifecyclePlugin);

    app
}

/// Moves the app onto the title screen and ticks once. The stage fires during
/// this tick.
fn enter_title(app: &mut App) {
    app.update(); // startup
    app.world_mut()
        .resource_mut::<NextState<HostScreen>>()
        .set(HostScreen::Title);
    app.update();
}

fn acme_config() -> HostConfig {
    HostConfig {
        farm_name: "Acme".to_string(),
        starting_cabins: 1,
        cabin_layout: "nearby".to_string(),
        profit_margin: "75%".to_string(),
        money_style: "shared".to_string(),
        farm_type: "forest".to_string(),
        community_center_bundles: "normal".to_string(),
        mine_rewards: "normal".to_string(),
        spawn_monsters_on_farm_at_night: false,
        random_seed: Some(42),
        ..HostConfig::default()
    }
}

fn acme_slot(slot_id: &str) -> SaveSlotRecord {
    SaveSlotRecord {
        slot_id: slot_id.to_string(),
        farmer_name: BOT_PLAYER_NAME.to_string(),
        farm_name: "Acme".to_string(),
        can_host: true,
    }
}

/// Writes a hostable save for the Acme farm under `slot_id`.
fn write_acme_save(paths: &HostPaths, slot_id: &str) {
    SaveDirectory::new(&paths.saves_dir)
        .write_slot(&FarmSaveFile {
            version: SAVE_VERSION,
            slot_id: slot_id.to_string(),
            slot_can_host: true,
            save_timestamp: 0,
            farmer: FarmerProfile {
                name: BOT_PLAYER_NAME.to_string(),
                farm_name: "Acme".to_string(),
                ..Default::default()
            },
            world: WorldSettings::default(),
            options: NewGameOptions::default(),
        })
        .unwrap();
}

fn journal(app: &App) -> Vec<HostCommand> {
    app.world().resource::<HostWorld>().journal.clone()
}

fn screen(app: &App) -> HostScreen {
    *app.world().resource::<State<HostScreen>>().get()
}

fn stage_state(app: &App) -> StageState {
    app.world().resource::<StartFarmStage>().state()
}

fn count(commands: &[HostCommand], wanted: &HostCommand) -> usize {
    commands.iter().filter(|c| *c == wanted).count()
}

// ─────────────────────────────────────────────────────────────────────────────
// New world
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_no_matching_slot_creates_and_hosts_new_farm() {
    let paths = scratch_paths("new_farm");
    let mut app = build_test_app(&paths);
    app.insert_resource(acme_config());
    app.insert_resource(SlotLocator::new(vec![
        // Same name but not hostable, and a hostable farm with another name.
        SaveSlotRecord {
            can_host: false,
            ..acme_slot("Acme_1")
        },
        SaveSlotRecord {
            farm_name: "acme".to_string(),
            ..acme_slot("acme_2")
        },
    ]));

    enter_title(&mut app);

    let commands = journal(&app);
    assert_eq!(commands.first(), Some(&HostCommand::ResetWorld));
    assert_eq!(commands.last(), Some(&HostCommand::StartNewGame));
    assert_eq!(count(&commands, &HostCommand::ResetWorld), 1);
    assert_eq!(count(&commands, &HostCommand::StartNewGame), 1);
    assert!(commands.contains(&HostCommand::CommitOption(WorldOption::CabinsSeparate(false))));
    assert!(commands.contains(&HostCommand::CommitOption(WorldOption::DifficultyModifier(0.75))));
    assert!(commands.contains(&HostCommand::CommitOption(WorldOption::WhichFarm(2))));
    assert!(!commands.iter().any(|c| matches!(c, HostCommand::LoadSlot(_))));
    assert_eq!(stage_state(&app), StageState::Disabled);

    // Next tick applies the Hosting transition and the save-loaded hook.
    app.update();
    assert_eq!(screen(&app), HostScreen::Hosting);

    let active = app.world().resource::<ActiveAutomatedHost>();
    let automated = active.0.as_ref().expect("automated host should exist");
    assert!(automated.is_enabled());
    assert_eq!(automated.farm_name, "Acme");
    assert_eq!(automated.slot_id, "Acme_42");

    let saved = SaveDirectory::new(&paths.saves_dir).read_slot("Acme_42").unwrap();
    assert_eq!(saved.farmer.farm_name, "Acme");
    assert_eq!(saved.farmer.name, BOT_PLAYER_NAME);
    assert_eq!(saved.world.which_farm, 2);
    assert_eq!(saved.world.starting_seed, Some(42));
    assert!(saved.slot_can_host);
}

#[test]
fn test_created_farm_is_loaded_on_next_process_start() {
    let paths = scratch_paths("restart");

    // First run: creates the farm and writes its slot.
    let mut first = build_test_app(&paths);
    first.insert_resource(acme_config());
    enter_title(&mut first);
    first.update();
    assert_eq!(screen(&first), HostScreen::Hosting);

    // Second run against the same saves directory loads it.
    let mut second = build_test_app(&paths);
    second.insert_resource(acme_config());
    enter_title(&mut second);
    assert_eq!(
        journal(&second),
        vec![
            HostCommand::SetMultiplayerHosting,
            HostCommand::LoadSlot("Acme_42".to_string()),
            HostCommand::CloseActiveMenu,
        ]
    );
    second.update();
    assert_eq!(screen(&second), HostScreen::Hosting);
}

// ─────────────────────────────────────────────────────────────────────────────
// Existing slot
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_matching_slot_issues_only_a_load() {
    let paths = scratch_paths("load_only");
    write_acme_save(&paths, "thatSlotId");
    let mut app = build_test_app(&paths);
    app.insert_resource(acme_config());
    app.insert_resource(SlotLocator::new(vec![acme_slot("thatSlotId")]));

    enter_title(&mut app);

    let commands = journal(&app);
    assert_eq!(count(&commands, &HostCommand::LoadSlot("thatSlotId".to_string())), 1);
    assert_eq!(count(&commands, &HostCommand::ResetWorld), 0);
    assert_eq!(count(&commands, &HostCommand::StartNewGame), 0);
    assert!(!commands
        .iter()
        .any(|c| matches!(c, HostCommand::CommitOption(_))));
    assert_eq!(stage_state(&app), StageState::Disabled);
}

#[test]
fn test_slot_on_disk_is_loaded_and_hosted() {
    let paths = scratch_paths("load_disk");
    SaveDirectory::new(&paths.saves_dir)
        .write_slot(&FarmSaveFile {
            version: SAVE_VERSION,
            slot_id: "Acme_7".to_string(),
            slot_can_host: true,
            save_timestamp: 0,
            farmer: FarmerProfile {
                name: BOT_PLAYER_NAME.to_string(),
                farm_name: "Acme".to_string(),
                difficulty_modifier: 0.5,
                ..Default::default()
            },
            world: WorldSettings {
                which_farm: 6,
                ..Default::default()
            },
            options: NewGameOptions::default(),
        })
        .unwrap();

    let mut app = build_test_app(&paths);
    // A config that would be rejected; loading an existing save skips validation.
    app.insert_resource(HostConfig {
        starting_cabins: 9,
        ..acme_config()
    });

    enter_title(&mut app);
    assert_eq!(
        app.world().resource::<HostWorld>().pending,
        None,
        "load should be applied in PostUpdate"
    );
    assert!(app.should_exit().is_none());

    app.update();
    assert_eq!(screen(&app), HostScreen::Hosting);
    let world = app.world().resource::<HostWorld>();
    let player = world.player.as_ref().unwrap();
    assert_eq!(player.farm_name, "Acme");
    assert_eq!(player.difficulty_modifier, 0.5);
    assert_eq!(world.settings.which_farm, 6);
    assert!(!world.title_menu_open);

    let automated = app.world().resource::<ActiveAutomatedHost>();
    assert_eq!(automated.0.as_ref().unwrap().slot_id, "Acme_7");
}

#[test]
fn test_missing_slot_file_rearms_stage_and_retries() {
    let paths = scratch_paths("load_missing");
    let mut app = build_test_app(&paths);
    app.insert_resource(acme_config());
    // Listed by the locator, but nothing on disk.
    app.insert_resource(SlotLocator::new(vec![acme_slot("Acme_1")]));

    enter_title(&mut app);

    assert_eq!(screen(&app), HostScreen::Title);
    assert_eq!(stage_state(&app), StageState::Armed);
    assert!(app.world().resource::<HostWorld>().title_menu_open);
    assert!(app.should_exit().is_none());
    assert_eq!(count(&journal(&app), &HostCommand::LoadSlot("Acme_1".to_string())), 1);

    app.update();
    assert_eq!(count(&journal(&app), &HostCommand::LoadSlot("Acme_1".to_string())), 2);
    assert_eq!(stage_state(&app), StageState::Armed);

    // Once the locator stops listing the slot the stage creates the farm.
    app.insert_resource(SlotLocator::new(Vec::<SaveSlotRecord>::new()));
    app.update();
    assert_eq!(journal(&app).last(), Some(&HostCommand::StartNewGame));
    assert_eq!(stage_state(&app), StageState::Disabled);

    app.update();
    assert_eq!(screen(&app), HostScreen::Hosting);
    let automated = app.world().resource::<ActiveAutomatedHost>();
    assert_eq!(automated.0.as_ref().unwrap().slot_id, "Acme_42");
}

#[test]
fn test_unreadable_slot_file_is_skipped_by_directory_locator() {
    let paths = scratch_paths("load_corrupt");
    fs::create_dir_all(&paths.saves_dir).unwrap();
    fs::write(paths.saves_dir.join("Acme_1.json"), "{ truncated").unwrap();

    let mut app = build_test_app(&paths);
    app.insert_resource(acme_config());

    enter_title(&mut app);

    assert!(!journal(&app)
        .iter()
        .any(|c| matches!(c, HostCommand::LoadSlot(_))));
    assert_eq!(stage_state(&app), StageState::Disabled);
    app.update();
    assert_eq!(screen(&app), HostScreen::Hosting);
}

// ─────────────────────────────────────────────────────────────────────────────
// Fatal config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_config_exits_with_config_status_and_no_commands() {
    let paths = scratch_paths("bad_cabins");
    let mut app = build_test_app(&paths);
    app.insert_resource(HostConfig {
        starting_cabins: 5,
        ..acme_config()
    });

    enter_title(&mut app);

    assert!(journal(&app).is_empty());
    assert_eq!(
        app.should_exit(),
        Some(AppExit::from_code(CONFIG_ERROR_EXIT_CODE))
    );
    assert_eq!(stage_state(&app), StageState::Disabled);
    assert_eq!(screen(&app), HostScreen::Title);
}

#[test]
fn test_pet_without_species_still_creates_farm() {
    let paths = scratch_paths("pet_warning");
    let mut app = build_test_app(&paths);
    app.insert_resource(HostConfig {
        accept_pet: true,
        ..acme_config()
    });

    enter_title(&mut app);

    assert!(app.should_exit().is_none());
    assert_eq!(journal(&app).last(), Some(&HostCommand::StartNewGame));
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_stage_waits_for_title_screen() {
    let paths = scratch_paths("wait_title");
    let mut app = build_test_app(&paths);
    app.insert_resource(acme_config());

    for _ in 0..10 {
        app.update();
    }

    assert_eq!(screen(&app), HostScreen::Loading);
    assert!(journal(&app).is_empty());
    assert_eq!(stage_state(&app), StageState::Armed);
}

#[test]
fn test_stage_fires_once_even_after_returning_to_title() {
    let paths = scratch_paths("fire_once");
    let mut app = build_test_app(&paths);
    app.insert_resource(acme_config());

    enter_title(&mut app);
    app.update();
    assert_eq!(screen(&app), HostScreen::Hosting);
    let commands_after_boot = journal(&app).len();

    for _ in 0..5 {
        app.update();
    }
    let ticks = app
        .world()
        .resource::<ActiveAutomatedHost>()
        .0
        .as_ref()
        .unwrap()
        .ticks_hosted;
    assert!(ticks > 0, "automated host should tick while hosting");

    // Back to title: the automated host goes away, the stage stays disabled.
    app.world_mut()
        .resource_mut::<NextState<HostScreen>>()
        .set(HostScreen::Title);
    app.update();
    app.update();
    assert_eq!(screen(&app), HostScreen::Title);
    assert!(app.world().resource::<HostWorld>().title_menu_open);
    assert!(app.world().resource::<ActiveAutomatedHost>().0.is_none());

    for _ in 0..10 {
        app.update();
    }
    assert_eq!(journal(&app).len(), commands_after_boot);
    assert_eq!(stage_state(&app), StageState::Disabled);
}

/// Queues a bogus transition ahead of the stage on the first title tick so
/// the host refuses the bootstrap's commands.
fn jam_host_once(mut world: ResMut<HostWorld>, mut jammed: Local<bool>) {
    if !*jammed {
        *jammed = true;
        world.pending = Some(PendingTransition::Load("ghost".to_string()));
    }
}

#[test]
fn test_host_command_failure_retries_next_tick() {
    let paths = scratch_paths("retry");
    let mut app = build_test_app(&paths);
    app.insert_resource(acme_config());
    app.add_systems(
        Update,
        jam_host_once
            .before(run_start_farm_stage)
            .run_if(in_state(HostScreen::Title)),
    );

    enter_title(&mut app);
    assert!(journal(&app).is_empty(), "jammed host accepts nothing");
    assert_eq!(stage_state(&app), StageState::Armed);

    app.update();
    let commands = journal(&app);
    assert_eq!(commands.first(), Some(&HostCommand::ResetWorld));
    assert_eq!(count(&commands, &HostCommand::StartNewGame), 1);
    assert_eq!(stage_state(&app), StageState::Disabled);

    app.update();
    assert_eq!(screen(&app), HostScreen::Hosting);
}

// ─────────────────────────────────────────────────────────────────────────────
// Config loading
// ─────────────────────────────────────────────────────────────────────────────

fn saves_in(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_missing_config_boots_default_farm() {
    let paths = scratch_paths("default_config");
    let mut app = build_test_app(&paths);
    app.add_plugins(ConfigPlugin);

    app.update(); // load config, enter Title, stage fires, new farm saved
    app.update(); // enter Hosting

    assert!(paths.config_file.exists());
    assert_eq!(screen(&app), HostScreen::Hosting);

    let world = app.world().resource::<HostWorld>();
    let seed = world.settings.starting_seed.expect("host rolls a seed");
    let farm_name = HostConfig::default().farm_name;
    assert_eq!(world.player.as_ref().unwrap().farm_name, farm_name);

    let saves = saves_in(&paths.saves_dir);
    assert_eq!(saves.len(), 1);
    assert!(saves[0].ends_with(format!("CoopFarm_{seed}.json")));
}

#[test]
fn test_malformed_config_exits_before_title() {
    let paths = scratch_paths("bad_config");
    fs::create_dir_all(paths.config_file.parent().unwrap()).unwrap();
    fs::write(&paths.config_file, "{ \"FarmName\": ").unwrap();

    let mut app = build_test_app(&paths);
    app.add_plugins(ConfigPlugin);
    app.update();

    assert_eq!(
        app.should_exit(),
        Some(AppExit::from_code(CONFIG_ERROR_EXIT_CODE))
    );
    assert!(!app.world().contains_resource::<HostConfig>());
    app.update();
    assert_eq!(screen(&app), HostScreen::Loading);
    assert!(journal(&app).is_empty());
}
