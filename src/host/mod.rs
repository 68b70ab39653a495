//! Host session — the narrow command surface the bootstrap drives, and the
//! in-process host world that implements it.
//!
//! [`HostSession`] is the only way world-creation state is written. The
//! [`HostWorld`] resource queues the load / new-game transition it is asked
//! for; [`HostPlugin`] applies that transition in `PostUpdate`, moves the
//! host into [`HostScreen::Hosting`], and announces the live world with a
//! [`SaveLoadedEvent`]. A load that cannot be applied reopens the title menu
//! and sends a [`LoadFailedEvent`] instead.

use bevy::prelude::*;
use std::fmt;

use crate::config::validate::{BundleVariant, FarmType, MineRewards};
use crate::save::{
    current_timestamp, slot_id_for, FarmSaveFile, FarmerProfile, NewGameOptions, SaveDirectory,
    WorldSettings, SAVE_VERSION,
};
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════

/// A single resolved world-creation option.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldOption {
    StartingCabins(u8),
    CabinsSeparate(bool),
    DifficultyModifier(f32),
    SeparateWallets(bool),
    FarmName(String),
    CatPerson(bool),
    PetBreed(u8),
    WhichFarm(u8),
    BundleType(BundleVariant),
    YearOneCompletable(bool),
    MineChests(MineRewards),
    /// Sets both the live simulation flag and the persisted option.
    SpawnMonstersAtNight(bool),
    StartingSeed(Option<u64>),
    PlayerName(String),
    FavoriteThing(String),
    Customized(bool),
}

impl WorldOption {
    pub fn key(&self) -> &'static str {
        match self {
            WorldOption::StartingCabins(_) => "StartingCabins",
            WorldOption::CabinsSeparate(_) => "CabinsSeparate",
            WorldOption::DifficultyModifier(_) => "DifficultyModifier",
            WorldOption::SeparateWallets(_) => "SeparateWallets",
            WorldOption::FarmName(_) => "FarmName",
            WorldOption::CatPerson(_) => "CatPerson",
            WorldOption::PetBreed(_) => "PetBreed",
            WorldOption::WhichFarm(_) => "WhichFarm",
            WorldOption::BundleType(_) => "BundleType",
            WorldOption::YearOneCompletable(_) => "YearOneCompletable",
            WorldOption::MineChests(_) => "MineChests",
            WorldOption::SpawnMonstersAtNight(_) => "SpawnMonstersAtNight",
            WorldOption::StartingSeed(_) => "StartingSeed",
            WorldOption::PlayerName(_) => "PlayerName",
            WorldOption::FavoriteThing(_) => "FavoriteThing",
            WorldOption::Customized(_) => "Customized",
        }
    }

    /// Options written into the farmer, which only exists after a reset.
    pub fn targets_player(&self) -> bool {
        matches!(
            self,
            WorldOption::DifficultyModifier(_)
                | WorldOption::SeparateWallets(_)
                | WorldOption::FarmName(_)
                | WorldOption::CatPerson(_)
                | WorldOption::PetBreed(_)
                | WorldOption::PlayerName(_)
                | WorldOption::FavoriteThing(_)
                | WorldOption::Customized(_)
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════
// COMMAND SURFACE
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommandError {
    /// A farmer option was committed before the world was reset.
    NoPlayer { key: &'static str },
    /// A load or new game is already queued for this tick.
    TransitionPending,
    /// The title screen is not showing.
    NotAtTitle,
}

impl fmt::Display for HostCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommandError::NoPlayer { key } => {
                write!(f, "Cannot commit {key}: no player exists until the world is reset")
            }
            HostCommandError::TransitionPending => {
                write!(f, "A world transition is already pending")
            }
            HostCommandError::NotAtTitle => write!(f, "The title screen is not active"),
        }
    }
}

impl std::error::Error for HostCommandError {}

/// Commands the bootstrap may issue to the host. Nothing else touches host
/// state.
pub trait HostSession {
    fn load_slot(&mut self, slot_id: &str) -> Result<(), HostCommandError>;
    fn reset_world_to_blank(&mut self) -> Result<(), HostCommandError>;
    fn commit_option(&mut self, option: &WorldOption) -> Result<(), HostCommandError>;
    fn set_multiplayer_hosting(&mut self) -> Result<(), HostCommandError>;
    fn close_active_menu(&mut self) -> Result<(), HostCommandError>;
    /// Hands the configured world to the simulation. Must be the last
    /// command of a new-world sequence.
    fn start_new_game(&mut self) -> Result<(), HostCommandError>;
}

/// Record of a command the host accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    LoadSlot(String),
    ResetWorld,
    CommitOption(WorldOption),
    SetMultiplayerHosting,
    CloseActiveMenu,
    StartNewGame,
}

// ═══════════════════════════════════════════════════════════════════════
// HOST WORLD
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiplayerMode {
    #[default]
    SinglePlayer,
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTransition {
    Load(String),
    NewGame,
}

/// Process-wide world-creation state of the host.
#[derive(Resource, Debug, Clone, Default)]
pub struct HostWorld {
    pub multiplayer_mode: MultiplayerMode,
    pub title_menu_open: bool,
    pub settings: WorldSettings,
    pub player: Option<FarmerProfile>,
    pub options: NewGameOptions,
    pub pending: Option<PendingTransition>,
    /// Every command accepted, in order.
    pub journal: Vec<HostCommand>,
}

impl HostWorld {
    pub fn at_title() -> Self {
        Self {
            title_menu_open: true,
            ..Default::default()
        }
    }

    fn ensure_idle(&self) -> Result<(), HostCommandError> {
        if self.pending.is_some() {
            return Err(HostCommandError::TransitionPending);
        }
        Ok(())
    }

    /// Builds the save file describing the current world.
    pub fn to_save_file(&self, slot_id: &str) -> FarmSaveFile {
        FarmSaveFile {
            version: SAVE_VERSION,
            slot_id: slot_id.to_string(),
            slot_can_host: true,
            save_timestamp: current_timestamp(),
            farmer: self.player.clone().unwrap_or_default(),
            world: self.settings.clone(),
            options: self.options.clone(),
        }
    }

    /// Replaces the world with the contents of a save file.
    pub fn restore(&mut self, file: FarmSaveFile) {
        self.settings = file.world;
        self.player = Some(file.farmer);
        self.options = file.options;
    }
}

impl HostSession for HostWorld {
    fn load_slot(&mut self, slot_id: &str) -> Result<(), HostCommandError> {
        self.ensure_idle()?;
        self.pending = Some(PendingTransition::Load(slot_id.to_string()));
        self.journal.push(HostCommand::LoadSlot(slot_id.to_string()));
        Ok(())
    }

    fn reset_world_to_blank(&mut self) -> Result<(), HostCommandError> {
        self.ensure_idle()?;
        self.settings = WorldSettings::default();
        self.options = NewGameOptions::default();
        self.player = Some(FarmerProfile::default());
        self.journal.push(HostCommand::ResetWorld);
        Ok(())
    }

    fn commit_option(&mut self, option: &WorldOption) -> Result<(), HostCommandError> {
        self.ensure_idle()?;
        if option.targets_player() && self.player.is_none() {
            return Err(HostCommandError::NoPlayer { key: option.key() });
        }

        match option {
            WorldOption::StartingCabins(n) => self.settings.starting_cabins = *n,
            WorldOption::CabinsSeparate(v) => self.settings.cabins_separate = *v,
            WorldOption::WhichFarm(code) => self.settings.which_farm = *code,
            WorldOption::BundleType(b) => self.settings.bundle_type = *b,
            WorldOption::YearOneCompletable(v) => self.options.year_one_completable = *v,
            WorldOption::MineChests(m) => self.options.mine_chests = *m,
            WorldOption::SpawnMonstersAtNight(v) => {
                self.settings.spawn_monsters_at_night = *v;
                self.options.spawn_monsters_at_night = *v;
            }
            WorldOption::StartingSeed(seed) => self.settings.starting_seed = *seed,
            player_option => {
                if let Some(player) = self.player.as_mut() {
                    match player_option {
                        WorldOption::DifficultyModifier(m) => player.difficulty_modifier = *m,
                        WorldOption::SeparateWallets(v) => player.separate_wallets = *v,
                        WorldOption::FarmName(name) => player.farm_name = name.clone(),
                        WorldOption::CatPerson(v) => player.cat_person = *v,
                        WorldOption::PetBreed(b) => player.pet_breed = *b,
                        WorldOption::PlayerName(name) => {
                            player.name = name.clone();
                            player.display_name = name.clone();
                        }
                        WorldOption::FavoriteThing(thing) => player.favorite_thing = thing.clone(),
                        WorldOption::Customized(v) => player.is_customized = *v,
                        _ => {}
                    }
                }
            }
        }
        self.journal.push(HostCommand::CommitOption(option.clone()));
        Ok(())
    }

    fn set_multiplayer_hosting(&mut self) -> Result<(), HostCommandError> {
        self.multiplayer_mode = MultiplayerMode::Host;
        self.journal.push(HostCommand::SetMultiplayerHosting);
        Ok(())
    }

    fn close_active_menu(&mut self) -> Result<(), HostCommandError> {
        self.title_menu_open = false;
        self.journal.push(HostCommand::CloseActiveMenu);
        Ok(())
    }

    fn start_new_game(&mut self) -> Result<(), HostCommandError> {
        self.ensure_idle()?;
        if !self.title_menu_open {
            return Err(HostCommandError::NotAtTitle);
        }
        self.title_menu_open = false;
        self.pending = Some(PendingTransition::NewGame);
        self.journal.push(HostCommand::StartNewGame);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct HostPlugin;

impl Plugin for HostPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HostPaths>()
            .init_resource::<HostWorld>()
            .add_systems(OnEnter(HostScreen::Title), show_title_menu)
            .add_systems(
                PostUpdate,
                apply_pending_transition.run_if(in_state(HostScreen::Title)),
            );
    }
}

fn show_title_menu(mut world: ResMut<HostWorld>) {
    world.title_menu_open = true;
    world.pending = None;
}

/// Carries out the load or new game queued during `Update`.
pub fn apply_pending_transition(
    mut world: ResMut<HostWorld>,
    paths: Res<HostPaths>,
    mut next_state: ResMut<NextState<HostScreen>>,
    mut loaded: EventWriter<SaveLoadedEvent>,
    mut failed: EventWriter<LoadFailedEvent>,
) {
    let Some(pending) = world.pending.take() else {
        return;
    };
    let saves = SaveDirectory::new(paths.saves_dir.clone());

    match pending {
        PendingTransition::Load(slot_id) => match saves.read_slot(&slot_id) {
            Ok(file) => {
                world.restore(file);
                let farm_name = world
                    .player
                    .as_ref()
                    .map(|p| p.farm_name.clone())
                    .unwrap_or_default();
                match FarmType::from_code(world.settings.which_farm) {
                    Some(farm_type) => info!(
                        "Loaded slot {} (farm \"{}\", {:?} layout)",
                        slot_id, farm_name, farm_type
                    ),
                    None => warn!(
                        "Loaded slot {} (farm \"{}\") with unknown layout code {}",
                        slot_id, farm_name, world.settings.which_farm
                    ),
                }
                next_state.set(HostScreen::Hosting);
                loaded.send(SaveLoadedEvent {
                    slot_id,
                    farm_name,
                    new_world: false,
                });
            }
            Err(e) => {
                error!("Load of slot {} FAILED: {}", slot_id, e);
                world.title_menu_open = true;
                failed.send(LoadFailedEvent {
                    slot_id,
                    reason: e.to_string(),
                });
            }
        },
        PendingTransition::NewGame => {
            let seed = match world.settings.starting_seed {
                Some(seed) => seed,
                None => {
                    let seed = rand::random::<u64>();
                    world.settings.starting_seed = Some(seed);
                    seed
                }
            };
            let farm_name = world
                .player
                .as_ref()
                .map(|p| p.farm_name.clone())
                .unwrap_or_default();
            let slot_id = slot_id_for(&farm_name, seed);

            match saves.write_slot(&world.to_save_file(&slot_id)) {
                Ok(path) => info!("New farm \"{}\" saved to {}", farm_name, path.display()),
                Err(e) => warn!("Could not write initial save for {}: {}", slot_id, e),
            }

            next_state.set(HostScreen::Hosting);
            loaded.send(SaveLoadedEvent {
                slot_id,
                farm_name,
                new_world: true,
            });
        }
    }
}
