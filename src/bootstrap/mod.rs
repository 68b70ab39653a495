//! World bootstrap — turns the host config into either "load this slot" or
//! a complete, ordered new-world sequence.
//!
//! Validation always runs to completion before the first host command, so a
//! bad config never leaves a half-configured world behind.

use std::fmt;

use crate::config::validate::{validate, ConfigError, RejectedConfig, ValidatedConfig};
use crate::config::HostConfig;
use crate::host::{HostCommandError, HostSession, WorldOption};
use crate::save::SaveSlotRecord;
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// WORLD CREATION PLAN
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum WorldCreationStep {
    ResetWorld,
    Commit(WorldOption),
    SetHosting,
    StartNewGame,
}

/// The full new-world sequence, in the order the host must receive it.
///
/// Farmer options write into the player created by the reset, so the reset
/// comes first; starting the game hands the world to the simulation, so it
/// comes last.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldCreationCommand {
    pub steps: Vec<WorldCreationStep>,
}

impl WorldCreationCommand {
    pub fn from_config(config: &ValidatedConfig) -> Self {
        let options = [
            WorldOption::StartingCabins(config.starting_cabins),
            WorldOption::CabinsSeparate(config.cabin_layout.is_separate()),
            WorldOption::DifficultyModifier(config.profit_margin.difficulty_modifier()),
            WorldOption::SeparateWallets(config.money_style.uses_separate_wallets()),
            WorldOption::FarmName(config.farm_name.clone()),
            WorldOption::CatPerson(config.cat_person()),
            WorldOption::PetBreed(config.pet_breed_index()),
            WorldOption::WhichFarm(config.farm_type.code()),
            WorldOption::BundleType(config.bundles),
            WorldOption::YearOneCompletable(config.year_one_completable),
            WorldOption::MineChests(config.mine_rewards),
            WorldOption::SpawnMonstersAtNight(config.spawn_monsters_at_night),
            WorldOption::StartingSeed(config.random_seed),
            WorldOption::PlayerName(BOT_PLAYER_NAME.to_string()),
            WorldOption::FavoriteThing(BOT_FAVORITE_THING.to_string()),
            WorldOption::Customized(true),
        ];

        let mut steps = Vec::with_capacity(options.len() + 3);
        steps.push(WorldCreationStep::ResetWorld);
        steps.extend(options.into_iter().map(WorldCreationStep::Commit));
        steps.push(WorldCreationStep::SetHosting);
        steps.push(WorldCreationStep::StartNewGame);
        Self { steps }
    }

    pub fn apply<H: HostSession + ?Sized>(&self, host: &mut H) -> Result<(), HostCommandError> {
        for step in &self.steps {
            match step {
                WorldCreationStep::ResetWorld => host.reset_world_to_blank()?,
                WorldCreationStep::Commit(option) => host.commit_option(option)?,
                WorldCreationStep::SetHosting => host.set_multiplayer_hosting()?,
                WorldCreationStep::StartNewGame => host.start_new_game()?,
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// OUTCOME / ERRORS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    LoadedExisting { slot_id: String },
    CreatedNew {
        farm_name: String,
        /// Non-fatal config problems the caller should report.
        warnings: Vec<ConfigError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapError {
    /// The config is unusable; the process must exit. Carries the warnings
    /// raised before the fatal field so they can be reported first.
    TerminateProcess(RejectedConfig),
    /// The host refused a command; the attempt can be retried next tick.
    Host(HostCommandError),
}

impl BootstrapError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, BootstrapError::TerminateProcess(_))
    }

    /// Exit status to terminate with, for fatal errors only.
    pub fn exit_code(&self) -> Option<u8> {
        self.is_fatal().then_some(CONFIG_ERROR_EXIT_CODE)
    }
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::TerminateProcess(e) => write!(f, "Fatal config error: {e}"),
            BootstrapError::Host(e) => write!(f, "Host command failed: {e}"),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::TerminateProcess(e) => Some(e),
            BootstrapError::Host(e) => Some(e),
        }
    }
}

impl From<HostCommandError> for BootstrapError {
    fn from(e: HostCommandError) -> Self {
        BootstrapError::Host(e)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// BOOTSTRAP
// ═══════════════════════════════════════════════════════════════════════

/// Hosts `existing_slot` if there is one, otherwise creates the configured
/// farm and hosts it.
pub fn bootstrap<H: HostSession + ?Sized>(
    config: &HostConfig,
    existing_slot: Option<&SaveSlotRecord>,
    host: &mut H,
) -> Result<BootstrapOutcome, BootstrapError> {
    if let Some(slot) = existing_slot {
        // Saved worlds were validated when they were created.
        host.set_multiplayer_hosting()?;
        host.load_slot(&slot.slot_id)?;
        host.close_active_menu()?;
        return Ok(BootstrapOutcome::LoadedExisting {
            slot_id: slot.slot_id.clone(),
        });
    }

    let validated = validate(config).map_err(BootstrapError::TerminateProcess)?;
    WorldCreationCommand::from_config(&validated).apply(host)?;

    Ok(BootstrapOutcome::CreatedNew {
        farm_name: validated.farm_name,
        warnings: validated.warnings,
    })
}
