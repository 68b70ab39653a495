//! Start-farm stage — fires the world bootstrap exactly once, the first
//! tick the title screen is showing.
//!
//! The stage only disables itself once the host has applied the queued load
//! or new game. A load that fails puts it back to `Armed` for the next tick.

use bevy::prelude::*;

use crate::bootstrap::{bootstrap, BootstrapError, BootstrapOutcome};
use crate::config::HostConfig;
use crate::host::{apply_pending_transition, HostWorld};
use crate::save::SlotLocator;
use crate::shared::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageState {
    #[default]
    Armed,
    /// The bootstrap ran; its load or new game is not applied yet.
    Fired,
    Disabled,
}

/// One-shot trigger for the world bootstrap. Once disabled it stays
/// disabled for the life of the process.
#[derive(Resource, Debug, Default)]
pub struct StartFarmStage {
    state: StageState,
}

impl StartFarmStage {
    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn is_disabled(&self) -> bool {
        self.state == StageState::Disabled
    }

    /// Moves `Armed → Fired` when the title screen is visible. Returns
    /// whether the caller should run the bootstrap now.
    pub fn begin(&mut self, title_visible: bool) -> bool {
        if self.state != StageState::Armed || !title_visible {
            return false;
        }
        self.state = StageState::Fired;
        true
    }

    pub fn finish(&mut self) {
        self.state = StageState::Disabled;
    }

    /// Puts a fired stage back to `Armed` so the next tick retries.
    pub fn rearm(&mut self) {
        if self.state == StageState::Fired {
            self.state = StageState::Armed;
        }
    }
}

pub struct StagePlugin;

impl Plugin for StagePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StartFarmStage>()
            .add_systems(
                Update,
                run_start_farm_stage.run_if(in_state(HostScreen::Title)),
            )
            .add_systems(
                PostUpdate,
                settle_start_farm_stage.after(apply_pending_transition),
            );
    }
}

pub fn run_start_farm_stage(
    mut stage: ResMut<StartFarmStage>,
    config: Option<Res<HostConfig>>,
    locator: Option<Res<SlotLocator>>,
    mut host: ResMut<HostWorld>,
    mut app_exit: EventWriter<AppExit>,
) {
    let (Some(config), Some(locator)) = (config, locator) else {
        return;
    };
    if !stage.begin(host.title_menu_open) {
        return;
    }

    let existing = locator.0.find_hostable_slot(&config.farm_name);
    match &existing {
        Some(slot) => debug!("Hosting {} on co-op", slot.slot_id),
        None => debug!(
            "Failed to find farm slot. Creating new farm \"{}\" and hosting on co-op",
            config.farm_name
        ),
    }

    match bootstrap(&config, existing.as_ref(), &mut *host) {
        Ok(BootstrapOutcome::LoadedExisting { slot_id }) => {
            info!("Queued load of slot {}", slot_id);
        }
        Ok(BootstrapOutcome::CreatedNew {
            farm_name,
            warnings,
        }) => {
            for warning in &warnings {
                error!("Error in host config file. {}", warning.message);
            }
            info!("Queued creation of farm \"{}\"", farm_name);
        }
        Err(BootstrapError::TerminateProcess(rejected)) => {
            for warning in &rejected.warnings {
                error!("Error in host config file. {}", warning.message);
            }
            error!("Error in host config file. {}", rejected.error.message);
            error!("Exiting...");
            stage.finish();
            app_exit.send(AppExit::from_code(CONFIG_ERROR_EXIT_CODE));
        }
        Err(e @ BootstrapError::Host(_)) => {
            warn!("{}. Retrying next tick.", e);
            stage.rearm();
        }
    }
}

/// Disables a fired stage once its transition is live, or re-arms it when
/// the host could not load the slot.
pub fn settle_start_farm_stage(
    mut stage: ResMut<StartFarmStage>,
    mut loaded: EventReader<SaveLoadedEvent>,
    mut failed: EventReader<LoadFailedEvent>,
) {
    let applied = loaded.read().last().is_some();
    let failure = failed.read().last().cloned();
    if stage.state() != StageState::Fired {
        return;
    }

    if applied {
        stage.finish();
    } else if let Some(failure) = failure {
        warn!(
            "Could not load slot {}: {}. Retrying next tick.",
            failure.slot_id, failure.reason
        );
        stage.rearm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_starts_armed() {
        assert_eq!(StartFarmStage::default().state(), StageState::Armed);
    }

    #[test]
    fn test_stage_waits_for_title_screen() {
        let mut stage = StartFarmStage::default();
        assert!(!stage.begin(false));
        assert_eq!(stage.state(), StageState::Armed);
        assert!(stage.begin(true));
        assert_eq!(stage.state(), StageState::Fired);
    }

    #[test]
    fn test_stage_fires_once() {
        let mut stage = StartFarmStage::default();
        assert!(stage.begin(true));
        stage.finish();
        for _ in 0..10 {
            assert!(!stage.begin(true));
        }
        assert!(stage.is_disabled());
    }

    #[test]
    fn test_rearm_only_undoes_a_fired_stage() {
        let mut stage = StartFarmStage::default();
        assert!(stage.begin(true));
        stage.rearm();
        assert_eq!(stage.state(), StageState::Armed);

        stage.finish();
        stage.rearm();
        assert!(stage.is_disabled());
    }

    #[test]
    fn test_fired_stage_does_not_fire_again() {
        let mut stage = StartFarmStage::default();
        assert!(stage.begin(true));
        assert!(!stage.begin(true));
    }
}
