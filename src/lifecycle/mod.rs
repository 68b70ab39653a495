//! Session lifecycle — keeps one [`AutomatedHost`] alive for each live
//! world.
//!
//! A host is created and enabled on every [`SaveLoadedEvent`], whichever
//! path loaded the save, and disabled and dropped on
//! [`ReturnedToTitleEvent`]. The start-farm stage itself is never re-armed
//! here.

use bevy::prelude::*;

use crate::shared::*;

/// Per-session automation attached to a live world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomatedHost {
    pub slot_id: String,
    pub farm_name: String,
    pub ticks_hosted: u64,
    enabled: bool,
}

impl AutomatedHost {
    pub fn new(slot_id: impl Into<String>, farm_name: impl Into<String>) -> Self {
        Self {
            slot_id: slot_id.into(),
            farm_name: farm_name.into(),
            ticks_hosted: 0,
            enabled: false,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Resource, Debug, Default)]
pub struct ActiveAutomatedHost(pub Option<AutomatedHost>);

pub struct LifecyclePlugin;

impl Plugin for LifecyclePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActiveAutomatedHost>()
            .add_systems(
                OnTransition {
                    exited: HostScreen::Hosting,
                    entered: HostScreen::Title,
                },
                announce_returned_to_title,
            )
            .add_systems(
                Update,
                (
                    on_save_loaded,
                    on_returned_to_title,
                    tick_automated_host.run_if(in_state(HostScreen::Hosting)),
                )
                    .chain(),
            );
    }
}

fn announce_returned_to_title(mut events: EventWriter<ReturnedToTitleEvent>) {
    info!("Returned to title");
    events.send(ReturnedToTitleEvent);
}

pub fn on_save_loaded(
    mut events: EventReader<SaveLoadedEvent>,
    mut active: ResMut<ActiveAutomatedHost>,
) {
    for ev in events.read() {
        if let Some(mut previous) = active.0.take() {
            previous.disable();
            warn!(
                "Replacing automated host for {} with {}",
                previous.slot_id, ev.slot_id
            );
        }
        let mut automated = AutomatedHost::new(ev.slot_id.clone(), ev.farm_name.clone());
        automated.enable();
        info!(
            "Automated host enabled for \"{}\" ({}{})",
            ev.farm_name,
            ev.slot_id,
            if ev.new_world { ", new world" } else { "" }
        );
        active.0 = Some(automated);
    }
}

pub fn on_returned_to_title(
    mut events: EventReader<ReturnedToTitleEvent>,
    mut active: ResMut<ActiveAutomatedHost>,
) {
    for _ in events.read() {
        if let Some(mut automated) = active.0.take() {
            automated.disable();
            info!(
                "Automated host for {} disabled after {} ticks",
                automated.slot_id, automated.ticks_hosted
            );
        }
    }
}

fn tick_automated_host(mut active: ResMut<ActiveAutomatedHost>) {
    if let Some(automated) = active.0.as_mut().filter(|a| a.is_enabled()) {
        automated.ticks_hosted += 1;
    }
}
