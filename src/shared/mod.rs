//! Shared states, events, resources, and constants for farmhost.
//!
//! This is the type contract. Every domain plugin imports from here.
//! Domains talk to each other through these events and resources only.

use bevy::prelude::*;
use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════
// HOST STATE — top-level state machine
// ═══════════════════════════════════════════════════════════════════════

/// What the host process is currently showing.
///
/// `Loading` reads the config, `Title` is the title screen (the only place
/// a world can be loaded or created), `Hosting` is an active co-op session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, States, Default)]
pub enum HostScreen {
    #[default]
    Loading,
    Title,
    Hosting,
}

// ═══════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════

/// Process exit status for a fatal configuration error.
///
/// Stable: operators rely on it to tell config mistakes apart from crashes
/// (a panic exits with 101).
pub const CONFIG_ERROR_EXIT_CODE: u8 = 255;

/// Name given to the farmer that owns a freshly created server farm.
pub const BOT_PLAYER_NAME: &str = "ServerBot";
pub const BOT_FAVORITE_THING: &str = "Farms";

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_SAVES_DIR: &str = "saves";

// ═══════════════════════════════════════════════════════════════════════
// PATHS
// ═══════════════════════════════════════════════════════════════════════

/// Where the host reads its config and keeps its save slots.
#[derive(Resource, Debug, Clone)]
pub struct HostPaths {
    pub config_file: PathBuf,
    pub saves_dir: PathBuf,
}

impl HostPaths {
    pub fn new(config_file: impl Into<PathBuf>, saves_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            saves_dir: saves_dir.into(),
        }
    }

    /// Both paths next to the running executable, falling back to the
    /// working directory.
    pub fn beside_executable() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(
            exe_dir.join(DEFAULT_CONFIG_FILE),
            exe_dir.join(DEFAULT_SAVES_DIR),
        )
    }
}

impl Default for HostPaths {
    fn default() -> Self {
        Self::beside_executable()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════

/// Sent by the host once a world is live, whether it was loaded from a slot
/// or created from scratch.
#[derive(Event, Debug, Clone)]
pub struct SaveLoadedEvent {
    pub slot_id: String,
    pub farm_name: String,
    pub new_world: bool,
}

/// Sent when the host leaves an active session and shows the title screen
/// again.
#[derive(Event, Debug, Clone, Default)]
pub struct ReturnedToTitleEvent;

/// Sent when a queued slot load could not be applied. The title screen is
/// open again and nothing was loaded.
#[derive(Event, Debug, Clone)]
pub struct LoadFailedEvent {
    pub slot_id: String,
    pub reason: String,
}
