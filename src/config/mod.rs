//! Host configuration — the human-edited file that describes the farm to
//! host.
//!
//! Read once at startup by [`ConfigPlugin`] into the [`HostConfig`]
//! resource. Nothing in the crate mutates it afterwards. Values are kept as
//! written; [`validate::validate`] turns them into typed options.

pub mod validate;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// CONFIG RECORD
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostConfig {
    pub farm_name: String,
    pub starting_cabins: i32,
    pub cabin_layout: String,
    pub profit_margin: String,
    pub money_style: String,
    pub accept_pet: bool,
    pub pet_species: Option<String>,
    pub pet_breed: Option<i32>,
    pub farm_type: String,
    pub community_center_bundles: String,
    pub guarantee_year1_completable: bool,
    pub mine_rewards: String,
    pub spawn_monsters_on_farm_at_night: bool,
    /// `None` lets the host roll a seed when the world is created.
    pub random_seed: Option<u64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            farm_name: String::from("Co-op Farm"),
            starting_cabins: 1,
            cabin_layout: String::from("separate"),
            profit_margin: String::from("normal"),
            money_style: String::from("shared"),
            accept_pet: false,
            pet_species: None,
            pet_breed: None,
            farm_type: String::from("standard"),
            community_center_bundles: String::from("normal"),
            guarantee_year1_completable: false,
            mine_rewards: String::from("normal"),
            spawn_monsters_on_farm_at_night: false,
            random_seed: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum ConfigLoadError {
    /// Reading or writing the config file failed.
    Io { path: PathBuf, source: std::io::Error },
    /// The file exists but is not a valid config document.
    Parse { path: PathBuf, message: String },
    /// The default config could not be serialized.
    Encode(String),
}

impl fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLoadError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            ConfigLoadError::Parse { path, message } => {
                write!(f, "Could not parse {}: {message}", path.display())
            }
            ConfigLoadError::Encode(msg) => write!(f, "Encoding error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigLoadError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FILE FORMAT
// ═══════════════════════════════════════════════════════════════════════

fn is_ron(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "ron")
}

pub fn parse_config(path: &Path, text: &str) -> Result<HostConfig, ConfigLoadError> {
    let parsed = if is_ron(path) {
        ron::from_str(text).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(text).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

pub fn encode_config(path: &Path, config: &HostConfig) -> Result<String, ConfigLoadError> {
    if is_ron(path) {
        ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigLoadError::Encode(e.to_string()))
    } else {
        serde_json::to_string_pretty(config).map_err(|e| ConfigLoadError::Encode(e.to_string()))
    }
}

/// Reads the config at `path`. A missing file is created with the default
/// config, which is then returned.
pub fn load_or_create_config(path: &Path) -> Result<HostConfig, ConfigLoadError> {
    let io_err = |source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        let config = HostConfig::default();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        fs::write(path, encode_config(path, &config)?).map_err(io_err)?;
        info!("Wrote default host config to {}", path.display());
        return Ok(config);
    }

    let text = fs::read_to_string(path).map_err(io_err)?;
    parse_config(path, &text)
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HostPaths>()
            .add_systems(OnEnter(HostScreen::Loading), load_host_config);
    }
}

/// Loads the config into a [`HostConfig`] resource and moves on to the
/// title screen. An unreadable config is fatal.
fn load_host_config(
    mut commands: Commands,
    paths: Res<HostPaths>,
    mut next_state: ResMut<NextState<HostScreen>>,
    mut app_exit: EventWriter<AppExit>,
) {
    match load_or_create_config(&paths.config_file) {
        Ok(config) => {
            info!(
                "Loaded host config from {} (farm \"{}\")",
                paths.config_file.display(),
                config.farm_name
            );
            commands.insert_resource(config);
            next_state.set(HostScreen::Title);
        }
        Err(e) => {
            error!("Error in host config file. {}", e);
            error!("Exiting...");
            app_exit.send(AppExit::from_code(CONFIG_ERROR_EXIT_CODE));
        }
    }
}
