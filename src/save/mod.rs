use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::validate::{BundleVariant, MineRewards};
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// PUBLIC TYPES
// ═══════════════════════════════════════════════════════════════════════

pub const SAVE_VERSION: u32 = 1;

/// One discoverable save slot, as seen from the title screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSlotRecord {
    pub slot_id: String,
    pub farmer_name: String,
    pub farm_name: String,
    /// Whether this slot may be opened as a co-op host.
    pub can_host: bool,
}

/// World-creation settings persisted with a farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    pub starting_cabins: u8,
    pub cabins_separate: bool,
    pub which_farm: u8,
    pub bundle_type: BundleVariant,
    pub spawn_monsters_at_night: bool,
    pub starting_seed: Option<u64>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            starting_cabins: 1,
            cabins_separate: false,
            which_farm: 0,
            bundle_type: BundleVariant::Default,
            spawn_monsters_at_night: false,
            starting_seed: None,
        }
    }
}

/// The farmer that owns the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerProfile {
    pub name: String,
    pub display_name: String,
    pub farm_name: String,
    pub favorite_thing: String,
    pub difficulty_modifier: f32,
    pub separate_wallets: bool,
    pub cat_person: bool,
    pub pet_breed: u8,
    pub is_customized: bool,
}

impl Default for FarmerProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: String::new(),
            farm_name: String::new(),
            favorite_thing: String::new(),
            difficulty_modifier: 1.0,
            separate_wallets: false,
            cat_person: false,
            pet_breed: 0,
            is_customized: false,
        }
    }
}

/// Options the host records alongside the world for the rest of the save.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewGameOptions {
    pub year_one_completable: bool,
    pub mine_chests: MineRewards,
    pub spawn_monsters_at_night: bool,
}

/// On-disk layout of a save slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmSaveFile {
    pub version: u32,
    pub slot_id: String,
    pub slot_can_host: bool,
    pub save_timestamp: u64,
    pub farmer: FarmerProfile,
    pub world: WorldSettings,
    pub options: NewGameOptions,
}

impl FarmSaveFile {
    pub fn to_slot_record(&self) -> SaveSlotRecord {
        SaveSlotRecord {
            slot_id: self.slot_id.clone(),
            farmer_name: self.farmer.name.clone(),
            farm_name: self.farmer.farm_name.clone(),
            can_host: self.slot_can_host,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum SaveFileError {
    Io(std::io::Error),
    Encode(String),
    Decode(String),
    NotFound(String),
}

impl fmt::Display for SaveFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveFileError::Io(e) => write!(f, "I/O error: {e}"),
            SaveFileError::Encode(msg) => write!(f, "Encoding error: {msg}"),
            SaveFileError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            SaveFileError::NotFound(slot) => write!(f, "Save slot {slot} does not exist"),
        }
    }
}

impl std::error::Error for SaveFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveFileError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveFileError {
    fn from(e: std::io::Error) -> Self {
        SaveFileError::Io(e)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// LOCATOR
// ═══════════════════════════════════════════════════════════════════════

/// Source of save slots. Implementations re-scan on every call; slots can
/// appear or vanish between attempts.
pub trait SaveSlotLocator {
    /// Every discoverable slot. An absent store yields an empty list.
    fn save_slots(&self) -> Vec<SaveSlotRecord>;

    /// First hostable slot whose farm name equals `farm_name` exactly.
    fn find_hostable_slot(&self, farm_name: &str) -> Option<SaveSlotRecord> {
        self.save_slots()
            .into_iter()
            .filter(|slot| slot.can_host)
            .find(|slot| slot.farm_name == farm_name)
    }
}

impl SaveSlotLocator for Vec<SaveSlotRecord> {
    fn save_slots(&self) -> Vec<SaveSlotRecord> {
        self.clone()
    }
}

/// The locator the title-screen stage consults.
#[derive(Resource)]
pub struct SlotLocator(pub Box<dyn SaveSlotLocator + Send + Sync>);

impl SlotLocator {
    pub fn new(locator: impl SaveSlotLocator + Send + Sync + 'static) -> Self {
        Self(Box::new(locator))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SAVE DIRECTORY
// ═══════════════════════════════════════════════════════════════════════

/// A directory of `<slot_id>.json` save files.
#[derive(Debug, Clone)]
pub struct SaveDirectory {
    root: PathBuf,
}

impl SaveDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn slot_path(&self, slot_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", slot_id))
    }

    pub fn read_slot(&self, slot_id: &str) -> Result<FarmSaveFile, SaveFileError> {
        let path = self.slot_path(slot_id);
        if !path.exists() {
            return Err(SaveFileError::NotFound(slot_id.to_string()));
        }
        read_save_file(&path)
    }

    /// Writes `file` atomically: temp file first, then rename over the slot.
    pub fn write_slot(&self, file: &FarmSaveFile) -> Result<PathBuf, SaveFileError> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| SaveFileError::Encode(e.to_string()))?;

        let path = self.slot_path(&file.slot_id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)?;
        fs::rename(&tmp_path, &path)?;
        Ok(path)
    }
}

fn read_save_file(path: &Path) -> Result<FarmSaveFile, SaveFileError> {
    let json = fs::read_to_string(path)?;
    let file: FarmSaveFile =
        serde_json::from_str(&json).map_err(|e| SaveFileError::Decode(e.to_string()))?;

    if file.version != SAVE_VERSION {
        warn!(
            "Save {} has version {} but current version is {}. Reading it anyway.",
            path.display(),
            file.version,
            SAVE_VERSION
        );
    }
    Ok(file)
}

impl SaveSlotLocator for SaveDirectory {
    fn save_slots(&self) -> Vec<SaveSlotRecord> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut slots = Vec::with_capacity(paths.len());
        for path in paths {
            match read_save_file(&path) {
                Ok(file) => slots.push(file.to_slot_record()),
                Err(e) => warn!("Skipping unreadable save {}: {}", path.display(), e),
            }
        }
        debug!(
            "Save slot scan of {} found {} slots",
            self.root.display(),
            slots.len()
        );
        slots
    }
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Slot id for a new farm: the farm name's alphanumerics plus the seed.
pub fn slot_id_for(farm_name: &str, seed: u64) -> String {
    let stem: String = farm_name.chars().filter(|c| c.is_alphanumeric()).collect();
    let stem = if stem.is_empty() { "Farm".to_string() } else { stem };
    format!("{}_{}", stem, seed)
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HostPaths>()
            .add_systems(PreStartup, install_save_directory);
    }
}

/// Uses the configured saves directory unless a locator was already
/// provided.
fn install_save_directory(
    mut commands: Commands,
    paths: Res<HostPaths>,
    existing: Option<Res<SlotLocator>>,
) {
    if existing.is_some() {
        return;
    }
    info!("Save slots are read from {}", paths.saves_dir.display());
    commands.insert_resource(SlotLocator::new(SaveDirectory::new(paths.saves_dir.clone())));
}
