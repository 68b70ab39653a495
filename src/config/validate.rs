//! Parse-and-validate boundary for [`HostConfig`].
//!
//! Every string-valued option is matched exactly (case-sensitive) against
//! its literal domain and mapped to a typed enum here, once. Nothing past
//! this module compares config strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::HostConfig;

// ═══════════════════════════════════════════════════════════════════════
// TYPED OPTIONS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CabinLayout {
    Nearby,
    Separate,
}

impl CabinLayout {
    pub fn is_separate(self) -> bool {
        matches!(self, CabinLayout::Separate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfitMargin {
    Normal,
    SeventyFivePct,
    FiftyPct,
    TwentyFivePct,
}

impl ProfitMargin {
    /// Multiplier the host applies to every sale price.
    pub fn difficulty_modifier(self) -> f32 {
        match self {
            ProfitMargin::Normal => 1.0,
            ProfitMargin::SeventyFivePct => 0.75,
            ProfitMargin::FiftyPct => 0.5,
            ProfitMargin::TwentyFivePct => 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoneyStyle {
    Shared,
    Separate,
}

impl MoneyStyle {
    pub fn uses_separate_wallets(self) -> bool {
        matches!(self, MoneyStyle::Separate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PetSpecies {
    Dog,
    Cat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FarmType {
    Standard,
    Riverland,
    Forest,
    Hilltop,
    Wilderness,
    FourCorners,
    Beach,
}

impl FarmType {
    /// Numeric farm layout code understood by the host.
    pub fn code(self) -> u8 {
        match self {
            FarmType::Standard => 0,
            FarmType::Riverland => 1,
            FarmType::Forest => 2,
            FarmType::Hilltop => 3,
            FarmType::Wilderness => 4,
            FarmType::FourCorners => 5,
            FarmType::Beach => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FarmType::Standard),
            1 => Some(FarmType::Riverland),
            2 => Some(FarmType::Forest),
            3 => Some(FarmType::Hilltop),
            4 => Some(FarmType::Wilderness),
            5 => Some(FarmType::FourCorners),
            6 => Some(FarmType::Beach),
            _ => None,
        }
    }
}

/// Community center bundle set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BundleVariant {
    #[default]
    Default,
    Remixed,
}

/// Mine chest reward table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MineRewards {
    #[default]
    Default,
    Remixed,
}

// ═══════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════

/// A config field outside its declared domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// A config that cannot be used, with the non-fatal problems found in the
/// fields checked before the fatal one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedConfig {
    pub error: ConfigError,
    pub warnings: Vec<ConfigError>,
}

impl fmt::Display for RejectedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RejectedConfig {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// VALIDATED CONFIG
// ═══════════════════════════════════════════════════════════════════════

/// Every world-creation option resolved to its typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub farm_name: String,
    pub starting_cabins: u8,
    pub cabin_layout: CabinLayout,
    pub profit_margin: ProfitMargin,
    pub money_style: MoneyStyle,
    pub pet_species: Option<PetSpecies>,
    pub pet_breed: Option<u8>,
    pub farm_type: FarmType,
    pub bundles: BundleVariant,
    pub year_one_completable: bool,
    pub mine_rewards: MineRewards,
    pub spawn_monsters_at_night: bool,
    pub random_seed: Option<u64>,
    /// Non-fatal problems: accepting a pet without naming a species or breed.
    pub warnings: Vec<ConfigError>,
}

impl ValidatedConfig {
    pub fn cat_person(&self) -> bool {
        self.pet_species == Some(PetSpecies::Cat)
    }

    /// Breed index committed to the host; 0 when none was configured.
    pub fn pet_breed_index(&self) -> u8 {
        self.pet_breed.unwrap_or(0)
    }
}

/// Validates every field of `config`, in commit order, stopping at the first
/// field outside its domain.
pub fn validate(config: &HostConfig) -> Result<ValidatedConfig, RejectedConfig> {
    let mut warnings = Vec::new();
    match resolve(config, &mut warnings) {
        Ok(validated) => Ok(ValidatedConfig {
            warnings,
            ..validated
        }),
        Err(error) => Err(RejectedConfig { error, warnings }),
    }
}

fn resolve(
    config: &HostConfig,
    warnings: &mut Vec<ConfigError>,
) -> Result<ValidatedConfig, ConfigError> {

    let starting_cabins = match config.starting_cabins {
        n @ 0..=3 => n as u8,
        _ => {
            return Err(ConfigError::new(
                "StartingCabins",
                "Starting cabins must be an integer in [0, 3]",
            ))
        }
    };

    let cabin_layout = match config.cabin_layout.as_str() {
        "nearby" => CabinLayout::Nearby,
        "separate" => CabinLayout::Separate,
        _ => {
            return Err(ConfigError::new(
                "CabinLayout",
                "Cabin layout must be either \"nearby\" or \"separate\"",
            ))
        }
    };

    let profit_margin = match config.profit_margin.as_str() {
        "normal" => ProfitMargin::Normal,
        "75%" => ProfitMargin::SeventyFivePct,
        "50%" => ProfitMargin::FiftyPct,
        "25%" => ProfitMargin::TwentyFivePct,
        _ => {
            return Err(ConfigError::new(
                "ProfitMargin",
                "Profit margin must be one of \"normal\", \"75%\", \"50%\", or \"25%\"",
            ))
        }
    };

    let money_style = match config.money_style.as_str() {
        "shared" => MoneyStyle::Shared,
        "separate" => MoneyStyle::Separate,
        _ => {
            return Err(ConfigError::new(
                "MoneyStyle",
                "Money style must be either \"shared\" or \"separate\"",
            ))
        }
    };

    let pet_species = match config.pet_species.as_deref() {
        None => None,
        Some("dog") => Some(PetSpecies::Dog),
        Some("cat") => Some(PetSpecies::Cat),
        Some(_) => {
            return Err(ConfigError::new(
                "PetSpecies",
                "PetSpecies must be either \"dog\" or \"cat\"",
            ))
        }
    };
    if config.accept_pet && pet_species.is_none() {
        warnings.push(ConfigError::new(
            "PetSpecies",
            "PetSpecies must be specified if AcceptPet is true",
        ));
    }

    let pet_breed = match config.pet_breed {
        None => None,
        Some(n @ 0..=2) => Some(n as u8),
        Some(_) => {
            return Err(ConfigError::new(
                "PetBreed",
                "PetBreed must be an integer in [0, 2]",
            ))
        }
    };
    if config.accept_pet && pet_breed.is_none() {
        warnings.push(ConfigError::new(
            "PetBreed",
            "PetBreed must be specified if AcceptPet is true",
        ));
    }

    let farm_type = match config.farm_type.as_str() {
        "standard" => FarmType::Standard,
        "riverland" => FarmType::Riverland,
        "forest" => FarmType::Forest,
        "hilltop" => FarmType::Hilltop,
        "wilderness" => FarmType::Wilderness,
        "fourcorners" => FarmType::FourCorners,
        "beach" => FarmType::Beach,
        _ => {
            return Err(ConfigError::new(
                "FarmType",
                "Farm type must be one of \"standard\", \"riverland\", \"forest\", \"hilltop\", \"wilderness\", \"fourcorners\", or \"beach\"",
            ))
        }
    };

    let bundles = match config.community_center_bundles.as_str() {
        "normal" => BundleVariant::Default,
        "remixed" => BundleVariant::Remixed,
        _ => {
            return Err(ConfigError::new(
                "CommunityCenterBundles",
                "Community center bundles must be either \"normal\" or \"remixed\"",
            ))
        }
    };

    let mine_rewards = match config.mine_rewards.as_str() {
        "normal" => MineRewards::Default,
        "remixed" => MineRewards::Remixed,
        _ => {
            return Err(ConfigError::new(
                "MineRewards",
                "Mine rewards must be either \"normal\" or \"remixed\"",
            ))
        }
    };

    Ok(ValidatedConfig {
        farm_name: config.farm_name.clone(),
        starting_cabins,
        cabin_layout,
        profit_margin,
        money_style,
        pet_species,
        pet_breed,
        farm_type,
        bundles,
        year_one_completable: config.guarantee_year1_completable,
        mine_rewards,
        spawn_monsters_at_night: config.spawn_monsters_on_farm_at_night,
        random_seed: config.random_seed,
        warnings: Vec::new(),
    })
}
