//! Type-safe building blocks shared by the descriptor loader and the engine
//!
//! Kind strings from the descriptor format ("bool", "toggle", "on", "off")
//! are parsed once into enums so the rest of the crate matches exhaustively
//! instead of comparing strings.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// Root descriptor file name at the top of every pack
pub const DESCRIPTOR_FILE: &str = "packset.json";

/// Persisted record of the last applied values, at the pack root
pub const SAVED_CONFIG_FILE: &str = "packset_config.json";

/// Suffix marking a parked (inactive) variant of a file
pub const PARKED_SUFFIX: &str = ".packset.old";

/// The only descriptor schema version this engine understands
pub const SCHEMA_VERSION: u64 = 1;

/// Returns the parking name for a pack-relative path
pub fn parked_path(path: &str) -> String {
    format!("{path}{PARKED_SUFFIX}")
}

/// Kind of a top-level feature as declared in the `feature` map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// On/off switch
    Bool,
    /// N-way variant selector
    Toggle,
}

/// Kind of an entry in a bool feature's `toggle` list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// `file_path` is an asset that is shown or parked directly
    Bool,
    /// `file_path` is a bool sub-descriptor listing assets and swap pairs
    Toggle,
}

/// Declared default visibility of an asset inside a bool sub-descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssetDefault {
    On,
    #[default]
    Off,
}

impl AssetDefault {
    /// Whether the asset should be visible given the parent feature's
    /// `is_default` flag.
    pub fn is_active(self, is_default: bool) -> bool {
        (self == Self::On) == is_default
    }
}

/// A value chosen for a feature: a boolean for bool features, a state name
/// for toggle features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    State(String),
}

impl FeatureValue {
    /// Interpret this value as a boolean. The strings "true" and "false"
    /// (any case) are accepted because older pack editors saved them that way.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::State(s) => parse_bool_str(s),
        }
    }

    /// Interpret this value as a toggle state name
    pub fn as_state(&self) -> Option<&str> {
        match self {
            Self::State(s) => Some(s.as_str()),
            Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::State(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::State(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        Self::State(value)
    }
}

fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Deserialize a boolean that may also be written as "true"/"false"
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = FeatureValue::deserialize(deserializer)?;
    value
        .as_bool()
        .ok_or_else(|| serde::de::Error::custom(format!("expected a boolean, got \"{value}\"")))
}

/// Parse a `NAME=VALUE` assignment from the command line.
///
/// `true`/`false` become booleans; anything else is a state name. The split
/// happens at the last `=` so feature names may contain one.
pub fn parse_assignment(raw: &str) -> Result<(String, FeatureValue), String> {
    let (name, value) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("feature name is empty in '{raw}'"));
    }
    let value = match parse_bool_str(value) {
        Some(b) => FeatureValue::Bool(b),
        None => FeatureValue::State(value.trim().to_string()),
    };
    Ok((name.to_string(), value))
}
