//! Sub-descriptors referenced from feature configurations
//!
//! Bool sub-descriptor (delegated from a bool feature's `toggle` item):
//! ```json
//! {
//!   "schema_version": 1,
//!   "type": "bool",
//!   "assets": [{ "file_path": "textures/sky.png", "default": "on" }],
//!   "toggles": [{ "name": "clouds", "path": "textures/clouds.png", "toggle_path": "alt/clouds.png" }]
//! }
//! ```
//!
//! Toggle sub-descriptor (one per `paths` entry of a toggle feature):
//! ```json
//! {
//!   "schema_version": 1,
//!   "type": "toggle",
//!   "states": [
//!     { "name": "off", "file_path": "shaders/shadow.fsh" },
//!     { "name": "soft", "file_path": "packset/shadow/soft.fsh" }
//!   ]
//! }
//! ```
//!
//! Each sub-descriptor is validated on its own when the feature that
//! references it is applied. Entries with an empty path are skipped with a
//! warning, as pack editors leave them behind when rows are cleared.

use crate::descriptor::{check_relative_path, check_schema_version};
use crate::error::{PacksetError, Result};
use crate::storage::Storage;
use crate::types::AssetDefault;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Asset shown or parked by a bool sub-descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub default: AssetDefault,
}

/// Two files sharing the slot `path`; the alternate lives at `toggle_path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPair {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub toggle_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubPacksetBool {
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
    #[serde(default)]
    pub toggles: Vec<SwapPair>,
}

/// One selectable variant of a toggle group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleState {
    pub name: String,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubPacksetToggle {
    pub states: Vec<ToggleState>,
}

impl SubPacksetToggle {
    /// Index of the state called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }
}

impl SubPacksetBool {
    /// Load and validate a bool sub-descriptor
    pub fn load(backend: &dyn Storage, path: &str) -> Result<Self> {
        let mut sub: Self = load_typed(backend, path, "bool")?;

        sub.assets.retain(|asset| {
            let keep = !asset.file_path.trim().is_empty();
            if !keep {
                warn!("Skipping asset with empty file_path in {}", path);
            }
            keep
        });
        sub.toggles.retain(|pair| {
            let keep = !pair.path.trim().is_empty() && !pair.toggle_path.trim().is_empty();
            if !keep {
                warn!("Skipping incomplete swap pair '{}' in {}", pair.name, path);
            }
            keep
        });

        for asset in &sub.assets {
            check_relative_path(&asset.file_path)
                .map_err(|reason| PacksetError::invalid_format(path, reason))?;
        }
        for pair in &sub.toggles {
            check_relative_path(&pair.path)
                .and_then(|()| check_relative_path(&pair.toggle_path))
                .map_err(|reason| PacksetError::invalid_format(path, reason))?;
            if pair.path == pair.toggle_path {
                return Err(PacksetError::invalid_format(
                    path,
                    format!("swap pair '{}' uses the same path twice", pair.name),
                ));
            }
        }
        Ok(sub)
    }
}

impl SubPacksetToggle {
    /// Load and validate a toggle sub-descriptor
    pub fn load(backend: &dyn Storage, path: &str) -> Result<Self> {
        let sub: Self = load_typed(backend, path, "toggle")?;

        if sub.states.is_empty() {
            return Err(PacksetError::invalid_format(path, "no states declared"));
        }
        for state in &sub.states {
            check_relative_path(&state.file_path).map_err(|reason| {
                PacksetError::invalid_format(path, format!("state '{}': {}", state.name, reason))
            })?;
        }
        Ok(sub)
    }
}

/// Read `path`, check the common header, and deserialize the body
fn load_typed<T: DeserializeOwned>(backend: &dyn Storage, path: &str, expected: &str) -> Result<T> {
    let value = backend.read_structured(path)?;
    let root = value
        .as_object()
        .ok_or_else(|| PacksetError::invalid_format(path, "root must be a JSON object"))?;
    check_schema_version(path, root)?;

    match root.get("type").and_then(Value::as_str) {
        Some(kind) if kind == expected => {}
        Some(kind) => {
            return Err(PacksetError::invalid_format(
                path,
                format!("sub-descriptor type is \"{kind}\", expected \"{expected}\""),
            ));
        }
        None => {
            return Err(PacksetError::invalid_format(path, "sub-descriptor type is missing"));
        }
    }

    serde_json::from_value(value.clone())
        .map_err(|e| PacksetError::invalid_format(path, e.to_string()))
}
