//! Root descriptor loading and validation
//!
//! A pack declares its features in `packset.json` at the pack root:
//! ```json
//! {
//!   "schema_version": 1,
//!   "feature": { "HD Font": "bool", "Shadows": "toggle" },
//!   "config": {
//!     "HD Font": {
//!       "default": false,
//!       "toggle": [
//!         { "id": "font", "file_path": "assets/font/default.png", "type": "bool" }
//!       ]
//!     },
//!     "Shadows": {
//!       "default": "off",
//!       "scope": ["off", "soft", "hard"],
//!       "paths": [{ "file_path": "packset/shadows.json" }]
//!     }
//!   },
//!   "category": {
//!     "list": ["visual"],
//!     "data": { "visual": { "name": "Visual", "description": "", "list": ["Shadows"] } }
//!   }
//! }
//! ```
//!
//! # Validation
//!
//! The whole descriptor is rejected when the root is not an object, when
//! `schema_version` is not 1, when `feature` is not a map of names to
//! `"bool"`/`"toggle"`, or when `config` lacks an entry for a declared
//! feature. A feature whose own configuration is malformed is kept but
//! marked invalid, so it fails on its own without blocking the others.
//! Rows with an empty `file_path` in `toggle` or `paths` are dropped with a
//! warning; paths that leave the pack still invalidate the feature.
//! `category` is display-only and never rejects anything.

use crate::error::{PacksetError, Result};
use crate::storage::Storage;
use crate::types::{lenient_bool, FeatureKind, ItemKind, DESCRIPTOR_FILE, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::str::FromStr;
use tracing::{debug, warn};

// ============================================================================
// Feature configuration
// ============================================================================

/// Configuration of a bool feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolFeatureConfig {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub default: bool,
    #[serde(default)]
    pub toggle: Vec<ToggleItem>,
}

/// One entry of a bool feature's `toggle` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleItem {
    #[serde(default)]
    pub id: String,
    pub file_path: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
}

/// Configuration of a toggle feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleFeatureConfig {
    pub default: String,
    pub scope: Vec<String>,
    #[serde(default)]
    pub paths: Vec<PathItem>,
}

/// Reference from a toggle feature to one of its toggle sub-descriptors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathItem {
    pub file_path: String,
}

impl ToggleFeatureConfig {
    /// Position of `state` in `scope`
    pub fn scope_index(&self, state: &str) -> Option<usize> {
        self.scope.iter().position(|s| s == state)
    }
}

/// Kind-tagged configuration of a feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureConfig {
    Bool(BoolFeatureConfig),
    Toggle(ToggleFeatureConfig),
}

impl FeatureConfig {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Bool(_) => FeatureKind::Bool,
            Self::Toggle(_) => FeatureKind::Toggle,
        }
    }
}

/// A declared feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub kind: FeatureKind,
    config: std::result::Result<FeatureConfig, String>,
}

impl Feature {
    /// Validated configuration, or `InvalidFormat` if it was malformed
    pub fn config(&self) -> Result<&FeatureConfig> {
        self.config.as_ref().map_err(|reason| {
            PacksetError::invalid_format(
                DESCRIPTOR_FILE,
                format!("feature '{}': {}", self.name, reason),
            )
        })
    }

    pub fn is_valid(&self) -> bool {
        self.config.is_ok()
    }

    /// Pack-relative paths of every sub-descriptor this feature references
    pub fn sub_descriptor_paths(&self) -> Vec<&str> {
        match &self.config {
            Ok(FeatureConfig::Bool(cfg)) => cfg
                .toggle
                .iter()
                .filter(|item| item.kind == ItemKind::Toggle)
                .map(|item| item.file_path.as_str())
                .collect(),
            Ok(FeatureConfig::Toggle(cfg)) => {
                cfg.paths.iter().map(|p| p.file_path.as_str()).collect()
            }
            Err(_) => Vec::new(),
        }
    }
}

// ============================================================================
// Categories (display only)
// ============================================================================

/// `category` block: ordered category ids plus per-id details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryIndex {
    #[serde(default)]
    pub list: Vec<String>,
    #[serde(default)]
    pub data: BTreeMap<String, CategoryInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub list: Vec<String>,
}

/// A titled group of features for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayGroup {
    /// Category id, `None` for the trailing ungrouped block
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub features: Vec<String>,
}

// ============================================================================
// Root descriptor
// ============================================================================

/// Parsed and validated root descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacksetDescriptor {
    pub schema_version: u64,
    /// Features in declaration order
    pub features: Vec<Feature>,
    pub category: Option<CategoryIndex>,
}

impl PacksetDescriptor {
    /// Load `packset.json` from the pack root
    pub fn load(backend: &dyn Storage) -> Result<Self> {
        Self::load_from(backend, DESCRIPTOR_FILE)
    }

    /// Load a root descriptor stored at `path` inside the pack
    pub fn load_from(backend: &dyn Storage, path: &str) -> Result<Self> {
        let value = backend.read_structured(path).map_err(|e| match e {
            PacksetError::MissingFile { .. } => {
                PacksetError::invalid_format(path, "descriptor file not found")
            }
            other => other,
        })?;
        let descriptor = Self::from_value(path, &value)?;
        debug!(
            "Loaded {} with {} feature(s)",
            path,
            descriptor.features.len()
        );
        Ok(descriptor)
    }

    /// Validate an already-parsed JSON value
    pub fn from_value(path: &str, value: &Value) -> Result<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| PacksetError::invalid_format(path, "root must be a JSON object"))?;
        check_schema_version(path, root)?;

        let declared = root
            .get("feature")
            .and_then(Value::as_object)
            .ok_or_else(|| PacksetError::invalid_format(path, "'feature' must be an object"))?;
        let configs = root
            .get("config")
            .and_then(Value::as_object)
            .ok_or_else(|| PacksetError::invalid_format(path, "'config' must be an object"))?;

        let mut features = Vec::with_capacity(declared.len());
        for (name, kind) in declared {
            let kind = kind
                .as_str()
                .and_then(|k| FeatureKind::from_str(k).ok())
                .ok_or_else(|| {
                    PacksetError::invalid_format(
                        path,
                        format!("feature '{name}' has kind {kind}, expected \"bool\" or \"toggle\""),
                    )
                })?;
            let raw = configs.get(name).ok_or_else(|| {
                PacksetError::invalid_format(path, format!("no config entry for feature '{name}'"))
            })?;

            let config = parse_feature_config(kind, raw);
            if let Err(reason) = &config {
                warn!("Feature '{}' in {} is invalid: {}", name, path, reason);
            }
            features.push(Feature {
                name: name.clone(),
                kind,
                config,
            });
        }

        let category = match root.get("category") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<CategoryIndex>(raw.clone()) {
                Ok(index) => Some(index),
                Err(e) => {
                    warn!("Ignoring malformed category block in {}: {}", path, e);
                    None
                }
            },
        };

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            features,
            category,
        })
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    /// Features grouped by category in category order. Features that no
    /// category lists are appended as a final untitled group; unknown
    /// category ids and feature names are skipped.
    pub fn display_groups(&self) -> Vec<DisplayGroup> {
        let mut groups = Vec::new();
        let mut grouped: Vec<&str> = Vec::new();

        if let Some(index) = &self.category {
            for id in &index.list {
                let Some(info) = index.data.get(id) else {
                    debug!("Category '{}' has no data entry", id);
                    continue;
                };
                let features: Vec<String> = info
                    .list
                    .iter()
                    .filter(|name| self.feature(name).is_some())
                    .cloned()
                    .collect();
                grouped.extend(info.list.iter().map(String::as_str));
                groups.push(DisplayGroup {
                    id: Some(id.clone()),
                    title: info.name.clone().unwrap_or_else(|| id.clone()),
                    description: info.description.clone(),
                    features,
                });
            }
        }

        let ungrouped: Vec<String> = self
            .feature_names()
            .filter(|name| !grouped.contains(name))
            .map(str::to_string)
            .collect();
        if !ungrouped.is_empty() {
            groups.push(DisplayGroup {
                id: None,
                title: String::new(),
                description: String::new(),
                features: ungrouped,
            });
        }
        groups
    }
}

// ============================================================================
// Shared validation helpers
// ============================================================================

/// Require `schema_version` to be exactly 1
pub(crate) fn check_schema_version(path: &str, root: &Map<String, Value>) -> Result<()> {
    match root.get("schema_version").and_then(Value::as_u64) {
        Some(SCHEMA_VERSION) => Ok(()),
        Some(other) => Err(PacksetError::invalid_format(
            path,
            format!("unsupported schema_version {other}, expected {SCHEMA_VERSION}"),
        )),
        None => Err(PacksetError::invalid_format(
            path,
            "schema_version is missing or not an integer",
        )),
    }
}

/// A pack-relative path must be non-empty, relative, and stay inside the pack
pub(crate) fn check_relative_path(path: &str) -> std::result::Result<(), String> {
    if path.trim().is_empty() {
        return Err("empty file path".to_string());
    }
    let escapes = Path::new(path).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || path.starts_with('/') || path.starts_with('\\') {
        return Err(format!("path '{path}' must be relative to the pack root"));
    }
    Ok(())
}

fn parse_feature_config(kind: FeatureKind, raw: &Value) -> std::result::Result<FeatureConfig, String> {
    match kind {
        FeatureKind::Bool => {
            let mut cfg: BoolFeatureConfig =
                serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;
            cfg.toggle.retain(|item| {
                let keep = !item.file_path.trim().is_empty();
                if !keep {
                    warn!("Skipping toggle item '{}' with empty file_path", item.id);
                }
                keep
            });
            for item in &cfg.toggle {
                check_relative_path(&item.file_path)?;
            }
            Ok(FeatureConfig::Bool(cfg))
        }
        FeatureKind::Toggle => {
            let mut cfg: ToggleFeatureConfig =
                serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;
            cfg.paths.retain(|item| {
                let keep = !item.file_path.trim().is_empty();
                if !keep {
                    warn!("Skipping paths entry with empty file_path");
                }
                keep
            });
            if cfg.scope.is_empty() {
                return Err("scope is empty".to_string());
            }
            if cfg.scope_index(&cfg.default).is_none() {
                return Err(format!("default '{}' is not in scope", cfg.default));
            }
            for item in &cfg.paths {
                check_relative_path(&item.file_path)?;
            }
            Ok(FeatureConfig::Toggle(cfg))
        }
    }
}
