//! Persisted record of the last applied values (`packset_config.json`)
//!
//! The record is a flat JSON object of feature name → value. It is read
//! before every apply to learn each toggle feature's previous state, and
//! merged on write so keys this engine does not know about survive.

use crate::config_file::ChosenValues;
use crate::descriptor::{FeatureConfig, PacksetDescriptor};
use crate::error::{PacksetError, Result};
use crate::storage::Storage;
use crate::types::{FeatureValue, SAVED_CONFIG_FILE};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedConfig {
    entries: Map<String, Value>,
}

impl SavedConfig {
    /// Load the record from the pack root. A missing file is an empty record;
    /// an unreadable one is logged and treated as empty.
    pub fn load(backend: &dyn Storage) -> Result<Self> {
        if !backend.exists(SAVED_CONFIG_FILE) {
            debug!("No {} yet", SAVED_CONFIG_FILE);
            return Ok(Self::default());
        }
        match backend.read_structured(SAVED_CONFIG_FILE) {
            Ok(Value::Object(entries)) => Ok(Self { entries }),
            Ok(other) => {
                warn!("{} is not a JSON object ({}); starting fresh", SAVED_CONFIG_FILE, other);
                Ok(Self::default())
            }
            Err(e @ PacksetError::InvalidFormat { .. }) | Err(e @ PacksetError::MissingFile { .. }) => {
                warn!("Ignoring unreadable {}: {}", SAVED_CONFIG_FILE, e);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Write the record to the pack root
    pub fn save(&self, backend: &mut dyn Storage) -> Result<()> {
        backend.write_structured(SAVED_CONFIG_FILE, &Value::Object(self.entries.clone()))?;
        info!("Saved {} ({} entries)", SAVED_CONFIG_FILE, self.entries.len());
        Ok(())
    }

    /// Last applied value of a feature, if it is a boolean or a string
    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        match self.entries.get(name)? {
            Value::Bool(b) => Some(FeatureValue::Bool(*b)),
            Value::String(s) => Some(FeatureValue::State(s.clone())),
            _ => None,
        }
    }

    /// Raw stored value, including keys this engine does not manage
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite the given keys, leaving all others untouched. Returns true
    /// if anything changed.
    pub fn merge<'a, I>(&mut self, updates: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a FeatureValue)>,
    {
        let mut changed = false;
        for (name, value) in updates {
            let value = match value {
                FeatureValue::Bool(b) => Value::Bool(*b),
                FeatureValue::State(s) => Value::String(s.clone()),
            };
            if self.entries.get(name) != Some(&value) {
                self.entries.insert(name.to_string(), value);
                changed = true;
            }
        }
        changed
    }

    /// Value a toggle feature was last switched to, falling back to the
    /// declared default when nothing valid is recorded.
    pub fn previous_state(&self, name: &str, default: &str, scope: &[String]) -> String {
        match self.get(name) {
            Some(FeatureValue::State(s)) if scope.contains(&s) => s,
            Some(other) => {
                warn!(
                    "Saved value '{}' for '{}' is not in scope; assuming '{}'",
                    other, name, default
                );
                default.to_string()
            }
            None => default.to_string(),
        }
    }
}

/// The value each valid feature shows: its saved value when present and
/// valid for the feature, otherwise its declared default.
pub fn effective_values(descriptor: &PacksetDescriptor, saved: &SavedConfig) -> ChosenValues {
    let mut values = ChosenValues::new();
    for feature in &descriptor.features {
        let Ok(config) = feature.config() else {
            continue;
        };
        let saved_value = saved.get(&feature.name);
        let value = match config {
            FeatureConfig::Bool(cfg) => FeatureValue::Bool(
                saved_value
                    .and_then(|v| v.as_bool())
                    .unwrap_or(cfg.default),
            ),
            FeatureConfig::Toggle(cfg) => match saved_value {
                Some(FeatureValue::State(s)) if cfg.scope.contains(&s) => FeatureValue::State(s),
                _ => FeatureValue::State(cfg.default.clone()),
            },
        };
        values.insert(feature.name.clone(), value);
    }
    values
}
