//! Chosen-values input: which value the caller picked for each feature.
//!
//! Values come from a JSON file (`{"HD Font": true, "Shadows": "hard"}`) or
//! from repeated `--set NAME=VALUE` arguments, or both; later sources win.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::types::{parse_assignment, FeatureValue};

/// Feature name → chosen value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChosenValues(BTreeMap<String, FeatureValue>);

impl ChosenValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load chosen values from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read chosen values from {:?}", path.as_ref()))?;

        let values: Self =
            serde_json::from_str(&content).context("Failed to parse chosen values JSON")?;

        Ok(values)
    }

    /// Save chosen values to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize chosen values to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write chosen values to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Build from `NAME=VALUE` strings
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self> {
        let mut values = Self::new();
        for raw in assignments {
            let (name, value) =
                parse_assignment(raw.as_ref()).map_err(|e| anyhow::anyhow!(e))?;
            values.insert(name, value);
        }
        Ok(values)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of these values
    pub fn extend(&mut self, other: ChosenValues) {
        self.0.extend(other.0);
    }
}

impl FromIterator<(String, FeatureValue)> for ChosenValues {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ChosenValues {
    type Item = (&'a String, &'a FeatureValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, FeatureValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"{"HD Font": true, "Shadows": "hard"}"#)
            .unwrap();
        temp_file.flush().unwrap();

        let values = ChosenValues::load_from_file(temp_file.path()).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("HD Font"), Some(&FeatureValue::Bool(true)));
        assert_eq!(values.get("Shadows"), Some(&FeatureValue::State("hard".into())));
    }

    #[test]
    fn test_load_from_missing_file_has_context() {
        let err = ChosenValues::load_from_file("/nonexistent/values.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read chosen values"));
    }

    #[test]
    fn test_load_rejects_nested_values() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(br#"{"Shadows": ["hard"]}"#).unwrap();
        temp_file.flush().unwrap();

        assert!(ChosenValues::load_from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let mut values = ChosenValues::new();
        values.insert("HD Font", false);
        values.insert("Shadows", "soft");

        let temp_file = NamedTempFile::new().unwrap();
        values.save_to_file(temp_file.path()).unwrap();

        assert_eq!(ChosenValues::load_from_file(temp_file.path()).unwrap(), values);
    }

    #[test]
    fn test_from_assignments_later_wins() {
        let values =
            ChosenValues::from_assignments(&["Shadows=soft", "HD Font=TRUE", "Shadows=hard"])
                .unwrap();
        assert_eq!(values.get("Shadows"), Some(&FeatureValue::State("hard".into())));
        assert_eq!(values.get("HD Font"), Some(&FeatureValue::Bool(true)));

        assert!(ChosenValues::from_assignments(&["no-equals-sign"]).is_err());
    }

    #[test]
    fn test_extend_overrides() {
        let mut base: ChosenValues = [("A".to_string(), FeatureValue::Bool(true))]
            .into_iter()
            .collect();
        let mut other = ChosenValues::new();
        other.insert("A", false);
        other.insert("B", "x");
        base.extend(other);

        assert_eq!(base.get("A"), Some(&FeatureValue::Bool(false)));
        assert_eq!(base.len(), 2);
    }
}
