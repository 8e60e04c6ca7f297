//! Read-only inspection of a pack's on-disk feature state
//!
//! Derives, for every declared feature, where each managed file currently
//! sits and whether that matches the feature's effective value. Nothing is
//! renamed or written.

use super::toggle_feature::resolve_index;
use crate::descriptor::{BoolFeatureConfig, FeatureConfig, PacksetDescriptor, ToggleFeatureConfig};
use crate::error::{PacksetError, Result};
use crate::saved_config::{effective_values, SavedConfig};
use crate::storage::Storage;
use crate::sub_descriptor::{SubPacksetBool, SubPacksetToggle};
use crate::types::{parked_path, FeatureKind, FeatureValue, ItemKind};
use std::fmt;

/// Where a managed single asset currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AssetState {
    /// At its canonical name
    Active,
    /// Under the parking suffix
    Parked,
    /// Neither name exists
    Missing,
    /// Both names exist
    Conflicting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetStatus {
    pub path: String,
    pub state: AssetState,
    /// Whether the effective value wants the asset active
    pub expected_active: bool,
}

impl AssetStatus {
    pub fn matches_expectation(&self) -> bool {
        match self.state {
            AssetState::Active => self.expected_active,
            AssetState::Parked => !self.expected_active,
            AssetState::Missing | AssetState::Conflicting => false,
        }
    }
}

/// Occupant of a toggle group's canonical slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatus {
    pub source: String,
    pub canonical: String,
    /// Name of the state whose content is in the canonical slot
    pub active: Option<String>,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureStatus {
    pub name: String,
    pub kind: FeatureKind,
    /// Saved value if valid, else the declared default
    pub value: Option<FeatureValue>,
    pub assets: Vec<AssetStatus>,
    pub groups: Vec<GroupStatus>,
    /// Invariant violations and mismatches found
    pub problems: Vec<String>,
}

impl FeatureStatus {
    pub fn is_consistent(&self) -> bool {
        self.problems.is_empty()
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .value
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        write!(f, "{} ({}) = {}", self.name, self.kind, value)?;
        for asset in &self.assets {
            write!(f, "\n    {} [{}]", asset.path, asset.state)?;
        }
        for group in &self.groups {
            let active = group.active.as_deref().unwrap_or("?");
            write!(f, "\n    {} <- {}", group.canonical, active)?;
        }
        for problem in &self.problems {
            write!(f, "\n    ! {}", problem)?;
        }
        Ok(())
    }
}

/// Inspect every declared feature of the pack behind `backend`
pub fn inspect(descriptor: &PacksetDescriptor, backend: &dyn Storage) -> Result<Vec<FeatureStatus>> {
    let saved = SavedConfig::load(backend)?;
    let values = effective_values(descriptor, &saved);

    let mut statuses = Vec::with_capacity(descriptor.features.len());
    for feature in &descriptor.features {
        let value = values.get(&feature.name).cloned();
        let mut status = FeatureStatus {
            name: feature.name.clone(),
            kind: feature.kind,
            value: None,
            assets: Vec::new(),
            groups: Vec::new(),
            problems: Vec::new(),
        };

        match (feature.config(), &value) {
            (Err(e), _) => status.problems.push(e.to_string()),
            (Ok(FeatureConfig::Bool(cfg)), Some(FeatureValue::Bool(enabled))) => {
                inspect_bool(backend, cfg, *enabled, &mut status);
            }
            (Ok(FeatureConfig::Toggle(cfg)), Some(FeatureValue::State(selected))) => {
                inspect_toggle(backend, cfg, selected, &mut status);
            }
            (Ok(_), _) => status.problems.push("no effective value".to_string()),
        }
        status.value = value;
        statuses.push(status);
    }
    Ok(statuses)
}

/// A problem found while validating a pack without applying anything
#[derive(Debug)]
pub struct ValidationIssue {
    pub feature: String,
    pub error: PacksetError,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.feature, self.error)
    }
}

/// Load every sub-descriptor the descriptor references and check that each
/// toggle group can resolve every state in its feature's scope. Missing
/// sub-descriptor files are reported here even though apply skips them.
pub fn validate(descriptor: &PacksetDescriptor, backend: &dyn Storage) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for feature in &descriptor.features {
        let mut report = |error: PacksetError| {
            issues.push(ValidationIssue {
                feature: feature.name.clone(),
                error,
            })
        };
        let config = match feature.config() {
            Ok(config) => config,
            Err(e) => {
                report(e);
                continue;
            }
        };
        match config {
            FeatureConfig::Bool(cfg) => {
                for item in cfg.toggle.iter().filter(|i| i.kind == ItemKind::Toggle) {
                    if let Err(e) = SubPacksetBool::load(backend, &item.file_path) {
                        report(e);
                    }
                }
            }
            FeatureConfig::Toggle(cfg) => {
                for item in &cfg.paths {
                    let sub = match SubPacksetToggle::load(backend, &item.file_path) {
                        Ok(sub) => sub,
                        Err(e) => {
                            report(e);
                            continue;
                        }
                    };
                    for state in &cfg.scope {
                        if resolve_index(cfg, &sub, state).is_none() {
                            report(PacksetError::invalid_format(
                                item.file_path.as_str(),
                                format!("scope entry '{state}' has no matching state"),
                            ));
                        }
                    }
                }
            }
        }
    }
    issues
}

fn asset_status(backend: &dyn Storage, path: &str, expected_active: bool) -> AssetStatus {
    let state = match (backend.exists(path), backend.exists(&parked_path(path))) {
        (true, false) => AssetState::Active,
        (false, true) => AssetState::Parked,
        (false, false) => AssetState::Missing,
        (true, true) => AssetState::Conflicting,
    };
    AssetStatus {
        path: path.to_string(),
        state,
        expected_active,
    }
}

fn push_asset(status: &mut FeatureStatus, asset: AssetStatus) {
    if !asset.matches_expectation() {
        let wanted = if asset.expected_active { "active" } else { "parked" };
        status
            .problems
            .push(format!("{} is {} but should be {}", asset.path, asset.state, wanted));
    }
    status.assets.push(asset);
}

fn inspect_bool(backend: &dyn Storage, cfg: &BoolFeatureConfig, enabled: bool, status: &mut FeatureStatus) {
    let is_default = enabled == cfg.default;

    for item in &cfg.toggle {
        match item.kind {
            ItemKind::Bool => push_asset(status, asset_status(backend, &item.file_path, is_default)),
            ItemKind::Toggle => {
                let sub = match SubPacksetBool::load(backend, &item.file_path) {
                    Ok(sub) => sub,
                    Err(e) => {
                        status.problems.push(e.to_string());
                        continue;
                    }
                };
                for asset in &sub.assets {
                    let expected = asset.default.is_active(is_default);
                    push_asset(status, asset_status(backend, &asset.file_path, expected));
                }
                for pair in &sub.toggles {
                    let showing_default = !backend.exists(&parked_path(&pair.path));
                    if !backend.exists(&pair.path) {
                        status.problems.push(format!("{} is empty", pair.path));
                    } else if showing_default != is_default {
                        status.problems.push(format!(
                            "{} shows the {} content",
                            pair.path,
                            if showing_default { "default" } else { "alternate" }
                        ));
                    }
                    if !showing_default && backend.exists(&pair.toggle_path) {
                        status.problems.push(format!(
                            "{} still exists while its content is swapped in",
                            pair.toggle_path
                        ));
                    }
                }
            }
        }
    }
}

fn inspect_toggle(backend: &dyn Storage, cfg: &ToggleFeatureConfig, selected: &str, status: &mut FeatureStatus) {
    for item in &cfg.paths {
        let sub = match SubPacksetToggle::load(backend, &item.file_path) {
            Ok(sub) => sub,
            Err(e) => {
                status.problems.push(e.to_string());
                continue;
            }
        };
        let (Some(default), Some(current)) = (
            resolve_index(cfg, &sub, &cfg.default),
            resolve_index(cfg, &sub, selected),
        ) else {
            status
                .problems
                .push(format!("{}: states do not cover the feature scope", item.file_path));
            continue;
        };

        let canonical = sub.states[default].file_path.clone();
        let parked = backend.exists(&parked_path(&canonical));
        let vacant: Vec<usize> = (0..sub.states.len())
            .filter(|&i| i != default && !backend.exists(&sub.states[i].file_path))
            .collect();

        let active = if !parked {
            for &i in &vacant {
                status
                    .problems
                    .push(format!("content of state '{}' is missing", sub.states[i].name));
            }
            Some(default)
        } else {
            match vacant.as_slice() {
                [one] => Some(*one),
                [] => {
                    status
                        .problems
                        .push(format!("{} holds content of no declared state", canonical));
                    None
                }
                _ => {
                    status
                        .problems
                        .push(format!("several variants of {} are missing", canonical));
                    None
                }
            }
        };
        if !backend.exists(&canonical) {
            status.problems.push(format!("{} is empty", canonical));
        }

        if let Some(active) = active {
            if active != current {
                status.problems.push(format!(
                    "{} shows '{}' but '{}' is selected",
                    canonical, sub.states[active].name, sub.states[current].name
                ));
            }
        }

        status.groups.push(GroupStatus {
            source: item.file_path.clone(),
            canonical,
            active: active.map(|i| sub.states[i].name.clone()),
            expected: sub.states[current].name.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file::ChosenValues;
    use crate::engine::orchestrator::apply;
    use crate::storage::DirectoryBackend;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, path: &str, content: &str) {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    fn sample() -> (TempDir, DirectoryBackend, PacksetDescriptor) {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "packset.json",
            &json!({
                "schema_version": 1,
                "feature": { "HD Font": "bool", "Shadows": "toggle" },
                "config": {
                    "HD Font": {
                        "default": false,
                        "toggle": [{ "id": "f", "file_path": "font.png", "type": "bool" }]
                    },
                    "Shadows": {
                        "default": "off",
                        "scope": ["off", "hard"],
                        "paths": [{ "file_path": "shadows.json" }]
                    }
                }
            })
            .to_string(),
        );
        write(
            &dir,
            "shadows.json",
            &json!({
                "schema_version": 1,
                "type": "toggle",
                "states": [
                    { "name": "off", "file_path": "shadow.fsh" },
                    { "name": "hard", "file_path": "variants/hard.fsh" }
                ]
            })
            .to_string(),
        );
        write(&dir, "font.png", "F");
        write(&dir, "shadow.fsh", "OFF");
        write(&dir, "variants/hard.fsh", "HARD");
        let backend = DirectoryBackend::open(dir.path()).unwrap();
        let descriptor = PacksetDescriptor::load(&backend).unwrap();
        (dir, backend, descriptor)
    }

    #[test]
    fn test_fresh_pack_is_consistent() {
        let (_dir, backend, descriptor) = sample();
        let statuses = inspect(&descriptor, &backend).unwrap();

        assert!(statuses.iter().all(FeatureStatus::is_consistent));
        assert_eq!(statuses[0].assets[0].state, AssetState::Active);
        assert_eq!(statuses[1].groups[0].active.as_deref(), Some("off"));
    }

    #[test]
    fn test_applied_pack_is_consistent() {
        let (_dir, mut backend, descriptor) = sample();
        let mut values = ChosenValues::new();
        values.insert("HD Font", true);
        values.insert("Shadows", "hard");
        apply(&descriptor, &values, &mut backend).unwrap();

        let statuses = inspect(&descriptor, &backend).unwrap();
        assert!(statuses.iter().all(FeatureStatus::is_consistent), "{statuses:?}");
        assert_eq!(statuses[0].assets[0].state, AssetState::Parked);
        assert_eq!(statuses[1].groups[0].active.as_deref(), Some("hard"));
    }

    #[test]
    fn test_reports_conflicting_asset() {
        let (dir, backend, descriptor) = sample();
        write(&dir, "font.png.packset.old", "stale");

        let statuses = inspect(&descriptor, &backend).unwrap();
        assert_eq!(statuses[0].assets[0].state, AssetState::Conflicting);
        assert!(!statuses[0].is_consistent());
    }

    #[test]
    fn test_validate_clean_pack() {
        let (_dir, backend, descriptor) = sample();
        assert!(validate(&descriptor, &backend).is_empty());
    }

    #[test]
    fn test_validate_reports_missing_and_short_groups() {
        let (dir, backend, descriptor) = sample();
        write(
            &dir,
            "shadows.json",
            r#"{"schema_version": 1, "type": "toggle", "states": [{"name": "off", "file_path": "shadow.fsh"}]}"#,
        );
        let issues = validate(&descriptor, &backend);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].feature, "Shadows");
        assert!(issues[0].to_string().contains("'hard'"));

        fs::remove_file(dir.path().join("shadows.json")).unwrap();
        let issues = validate(&descriptor, &backend);
        assert!(issues[0].error.is_missing_file());
    }

    #[test]
    fn test_reports_saved_value_mismatch() {
        let (dir, backend, descriptor) = sample();
        write(&dir, "packset_config.json", r#"{"Shadows": "hard"}"#);

        let statuses = inspect(&descriptor, &backend).unwrap();
        assert!(statuses[0].is_consistent());
        assert!(statuses[1].problems[0].contains("shows 'off' but 'hard' is selected"));
    }
}
