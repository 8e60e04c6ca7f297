//! Config orchestrator: dispatches chosen values to the appliers and keeps
//! the saved configuration in step.

use super::bool_feature::apply_bool_feature;
use super::toggle_feature::apply_toggle_feature;
use crate::config_file::ChosenValues;
use crate::descriptor::{Feature, FeatureConfig, PacksetDescriptor};
use crate::error::{PacksetError, Result};
use crate::saved_config::SavedConfig;
use crate::storage::{open_pack, RenameOp, Storage};
use crate::types::{FeatureKind, FeatureValue, DESCRIPTOR_FILE};
use std::fmt;
use std::path::Path;
use tracing::{error, info, warn};

// ============================================================================
// Report types
// ============================================================================

/// What happened to one feature during an apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureOutcome {
    Applied,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureReport {
    pub name: String,
    pub kind: FeatureKind,
    pub value: FeatureValue,
    pub outcome: FeatureOutcome,
}

/// Result of one apply call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Features that were both declared and chosen, in declaration order
    pub features: Vec<FeatureReport>,
    /// Chosen names the descriptor does not declare
    pub unknown: Vec<String>,
    /// Whether `packset_config.json` was (or in a dry run, would be) rewritten
    pub saved_config_written: bool,
    /// Every rename performed, in order
    pub renames: Vec<RenameOp>,
}

impl ApplyReport {
    pub fn has_failures(&self) -> bool {
        self.features
            .iter()
            .any(|f| matches!(f.outcome, FeatureOutcome::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.features.iter().filter_map(|f| match &f.outcome {
            FeatureOutcome::Failed(reason) => Some((f.name.as_str(), reason.as_str())),
            FeatureOutcome::Applied => None,
        })
    }

    /// Returns a summary of the report for logging/display.
    pub fn summary(&self) -> String {
        let applied = self.features.len() - self.failures().count();
        let mut lines = vec![format!(
            "Applied {} of {} feature(s), {} rename(s)",
            applied,
            self.features.len(),
            self.renames.len()
        )];
        for (i, op) in self.renames.iter().enumerate() {
            lines.push(format!("  {}. {}", i + 1, op));
        }
        for (name, reason) in self.failures() {
            lines.push(format!("  FAILED {}: {}", name, reason));
        }
        for name in &self.unknown {
            lines.push(format!("  ignored unknown feature '{}'", name));
        }
        if self.saved_config_written {
            lines.push("  saved configuration updated".to_string());
        }
        lines.join("\n")
    }
}

impl fmt::Display for FeatureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

// ============================================================================
// Apply
// ============================================================================

/// Apply `chosen` to the pack behind `backend`.
///
/// Every feature named both in the descriptor and in `chosen` is processed in
/// declaration order. Per-feature errors are logged and recorded; storage
/// failures abort the call. Afterwards the saved configuration is merged with
/// the values that were applied and rewritten only if it changed.
///
/// Only features reported `Applied` are written to the saved configuration,
/// not every key in `chosen`. A rejected value, or a toggle feature whose
/// selected variant is missing in some group, keeps its previously saved
/// value, which later applies rely on to find the slot occupant.
pub fn apply(
    descriptor: &PacksetDescriptor,
    chosen: &ChosenValues,
    backend: &mut dyn Storage,
) -> Result<ApplyReport> {
    let mut saved = SavedConfig::load(backend)?;
    let mut report = ApplyReport {
        unknown: chosen
            .iter()
            .filter(|(name, _)| descriptor.feature(name).is_none())
            .map(|(name, _)| name.clone())
            .collect(),
        ..Default::default()
    };
    for name in &report.unknown {
        warn!("Chosen value for undeclared feature '{}' ignored", name);
    }

    for feature in &descriptor.features {
        let Some(value) = chosen.get(&feature.name) else {
            continue;
        };

        let entry = match apply_feature(backend, feature, value, &saved) {
            Ok(applied) => {
                info!("Applied '{}' = {}", feature.name, applied);
                FeatureReport {
                    name: feature.name.clone(),
                    kind: feature.kind,
                    value: applied,
                    outcome: FeatureOutcome::Applied,
                }
            }
            Err(e) if e.is_fatal() => {
                error!("Aborting apply at '{}': {}", feature.name, e);
                return Err(e);
            }
            Err(e) => {
                error!("Feature '{}' failed: {}", feature.name, e);
                FeatureReport {
                    name: feature.name.clone(),
                    kind: feature.kind,
                    value: value.clone(),
                    outcome: FeatureOutcome::Failed(e.to_string()),
                }
            }
        };
        report.features.push(entry);
    }

    let applied = report
        .features
        .iter()
        .filter(|f| f.outcome == FeatureOutcome::Applied)
        .map(|f| (f.name.as_str(), &f.value));
    if saved.merge(applied) {
        saved.save(backend)?;
        report.saved_config_written = true;
    }

    report.renames = backend.take_renames();
    Ok(report)
}

/// Validate `value` against the feature and run the matching applier.
/// Returns the normalized value that was applied.
fn apply_feature(
    backend: &mut dyn Storage,
    feature: &Feature,
    value: &FeatureValue,
    saved: &SavedConfig,
) -> Result<FeatureValue> {
    match feature.config()? {
        FeatureConfig::Bool(cfg) => {
            let enabled = value.as_bool().ok_or_else(|| {
                PacksetError::invalid_format(
                    DESCRIPTOR_FILE,
                    format!("feature '{}' expects true or false, got '{}'", feature.name, value),
                )
            })?;
            apply_bool_feature(backend, cfg, enabled)?;
            Ok(FeatureValue::Bool(enabled))
        }
        FeatureConfig::Toggle(cfg) => {
            let selected = value
                .as_state()
                .filter(|s| cfg.scope_index(s).is_some())
                .ok_or_else(|| {
                    PacksetError::invalid_format(
                        DESCRIPTOR_FILE,
                        format!(
                            "feature '{}' expects one of [{}], got '{}'",
                            feature.name,
                            cfg.scope.join(", "),
                            value
                        ),
                    )
                })?;
            let previous = saved.previous_state(&feature.name, &cfg.default, &cfg.scope);
            let missing = apply_toggle_feature(backend, cfg, selected, &previous)?;
            if !missing.is_empty() {
                return Err(PacksetError::missing_file(missing.join(", ")));
            }
            Ok(FeatureValue::State(selected.to_string()))
        }
    }
}

/// Open the pack at `location`, load its descriptor, apply `chosen`, and
/// close the pack. Archives are repacked only when everything up to the
/// close succeeded; dry runs never write.
pub fn apply_to_pack(location: &Path, chosen: &ChosenValues, dry_run: bool) -> Result<ApplyReport> {
    let mut backend = open_pack(location, dry_run)?;
    let descriptor = PacksetDescriptor::load(backend.as_ref())?;
    let report = apply(&descriptor, chosen, backend.as_mut())?;
    backend.close()?;
    Ok(report)
}
