//! Bool-feature applier

use super::slots::{set_file_active, skip_missing, swap_pair};
use crate::descriptor::{BoolFeatureConfig, ToggleItem};
use crate::error::Result;
use crate::storage::Storage;
use crate::sub_descriptor::SubPacksetBool;
use crate::types::ItemKind;
use tracing::{debug, warn};

/// Apply `enabled` to a bool feature.
///
/// Everything is driven by `is_default = enabled == config.default`: direct
/// assets are shown exactly when the feature sits at its default, delegated
/// sub-descriptors flip each asset relative to its own declared default and
/// show the default side of every swap pair.
///
/// All delegated sub-descriptors are loaded and validated before the first
/// rename, so an invalid one rejects the feature without touching files. A
/// sub-descriptor that does not exist is skipped.
pub fn apply_bool_feature(
    backend: &mut dyn Storage,
    config: &BoolFeatureConfig,
    enabled: bool,
) -> Result<()> {
    let is_default = enabled == config.default;
    debug!(
        "Bool feature: enabled={} default={} is_default={}",
        enabled, config.default, is_default
    );

    let mut plan: Vec<(&ToggleItem, Option<SubPacksetBool>)> = Vec::with_capacity(config.toggle.len());
    for item in &config.toggle {
        match item.kind {
            ItemKind::Bool => plan.push((item, None)),
            ItemKind::Toggle => match SubPacksetBool::load(backend, &item.file_path) {
                Ok(sub) => plan.push((item, Some(sub))),
                Err(e) if e.is_missing_file() => {
                    warn!("Sub-descriptor {} not found; skipping item '{}'", item.file_path, item.id);
                }
                Err(e) => return Err(e),
            },
        }
    }

    for (item, sub) in plan {
        match sub {
            None => skip_missing(set_file_active(backend, &item.file_path, is_default))?,
            Some(sub) => apply_sub_descriptor(backend, &sub, is_default)?,
        }
    }
    Ok(())
}

fn apply_sub_descriptor(backend: &mut dyn Storage, sub: &SubPacksetBool, is_default: bool) -> Result<()> {
    for asset in &sub.assets {
        let active = asset.default.is_active(is_default);
        skip_missing(set_file_active(backend, &asset.file_path, active))?;
    }
    for pair in &sub.toggles {
        skip_missing(swap_pair(backend, &pair.path, &pair.toggle_path, is_default))?;
    }
    Ok(())
}
