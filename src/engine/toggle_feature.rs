//! Toggle-feature applier
//!
//! Every toggle sub-descriptor describes one group: the file path of the
//! default state is the canonical slot, each other state keeps its content at
//! its own declared path while inactive, and the default content is parked at
//! `<canonical>.packset.old` while another state occupies the slot.
//!
//! Which state currently occupies the slot is read from the files, not
//! trusted from the saved configuration:
//! - the default is in place exactly when the parked name is absent;
//! - otherwise the occupant is the non-default state whose own path is
//!   vacant, preferring the previously applied state. With several vacant
//!   paths and no vacant previous state the occupant is ambiguous and the
//!   group is refused with `Conflict`.

use crate::descriptor::ToggleFeatureConfig;
use crate::error::{PacksetError, Result};
use crate::storage::Storage;
use crate::sub_descriptor::SubPacksetToggle;
use crate::types::parked_path;
use tracing::{debug, info, warn};

/// A toggle group with all indices resolved, ready to mutate
#[derive(Debug)]
struct GroupPlan {
    source: String,
    sub: SubPacksetToggle,
    current: usize,
    previous: usize,
    default: usize,
}

impl GroupPlan {
    fn canonical(&self) -> &str {
        &self.sub.states[self.default].file_path
    }

    fn path_of(&self, index: usize) -> &str {
        &self.sub.states[index].file_path
    }

    /// Where the content now in the canonical slot belongs
    fn occupant_home(&self, backend: &dyn Storage) -> Option<usize> {
        let vacant: Vec<usize> = (0..self.sub.states.len())
            .filter(|&i| i != self.default && !backend.exists(self.path_of(i)))
            .collect();
        if vacant.contains(&self.previous) {
            return Some(self.previous);
        }
        match vacant.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Resolve a state name to an index into `states`: by name first, then by
/// its position in the feature's `scope`.
pub fn resolve_index(
    config: &ToggleFeatureConfig,
    sub: &SubPacksetToggle,
    name: &str,
) -> Option<usize> {
    sub.position(name)
        .or_else(|| config.scope_index(name))
        .filter(|&i| i < sub.states.len())
}

/// Switch every group of a toggle feature from `previous` to `selected`.
///
/// All sub-descriptors are loaded and their indices resolved before the
/// first rename. A group whose sub-descriptor is missing is skipped. A group
/// whose selected variant is missing is left unchanged and the missing path
/// is returned, so the caller can avoid recording `selected` as the state
/// the pack is in.
pub fn apply_toggle_feature(
    backend: &mut dyn Storage,
    config: &ToggleFeatureConfig,
    selected: &str,
    previous: &str,
) -> Result<Vec<String>> {
    let mut plans = Vec::with_capacity(config.paths.len());
    for item in &config.paths {
        let sub = match SubPacksetToggle::load(backend, &item.file_path) {
            Ok(sub) => sub,
            Err(e) if e.is_missing_file() => {
                warn!("Sub-descriptor {} not found; skipping group", item.file_path);
                continue;
            }
            Err(e) => return Err(e),
        };
        plans.push(plan_group(config, &item.file_path, sub, selected, previous)?);
    }

    let mut missing = Vec::new();
    for plan in &plans {
        info!("Switching {}: {} -> {}", plan.source, previous, selected);
        match switch_group(backend, plan) {
            Ok(()) => {}
            Err(PacksetError::MissingFile { path }) => {
                warn!("{} is missing; {} left unchanged", path, plan.source);
                missing.push(path);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(missing)
}

fn plan_group(
    config: &ToggleFeatureConfig,
    source: &str,
    sub: SubPacksetToggle,
    selected: &str,
    previous: &str,
) -> Result<GroupPlan> {
    let resolve = |name: &str| {
        resolve_index(config, &sub, name).ok_or_else(|| {
            PacksetError::invalid_format(
                source,
                format!("state '{name}' matches no state and no scope position"),
            )
        })
    };
    let current = resolve(selected)?;
    let previous = resolve(previous)?;
    let default = resolve(&config.default)?;

    let canonical = &sub.states[default].file_path;
    if let Some(clash) = sub
        .states
        .iter()
        .enumerate()
        .find(|(i, s)| *i != default && &s.file_path == canonical)
    {
        return Err(PacksetError::invalid_format(
            source,
            format!("state '{}' reuses the canonical path {}", clash.1.name, canonical),
        ));
    }

    Ok(GroupPlan {
        source: source.to_string(),
        sub,
        current,
        previous,
        default,
    })
}

fn switch_group(backend: &mut dyn Storage, plan: &GroupPlan) -> Result<()> {
    let canonical = plan.canonical();
    let parked = parked_path(canonical);
    let default_in_place = !backend.exists(&parked);

    if plan.current == plan.default {
        if default_in_place {
            debug!("{} already shows the default state", canonical);
            return Ok(());
        }
        evict_occupant(backend, plan)?;
        return backend.rename(&parked, canonical);
    }

    let target = plan.path_of(plan.current);
    if !default_in_place
        && backend.exists(canonical)
        && plan.occupant_home(backend) == Some(plan.current)
    {
        debug!("{} already shows '{}'", canonical, plan.sub.states[plan.current].name);
        return Ok(());
    }
    if !backend.exists(target) {
        return Err(PacksetError::missing_file(target));
    }

    if default_in_place {
        if !backend.exists(canonical) {
            return Err(PacksetError::missing_file(canonical));
        }
        backend.rename(canonical, &parked)?;
    } else {
        evict_occupant(backend, plan)?;
    }
    backend.rename(target, canonical)
}

/// Move a non-default occupant out of the canonical slot to its own path
fn evict_occupant(backend: &mut dyn Storage, plan: &GroupPlan) -> Result<()> {
    let canonical = plan.canonical();
    if !backend.exists(canonical) {
        return Ok(());
    }
    let home = plan
        .occupant_home(backend)
        .ok_or_else(|| PacksetError::conflict(canonical))?;
    if home != plan.previous {
        warn!(
            "Saved state disagrees with {}; returning occupant to '{}'",
            canonical, plan.sub.states[home].name
        );
    }
    backend.rename(canonical, plan.path_of(home))
}
