//! Slot primitives shared by the feature appliers
//!
//! A managed single asset lives either at its canonical name or at the
//! parked name (`<path>.packset.old`), never both. A swap pair shares one
//! canonical slot between the default content and an alternate that waits
//! at `toggle_path`; while the alternate is shown the default is parked.

use crate::error::{PacksetError, Result};
use crate::storage::Storage;
use crate::types::parked_path;
use tracing::{debug, warn};

/// Show (`active`) or park the asset at `path`.
///
/// Returns `MissingFile` when neither the asset nor its parked copy exists,
/// and `Conflict` when parking would overwrite an existing parked copy. When
/// both exist during a restore the parked copy wins.
pub fn set_file_active(backend: &mut dyn Storage, path: &str, active: bool) -> Result<()> {
    let parked = parked_path(path);
    let shown = backend.exists(path);
    let hidden = backend.exists(&parked);

    match (active, shown, hidden) {
        (true, _, true) => {
            if shown {
                warn!("{} exists next to its parked copy; the parked copy replaces it", path);
            }
            backend.rename(&parked, path)
        }
        (true, true, false) | (false, false, true) => {
            debug!("{} already {}", path, if active { "active" } else { "parked" });
            Ok(())
        }
        (false, true, true) => Err(PacksetError::conflict(parked)),
        (false, true, false) => backend.rename(path, &parked),
        (_, false, false) => Err(PacksetError::missing_file(path)),
    }
}

/// Bring `path` to the wanted occupant: its default content when
/// `want_default` is true, otherwise the alternate from `toggle_path`.
///
/// The default content is considered shown exactly when the parked name is
/// absent. Both contents must be present before switching to the alternate,
/// so a half-installed pair is reported as `MissingFile` without moving
/// anything.
pub fn swap_pair(
    backend: &mut dyn Storage,
    path: &str,
    toggle_path: &str,
    want_default: bool,
) -> Result<()> {
    let parked = parked_path(path);
    let showing_default = !backend.exists(&parked);

    if showing_default == want_default {
        debug!("{} already holds the {} content", path, describe(want_default));
        return Ok(());
    }

    if want_default {
        if backend.exists(path) {
            if backend.exists(toggle_path) {
                return Err(PacksetError::conflict(toggle_path));
            }
            backend.rename(path, toggle_path)?;
        }
        backend.rename(&parked, path)
    } else {
        if !backend.exists(path) {
            return Err(PacksetError::missing_file(path));
        }
        if !backend.exists(toggle_path) {
            return Err(PacksetError::missing_file(toggle_path));
        }
        backend.rename(path, &parked)?;
        backend.rename(toggle_path, path)
    }
}

/// Turn a `MissingFile` into a logged skip; pass everything else through
pub fn skip_missing(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_missing_file() => {
            warn!("{}; skipping", e);
            Ok(())
        }
        other => other,
    }
}

fn describe(default: bool) -> &'static str {
    if default { "default" } else { "alternate" }
}
