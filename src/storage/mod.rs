//! Storage backends: one capability set over a pack folder or a zip archive
//!
//! Appliers only ever talk to [`Storage`], so the same rename sequence runs
//! unmodified against a directory on disk, an archive extracted to a scratch
//! directory, or a dry-run overlay.
//!
//! All paths handed to a backend are pack-relative and use `/` separators,
//! exactly as they appear in descriptor files.

pub mod archive;
pub mod directory;
pub mod dry_run;

pub use archive::ArchiveBackend;
pub use directory::DirectoryBackend;
pub use dry_run::DryRunBackend;

use crate::error::{PacksetError, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;

// ============================================================================
// Rename log
// ============================================================================

/// One relocation performed (or planned) by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOp {
    pub from: String,
    pub to: String,
}

impl RenameOp {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl fmt::Display for RenameOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

// ============================================================================
// Storage trait
// ============================================================================

/// Uniform file operations over a pack.
///
/// # Contract
///
/// - `rename` fails with `MissingFile` when `src` does not exist and creates
///   missing parent directories of `dst`. An existing `dst` is replaced;
///   callers that care check `exists(dst)` first.
/// - `read_structured` fails with `MissingFile` when the file is absent and
///   with `InvalidFormat` when it is not valid JSON.
/// - Every successful `rename` is appended to the rename log returned by
///   `take_renames`.
pub trait Storage {
    /// Returns true if a file (or directory) exists at the pack-relative path
    fn exists(&self, path: &str) -> bool;

    /// Move `src` to `dst` inside the pack
    fn rename(&mut self, src: &str, dst: &str) -> Result<()>;

    /// Read and parse a JSON file
    fn read_structured(&self, path: &str) -> Result<Value>;

    /// Serialize `value` as pretty JSON and write it, replacing any existing file
    fn write_structured(&mut self, path: &str, value: &Value) -> Result<()>;

    /// Drain the renames recorded since the last call
    fn take_renames(&mut self) -> Vec<RenameOp>;

    /// The pack location this backend was opened on
    fn location(&self) -> &Path;

    /// Finish with the pack. Archive backends repack here; the scratch
    /// directory is released whether or not that succeeds.
    fn close(self: Box<Self>) -> Result<()>;
}

// ============================================================================
// Pack location
// ============================================================================

/// How a pack is stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PackKind {
    Directory,
    Archive,
}

impl PackKind {
    /// Classify a pack location: a folder, or a regular file with a `.zip`
    /// extension (any case).
    pub fn detect(location: &Path) -> Result<Self> {
        if location.is_dir() {
            return Ok(Self::Directory);
        }
        let is_zip = location
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if location.is_file() && is_zip {
            return Ok(Self::Archive);
        }
        if !location.exists() {
            return Err(PacksetError::backend_at(location, "pack location does not exist"));
        }
        Err(PacksetError::backend_at(
            location,
            "not a folder or a .zip archive",
        ))
    }
}

/// Open the right backend for `location`, optionally wrapped in a dry-run
/// overlay that never writes to the pack.
pub fn open_pack(location: &Path, dry_run: bool) -> Result<Box<dyn Storage>> {
    let backend: Box<dyn Storage> = match PackKind::detect(location)? {
        PackKind::Directory => Box::new(DirectoryBackend::open(location)?),
        PackKind::Archive => Box::new(ArchiveBackend::open(location)?),
    };

    if dry_run {
        Ok(Box::new(DryRunBackend::new(backend)))
    } else {
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_rename_op_display() {
        let op = RenameOp::new("shaders/shadow.fsh", "shaders/shadow.fsh.packset.old");
        assert_eq!(op.to_string(), "shaders/shadow.fsh -> shaders/shadow.fsh.packset.old");
    }

    #[test]
    fn test_detect_directory_and_archive() {
        let dir = TempDir::new().unwrap();
        assert_eq!(PackKind::detect(dir.path()).unwrap(), PackKind::Directory);

        let archive = dir.path().join("Pack.ZIP");
        fs::write(&archive, b"").unwrap();
        assert_eq!(PackKind::detect(&archive).unwrap(), PackKind::Archive);
    }

    #[test]
    fn test_detect_rejects_other_files() {
        let dir = TempDir::new().unwrap();
        let other = dir.path().join("pack.rar");
        fs::write(&other, b"").unwrap();
        assert!(matches!(
            PackKind::detect(&other),
            Err(PacksetError::Backend { .. })
        ));
        assert!(PackKind::detect(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_open_pack_dry_run_leaves_directory_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let mut backend = open_pack(dir.path(), true).unwrap();
        backend.rename("a.txt", "b.txt").unwrap();
        assert!(backend.exists("b.txt"));
        assert_eq!(backend.take_renames(), vec![RenameOp::new("a.txt", "b.txt")]);
        backend.close().unwrap();

        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
    }
}
