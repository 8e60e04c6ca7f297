//! Directory backend: operations map straight onto the pack folder
//!
//! Mutations are visible immediately and are not journaled.

use super::{RenameOp, Storage};
use crate::error::{PacksetError, Result};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Pack stored as a plain folder
#[derive(Debug)]
pub struct DirectoryBackend {
    root: PathBuf,
    renames: Vec<RenameOp>,
}

impl DirectoryBackend {
    /// Open a pack folder. Fails with `Backend` if `root` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(PacksetError::backend_at(&root, "not a directory"));
        }
        debug!("Opened directory pack {}", root.display());
        Ok(Self {
            root,
            renames: Vec::new(),
        })
    }

    /// Absolute location of a pack-relative path
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl Storage for DirectoryBackend {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
        let from = self.resolve(src);
        let to = self.resolve(dst);
        if !from.exists() {
            return Err(PacksetError::missing_file(src));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&from, &to)?;
        info!("Renamed {} -> {}", src, dst);
        self.renames.push(RenameOp::new(src, dst));
        Ok(())
    }

    fn read_structured(&self, path: &str) -> Result<Value> {
        let content = match fs::read_to_string(self.resolve(path)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PacksetError::missing_file(path));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map_err(|e| PacksetError::invalid_format(path, format!("not valid JSON: {e}")))
    }

    fn write_structured(&mut self, path: &str, value: &Value) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&target, content)?;
        debug!("Wrote {}", path);
        Ok(())
    }

    fn take_renames(&mut self) -> Vec<RenameOp> {
        std::mem::take(&mut self.renames)
    }

    fn location(&self) -> &Path {
        &self.root
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
