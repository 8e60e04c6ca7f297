//! Dry-run overlay backend
//!
//! Wraps any backend and records renames and writes in memory instead of
//! performing them. Reads see the planned state, so appliers make the same
//! decisions they would make for real. `close` discards the overlay without
//! closing the inner backend for writing: an archive is never repacked.

use super::{RenameOp, Storage};
use crate::error::{PacksetError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Where the content visible at an overlay path comes from
#[derive(Debug, Clone)]
enum Entry {
    /// Moved here from this path of the inner backend
    Moved(String),
    /// Written during the dry run
    Written(Value),
    /// Moved away; nothing visible here
    Vacant,
}

pub struct DryRunBackend {
    inner: Box<dyn Storage>,
    overlay: BTreeMap<String, Entry>,
    renames: Vec<RenameOp>,
}

impl DryRunBackend {
    pub fn new(inner: Box<dyn Storage>) -> Self {
        Self {
            inner,
            overlay: BTreeMap::new(),
            renames: Vec::new(),
        }
    }

    /// Values that would have been written, by path
    pub fn planned_writes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.overlay.iter().filter_map(|(path, entry)| match entry {
            Entry::Written(value) => Some((path.as_str(), value)),
            _ => None,
        })
    }
}

impl fmt::Debug for DryRunBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DryRunBackend")
            .field("location", &self.inner.location())
            .field("overlay", &self.overlay)
            .field("renames", &self.renames)
            .finish_non_exhaustive()
    }
}

impl Storage for DryRunBackend {
    fn exists(&self, path: &str) -> bool {
        match self.overlay.get(path) {
            Some(Entry::Vacant) => false,
            Some(_) => true,
            None => self.inner.exists(path),
        }
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
        let moved = match self.overlay.get(src) {
            Some(Entry::Vacant) => return Err(PacksetError::missing_file(src)),
            Some(entry) => entry.clone(),
            None if self.inner.exists(src) => Entry::Moved(src.to_string()),
            None => return Err(PacksetError::missing_file(src)),
        };
        self.overlay.insert(src.to_string(), Entry::Vacant);
        self.overlay.insert(dst.to_string(), moved);
        info!("Would rename {} -> {}", src, dst);
        self.renames.push(RenameOp::new(src, dst));
        Ok(())
    }

    fn read_structured(&self, path: &str) -> Result<Value> {
        match self.overlay.get(path) {
            Some(Entry::Vacant) => Err(PacksetError::missing_file(path)),
            Some(Entry::Written(value)) => Ok(value.clone()),
            Some(Entry::Moved(origin)) => self.inner.read_structured(origin),
            None => self.inner.read_structured(path),
        }
    }

    fn write_structured(&mut self, path: &str, value: &Value) -> Result<()> {
        info!("Would write {}", path);
        self.overlay
            .insert(path.to_string(), Entry::Written(value.clone()));
        Ok(())
    }

    fn take_renames(&mut self) -> Vec<RenameOp> {
        std::mem::take(&mut self.renames)
    }

    fn location(&self) -> &Path {
        self.inner.location()
    }

    fn close(self: Box<Self>) -> Result<()> {
        debug!(
            "Dry run finished for {}; discarding {} planned change(s)",
            self.inner.location().display(),
            self.overlay.len()
        );
        Ok(())
    }
}
