//! Archive backend: extract → mutate → repack
//!
//! On open the whole zip is extracted into a fresh scratch directory and every
//! operation runs against that tree. `close` compresses the tree into a
//! temporary file beside the archive and only then moves it over the
//! original, so a failure at any earlier point leaves the archive on disk
//! byte-for-byte unchanged. The scratch directory is a `TempDir` and is
//! removed on every exit path, including early returns and panics.

use super::{DirectoryBackend, RenameOp, Storage};
use crate::error::{display_path, PacksetError, Result};
use serde_json::Value;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Pack stored as a zip archive
#[derive(Debug)]
pub struct ArchiveBackend {
    archive_path: PathBuf,
    tree: DirectoryBackend,
    scratch: TempDir,
}

impl ArchiveBackend {
    /// Extract `archive_path` into a private scratch directory
    pub fn open(archive_path: impl Into<PathBuf>) -> Result<Self> {
        let archive_path = archive_path.into();

        let file = File::open(&archive_path)
            .map_err(|e| PacksetError::backend_at(&archive_path, e))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| PacksetError::backend_at(&archive_path, e))?;

        let scratch = tempfile::Builder::new()
            .prefix("packset_")
            .tempdir()
            .map_err(|e| PacksetError::backend_at(&archive_path, e))?;

        archive
            .extract(scratch.path())
            .map_err(|e| PacksetError::backend_at(&archive_path, e))?;

        debug!(
            "Extracted {} ({} entries) to {}",
            archive_path.display(),
            archive.len(),
            scratch.path().display()
        );

        let tree = DirectoryBackend::open(scratch.path())?;
        Ok(Self {
            archive_path,
            tree,
            scratch,
        })
    }

    /// Scratch directory holding the extracted tree
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Compress the scratch tree and replace the original archive with it
    fn repack(&self) -> Result<()> {
        let parent = self
            .archive_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut staged = tempfile::Builder::new()
            .prefix(".packset_")
            .suffix(".zip")
            .tempfile_in(parent)
            .map_err(|e| PacksetError::backend_at(&self.archive_path, e))?;

        let entries = write_tree(self.scratch.path(), staged.as_file_mut())?;

        if let Ok(meta) = fs::metadata(&self.archive_path) {
            fs::set_permissions(staged.path(), meta.permissions())?;
        }
        staged
            .persist(&self.archive_path)
            .map_err(|e| PacksetError::backend_at(&self.archive_path, e.error))?;

        info!(
            "Repacked {} ({} entries)",
            self.archive_path.display(),
            entries
        );
        Ok(())
    }
}

/// Zip every file under `root` into `out`. Entry names are relative to `root`
/// with `/` separators; empty directories are kept as directory entries.
fn write_tree<W: io::Write + io::Seek>(root: &Path, out: W) -> Result<usize> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(out);
    let mut entries = 0;

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| PacksetError::backend(e.to_string()))?;
        let name = display_path(relative);

        if entry.file_type().is_dir() {
            if fs::read_dir(entry.path())?.next().is_none() {
                writer.add_directory(name, options)?;
                entries += 1;
            }
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut writer)?;
            entries += 1;
        }
    }

    writer.finish()?;
    Ok(entries)
}

impl Storage for ArchiveBackend {
    fn exists(&self, path: &str) -> bool {
        self.tree.exists(path)
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
        self.tree.rename(src, dst)
    }

    fn read_structured(&self, path: &str) -> Result<Value> {
        self.tree.read_structured(path)
    }

    fn write_structured(&mut self, path: &str, value: &Value) -> Result<()> {
        self.tree.write_structured(path, value)
    }

    fn take_renames(&mut self) -> Vec<RenameOp> {
        self.tree.take_renames()
    }

    fn location(&self) -> &Path {
        &self.archive_path
    }

    fn close(self: Box<Self>) -> Result<()> {
        let result = self.repack();
        debug!("Releasing scratch directory {}", self.scratch.path().display());
        drop(self);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn read_entry(path: &Path, name: &str) -> Option<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entry = archive.by_name(name).ok()?;
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        Some(content)
    }

    #[test]
    fn test_open_mutate_close_repacks() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("pack.zip");
        write_zip(&zip_path, &[("assets/font/default.png", "font")]);

        let mut backend = Box::new(ArchiveBackend::open(&zip_path).unwrap());
        backend
            .rename("assets/font/default.png", "assets/font/default.png.packset.old")
            .unwrap();
        backend.close().unwrap();

        assert_eq!(read_entry(&zip_path, "assets/font/default.png"), None);
        assert_eq!(
            read_entry(&zip_path, "assets/font/default.png.packset.old").as_deref(),
            Some("font")
        );
    }

    #[test]
    fn test_scratch_removed_on_drop_without_close() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("pack.zip");
        write_zip(&zip_path, &[("a.txt", "a")]);
        let before = fs::read(&zip_path).unwrap();

        let scratch = {
            let mut backend = ArchiveBackend::open(&zip_path).unwrap();
            backend.rename("a.txt", "b.txt").unwrap();
            backend.scratch_dir().to_path_buf()
        };

        assert!(!scratch.exists());
        assert_eq!(fs::read(&zip_path).unwrap(), before);
    }

    #[test]
    fn test_open_rejects_corrupt_archive() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("broken.zip");
        fs::write(&zip_path, b"definitely not a zip").unwrap();

        let err = ArchiveBackend::open(&zip_path).unwrap_err();
        assert!(matches!(err, PacksetError::Backend { .. }));
        assert_eq!(fs::read(&zip_path).unwrap(), b"definitely not a zip");
    }

    #[test]
    fn test_close_keeps_no_staging_files() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("pack.zip");
        write_zip(&zip_path, &[("a.txt", "a")]);

        let backend = Box::new(ArchiveBackend::open(&zip_path).unwrap());
        backend.close().unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("pack.zip")]);
        assert_eq!(read_entry(&zip_path, "a.txt").as_deref(), Some("a"));
    }
}
