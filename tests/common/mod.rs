// Shared fixtures for the integration tests: a sample pack that can be
// materialized either as a folder or as a zip archive of that folder.

#![allow(dead_code)]

use packset::{ChosenValues, FeatureValue};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const SAVED: &str = "packset_config.json";
pub const SHADOW_STATES: [&str; 3] = ["off", "soft", "hard"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Directory,
    Archive,
}

pub const LAYOUTS: [Layout; 2] = [Layout::Directory, Layout::Archive];

/// A sample pack on disk, kept alive by its temp directory
pub struct Pack {
    _dir: TempDir,
    pub location: PathBuf,
    pub layout: Layout,
}

impl Pack {
    pub fn new(layout: Layout) -> Self {
        let dir = TempDir::new().unwrap();
        let tree = dir.path().join("Faithful");
        write_sample(&tree);
        let location = match layout {
            Layout::Directory => tree,
            Layout::Archive => {
                let archive = dir.path().join("Faithful.zip");
                zip_dir(&tree, &archive);
                fs::remove_dir_all(&tree).unwrap();
                archive
            }
        };
        Self {
            _dir: dir,
            location,
            layout,
        }
    }

    /// Every regular file in the pack with its content
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        match self.layout {
            Layout::Directory => dir_files(&self.location),
            Layout::Archive => zip_files(&self.location),
        }
    }

    /// Files without the saved configuration record
    pub fn assets(&self) -> BTreeMap<String, Vec<u8>> {
        let mut files = self.files();
        files.remove(SAVED);
        files
    }

    pub fn read(&self, path: &str) -> Option<String> {
        self.files()
            .remove(path)
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files().contains_key(path)
    }

    pub fn saved(&self) -> serde_json::Value {
        serde_json::from_str(&self.read(SAVED).unwrap()).unwrap()
    }

    pub fn apply(&self, values: &ChosenValues) -> packset::ApplyReport {
        packset::apply_to_pack(&self.location, values, false).unwrap()
    }
}

pub fn chosen(pairs: &[(&str, FeatureValue)]) -> ChosenValues {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Content of a shadow variant file, unique per state and shader
pub fn shadow(state: &str, shader: &str) -> String {
    format!("{}:{}", shader, state)
}

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

/// Pack layout in its default configuration:
///
/// - "HD Font" (bool, default false): one direct asset and one delegated
///   sub-descriptor with an on-asset, an off-asset (parked) and a swap pair
/// - "Shadows" (toggle, default "off"): two groups, fragment and vertex shader
fn write_sample(root: &Path) {
    let descriptor = json!({
        "schema_version": 1,
        "feature": { "HD Font": "bool", "Shadows": "toggle" },
        "config": {
            "HD Font": {
                "default": false,
                "toggle": [
                    { "id": "font", "file_path": "assets/font/default.png", "type": "bool" },
                    { "id": "gui", "file_path": "packset/hd_font.json", "type": "toggle" }
                ]
            },
            "Shadows": {
                "default": "off",
                "scope": SHADOW_STATES,
                "paths": [
                    { "file_path": "packset/shadows_fsh.json" },
                    { "file_path": "packset/shadows_vsh.json" }
                ]
            }
        },
        "category": {
            "list": ["visual"],
            "data": { "visual": { "name": "Visual", "list": ["Shadows"] } }
        }
    });
    write(root, "packset.json", &descriptor.to_string());

    let hd_font = json!({
        "schema_version": 1,
        "type": "bool",
        "assets": [
            { "file_path": "textures/gui/font_lowres.png", "default": "on" },
            { "file_path": "textures/gui/font_hires.png", "default": "off" }
        ],
        "toggles": [
            { "name": "clouds", "path": "textures/environment/clouds.png", "toggle_path": "packset/hd/clouds.png" }
        ]
    });
    write(root, "packset/hd_font.json", &hd_font.to_string());
    write(root, "assets/font/default.png", "FONT");
    write(root, "textures/gui/font_lowres.png", "LOWRES");
    write(root, "textures/gui/font_hires.png.packset.old", "HIRES");
    write(root, "textures/environment/clouds.png", "CLOUDS");
    write(root, "packset/hd/clouds.png", "HD CLOUDS");

    for (shader, canonical) in [("fsh", "shaders/shadow.fsh"), ("vsh", "shaders/shadow.vsh")] {
        let states: Vec<_> = SHADOW_STATES
            .iter()
            .map(|state| {
                let path = if *state == "off" {
                    canonical.to_string()
                } else {
                    format!("packset/shadow/{}.{}", state, shader)
                };
                write(root, &path, &shadow(state, shader));
                json!({ "name": state, "file_path": path })
            })
            .collect();
        let sub = json!({ "schema_version": 1, "type": "toggle", "states": states });
        write(root, &format!("packset/shadows_{}.json", shader), &sub.to_string());
    }
}

/// Zip `tree` into `archive` the way a user would, files only
pub fn zip_dir(tree: &Path, archive: &Path) {
    let mut writer = ZipWriter::new(File::create(archive).unwrap());
    for entry in WalkDir::new(tree).min_depth(1).sort_by_file_name() {
        let entry = entry.unwrap();
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(tree)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        std::io::copy(&mut File::open(entry.path()).unwrap(), &mut writer).unwrap();
    }
    writer.finish().unwrap();
}

fn dir_files(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let name = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            (name, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn zip_files(archive: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut files = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        files.insert(entry.name().to_string(), content);
    }
    files
}
