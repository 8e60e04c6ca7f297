//! packset library
//!
//! Applies descriptor-driven feature choices to a resource pack stored as a
//! folder or a zip archive, by renaming files in and out of their live paths.

pub mod cli;
pub mod config_file;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod saved_config;
pub mod storage;
pub mod sub_descriptor;
pub mod types;

// Re-export main types for convenience
pub use config_file::ChosenValues;
pub use descriptor::{DisplayGroup, Feature, FeatureConfig, PacksetDescriptor};
pub use engine::{
    apply, apply_to_pack, inspect, validate, ApplyReport, FeatureOutcome, FeatureStatus,
    ValidationIssue,
};
pub use error::{PacksetError, Result};
pub use saved_config::{effective_values, SavedConfig};
pub use storage::{open_pack, ArchiveBackend, DirectoryBackend, DryRunBackend, RenameOp, Storage};
pub use types::{FeatureKind, FeatureValue};
