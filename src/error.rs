//! Error handling module for packset
//!
//! Provides the engine's error taxonomy using thiserror. Library code returns
//! these types; the binary wraps them in `anyhow` at the edge.
//!
//! # Fatal vs. per-feature errors
//!
//! - `InvalidFormat`, `MissingFile` and `Conflict` belong to a single feature:
//!   the orchestrator logs them and moves on to the next feature.
//! - `Backend`, `Io`, `Zip` and `Walk` mean the storage itself is unusable and
//!   abort the whole apply call (see [`PacksetError::is_fatal`]).

use thiserror::Error;

/// Main error type for packset operations
#[derive(Error, Debug)]
pub enum PacksetError {
    /// Structural or schema violation in a descriptor, sub-descriptor, or
    /// chosen value. Raised before any file belonging to the feature moves.
    #[error("Invalid format in {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    /// An asset or variant the descriptor names is not present in the pack
    #[error("Missing file: {path}")]
    MissingFile { path: String },

    /// A relocation would overwrite content that is not the one being displaced
    #[error("Refusing to overwrite {path}: slot is already occupied")]
    Conflict { path: String },

    /// Pack location could not be opened, extracted, or repacked
    #[error("Storage backend failure: {reason}")]
    Backend { reason: String },

    /// IO errors (rename, read, write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Zip archive errors
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal errors while repacking
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type alias for packset operations
pub type Result<T> = std::result::Result<T, PacksetError>;

// Convenient error constructors
impl PacksetError {
    /// Create an invalid-format error for the descriptor at `path`
    pub fn invalid_format(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-file error
    pub fn missing_file(path: impl Into<String>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    /// Create a conflict error
    pub fn conflict(path: impl Into<String>) -> Self {
        Self::Conflict { path: path.into() }
    }

    /// Create a backend failure
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    /// Create a backend failure that names the pack location
    pub fn backend_at(location: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Backend {
            reason: format!("{}: {}", location.display(), reason),
        }
    }

    /// Returns true if this error invalidates the whole apply call rather
    /// than a single feature.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. } | Self::Io(_) | Self::Zip(_) | Self::Walk(_)
        )
    }

    /// Returns true for the non-fatal "file already gone" case
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::MissingFile { .. })
    }
}

/// Path of a pack-relative file in error messages and logs
pub(crate) fn display_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
