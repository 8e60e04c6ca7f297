//! Engine modules: the appliers that turn chosen values into file moves.
//!
//! The engine layer sits between the descriptor (what the pack offers) and
//! the storage backend (where the files are). Appliers only ever see the
//! [`Storage`](crate::storage::Storage) trait.

pub mod bool_feature;
pub mod inspect;
pub mod orchestrator;
pub mod slots;
pub mod toggle_feature;

pub use bool_feature::apply_bool_feature;
pub use inspect::{inspect, validate, AssetState, FeatureStatus, ValidationIssue};
pub use orchestrator::{apply, apply_to_pack, ApplyReport, FeatureOutcome, FeatureReport};
pub use toggle_feature::apply_toggle_feature;
