//! Manifest-diff synchronization.
//!
//! - Content fingerprinting
//! - The remote manifest model
//! - Push planning (diff engine) and pull planning

pub mod diff;
pub mod file_kind;
pub mod fingerprint;
pub mod manifest;
pub mod pull_plan;

pub use diff::{plan_push, LocalSnapshot, PushPlan, UploadMode, UploadReceipt};
pub use manifest::{Manifest, ManifestFileEntry, MANIFEST_FILE_NAME};
pub use pull_plan::{plan_pull, PullPlan};
