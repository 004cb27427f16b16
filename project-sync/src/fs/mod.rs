//! Local filesystem: tree scanning, path confinement, workspace layout.

pub mod layout;
pub mod metadata;
pub mod sandbox;
pub mod walker;

pub use metadata::LocalFileRecord;
pub use sandbox::{normalize_rel_path, resolve_within_base};
pub use walker::{scan, ScanOptions};
