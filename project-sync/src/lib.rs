//! Project Sync Library
//!
//! Synchronizes a local project workspace with the platform through
//! content-addressed manifests.

pub mod api;
pub mod archive;
pub mod config;
pub mod executor;
pub mod fs;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::ToolContext;
pub use utils::errors::SyncError;
pub type Result<T> = std::result::Result<T, SyncError>;
