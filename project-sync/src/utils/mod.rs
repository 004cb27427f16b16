//! Utility modules for the sync tools.

pub mod errors;
pub mod logger;

pub use errors::{Result, SyncError};
