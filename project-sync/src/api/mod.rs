//! Platform REST API client.

pub mod client;
pub mod types;

pub use client::{PlatformClient, TransportOptions};
