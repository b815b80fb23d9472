//! Preview-related MCP tools.
//!
//! This module provides tools for building, reading and sweeping PDF previews.

pub mod get;
pub mod read;
pub mod sweep;

pub use get::{PreviewGetParams, get_impl};
pub use read::{PreviewReadParams, read_impl};
pub use sweep::{PreviewSweepParams, sweep_impl};
