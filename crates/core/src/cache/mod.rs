//! Directory-backed artifact cache primitives.
//!
//! This module provides the building blocks the orchestrator composes:
//!
//! - Content fingerprints using truncated SHA-256 hashing
//! - A key → file store with atomic commits and age-based sweeps
//! - Per-key single-flight execution so one key is computed at most once at a time

pub mod flight;
pub mod hash;
pub mod store;

pub use crate::Error;

pub use flight::SingleFlight;
pub use hash::{fingerprint, fingerprint_bytes, fingerprint_file, is_fingerprint};
pub use store::ArtifactStore;
