//! Resolves build names to the build records held by the orchestration platform.
//!
//! The [`Directory`] keeps a cached snapshot of the namespace's builds that a
//! background worker refreshes on an interval. Lookups that miss the snapshot
//! fall through to a direct orchestrator call. Names the orchestrator reports as
//! missing are remembered briefly.

pub mod config;
pub mod directory;
pub mod metrics_defs;
pub mod orchestrator;
#[cfg(test)]
mod testutils;
pub mod types;
mod unknown_builds;

pub use directory::{BuildDirectory, Directory, DirectoryError, LoadError};
pub use orchestrator::{OrchestratorClient, OrchestratorError};
pub use types::{BuildRecord, DOWNLOAD_KEY, PLATFORM_KEY, PlatformType, TOKEN_KEY};
