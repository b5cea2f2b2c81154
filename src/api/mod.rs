//! HTTP clients for the stack's service APIs
//!
//! The traits abstract over the two external services so orchestration code
//! can run against recording mocks in tests.

mod elasticsearch;
mod kibana;

pub use elasticsearch::EsClient;
pub use kibana::KibanaClient;

use crate::error::Result;
use crate::types::{SnapshotInfo, SnapshotState};
use serde_json::Value;
use std::path::Path;

/// Search-engine operations: index discovery and the snapshot lifecycle
pub trait SearchApi {
    /// Cluster reachable and in a usable state
    fn check_health(&self) -> bool;

    /// Names of all non-system indices
    fn user_indices(&self) -> Result<Vec<String>>;

    /// Raw mapping JSON for one index
    fn index_mapping(&self, index: &str) -> Result<Value>;

    /// Idempotent create-or-update of a filesystem snapshot repository
    fn ensure_repository(&self, repo: &str) -> Result<()>;

    /// Submit a snapshot request. Completion is awaited separately.
    fn create_snapshot(&self, repo: &str, name: &str, indices: Option<&[String]>) -> Result<()>;

    /// Current state of one snapshot
    fn snapshot_state(&self, repo: &str, name: &str) -> Result<SnapshotState>;

    /// Submit a restore request. Completion is never awaited.
    fn restore_snapshot(&self, repo: &str, name: &str, indices: Option<&[String]>) -> Result<()>;

    /// All snapshots held in a repository
    fn snapshots(&self, repo: &str) -> Result<Vec<SnapshotInfo>>;
}

/// UI-layer operations: saved-object export and import
pub trait SavedObjectsApi {
    /// Status endpoint reachable
    fn check_health(&self) -> bool;

    /// Export the known saved-object types with deep reference resolution,
    /// writing the raw response body to `dest`
    fn export_saved_objects(&self, dest: &Path) -> Result<()>;

    /// Upload a previously exported file, returning the raw response body
    fn import_saved_objects(&self, file: &Path, overwrite: bool) -> Result<String>;
}
