//! Backup and restore orchestration
//!
//! Composes the Elasticsearch snapshot lifecycle, the Kibana saved-objects
//! workflows, and full-backup archive assembly. Component failures inside a
//! full backup are tolerated and simply left out of the manifest; only the
//! initial health gate aborts the run.

use crate::api::{SavedObjectsApi, SearchApi};
use crate::console::{error, info, success, warn};
use crate::error::Result;
use crate::types::{BackupComponent, BackupManifest, SnapshotInfo, SnapshotState};
use chrono::Local;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Well-known repository every snapshot operation goes through
pub const SNAPSHOT_REPOSITORY: &str = "backup_repo";

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(300);
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Orchestrates backup and restore against the two service APIs
pub struct BackupManager<S, K> {
    search: S,
    saved_objects: K,
    backup_dir: PathBuf,
    es_url: String,
    kibana_url: String,
    repository: String,
    completion_timeout: Duration,
    poll_interval: Duration,
}

impl<S: SearchApi, K: SavedObjectsApi> BackupManager<S, K> {
    pub fn new(
        search: S,
        saved_objects: K,
        backup_dir: impl Into<PathBuf>,
        es_url: impl Into<String>,
        kibana_url: impl Into<String>,
    ) -> Self {
        BackupManager {
            search,
            saved_objects,
            backup_dir: backup_dir.into(),
            es_url: es_url.into(),
            kibana_url: kibana_url.into(),
            repository: SNAPSHOT_REPOSITORY.to_string(),
            completion_timeout: COMPLETION_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the snapshot completion poll timing
    pub fn with_poll_timing(mut self, timeout: Duration, interval: Duration) -> Self {
        self.completion_timeout = timeout;
        self.poll_interval = interval;
        self
    }

    fn timestamp() -> String {
        Local::now().format("%Y%m%d_%H%M%S").to_string()
    }

    /// Create a snapshot and block until it reaches a terminal state.
    ///
    /// Returns the snapshot name only when the snapshot actually completed,
    /// so callers can report a truthful result.
    pub fn create_snapshot(
        &self,
        name: Option<&str>,
        indices: Option<&[String]>,
    ) -> Option<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("snapshot_{}", Self::timestamp()),
        };

        if let Err(e) = self.search.ensure_repository(&self.repository) {
            error(&format!("Failed to register snapshot repository: {}", e));
            return None;
        }

        if let Err(e) = self.search.create_snapshot(&self.repository, &name, indices) {
            error(&format!("Failed to create snapshot: {}", e));
            return None;
        }

        if self.await_completion(&name, self.completion_timeout) {
            success(&format!("Elasticsearch snapshot '{}' created", name));
            Some(name)
        } else {
            None
        }
    }

    /// Poll the snapshot until SUCCESS, FAILED, or timeout. FAILED is
    /// terminal and never retried; a status-check error ends polling.
    pub fn await_completion(&self, name: &str, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            match self.search.snapshot_state(&self.repository, name) {
                Ok(SnapshotState::Success) => {
                    info(&format!("Snapshot {} completed", name));
                    return true;
                }
                Ok(SnapshotState::Failed) => {
                    error(&format!("Snapshot {} failed", name));
                    return false;
                }
                Ok(state) => {
                    info(&format!("Snapshot {} in progress... ({})", name, state));
                }
                Err(e) => {
                    error(&format!("Error checking snapshot status: {}", e));
                    return false;
                }
            }
            thread::sleep(self.poll_interval);
        }

        error(&format!("Snapshot {} timed out", name));
        false
    }

    /// Submit a restore request. Returns true on acceptance; restore
    /// progress is deliberately not awaited, unlike snapshot creation.
    pub fn restore(&self, name: &str, indices: Option<&[String]>) -> bool {
        match self
            .search
            .restore_snapshot(&self.repository, name, indices)
        {
            Ok(()) => {
                info(&format!("Snapshot {} restore initiated", name));
                true
            }
            Err(e) => {
                error(&format!("Failed to restore snapshot: {}", e));
                false
            }
        }
    }

    /// Print and return all snapshots in the repository. Empty on failure.
    pub fn list_snapshots(&self) -> Vec<SnapshotInfo> {
        let snapshots = match self.search.snapshots(&self.repository) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                error(&format!("Failed to list snapshots: {}", e));
                return Vec::new();
            }
        };

        info("Available snapshots:");
        for snapshot in &snapshots {
            info("--------------------------------------------------------------------------------");
            info(&format!("Name: {}", snapshot.snapshot));
            info(&format!("State: {}", snapshot.state));
            info(&format!("Start time: {}", snapshot.start_time));
            info(&format!("Indices: {} indices", snapshot.indices.len()));
        }
        snapshots
    }

    /// Export saved objects to the given file, or to a timestamped file in
    /// the backup directory. Relative paths are resolved against the backup
    /// directory.
    pub fn export_saved_objects(&self, output: Option<&Path>) -> Option<PathBuf> {
        let dest = match output {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.backup_dir.join(path),
            None => self
                .backup_dir
                .join(format!("kibana_saved_objects_{}.ndjson", Self::timestamp())),
        };

        if let Some(parent) = dest.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error(&format!("Failed to create {}: {}", parent.display(), e));
                return None;
            }
        }

        if self.export_to(&dest) {
            success(&format!("Kibana saved objects exported to: {}", dest.display()));
            Some(dest)
        } else {
            None
        }
    }

    /// Export into `dest`, requiring both a successful request and a
    /// non-empty file on disk afterwards.
    fn export_to(&self, dest: &Path) -> bool {
        if let Err(e) = self.saved_objects.export_saved_objects(dest) {
            error(&format!("Failed to export Kibana saved objects: {}", e));
            return false;
        }
        match fs::metadata(dest) {
            Ok(meta) if meta.len() > 0 => true,
            _ => {
                error("Saved-objects export produced no data");
                false
            }
        }
    }

    /// Upload a saved-objects file. The response body is logged but not
    /// parsed, so partial import failures inside it do not fail the call.
    pub fn import_saved_objects(&self, file: &Path, overwrite: bool) -> bool {
        match self.saved_objects.import_saved_objects(file, overwrite) {
            Ok(body) if !body.is_empty() => {
                info(&format!("Kibana saved-objects import result: {}", body));
                true
            }
            Ok(_) => {
                error("Kibana saved-objects import returned an empty response");
                false
            }
            Err(e) => {
                error(&format!("Failed to import Kibana saved objects: {}", e));
                false
            }
        }
    }

    /// Full stack backup: snapshot, saved objects, and (for an explicit
    /// index set) mappings, bundled into one timestamped archive.
    pub fn backup_full(&self, indices: Option<&[String]>) -> Option<PathBuf> {
        info("Starting full ELK stack backup...");

        if !self.search.check_health() {
            error("Elasticsearch is not healthy, aborting backup");
            return None;
        }
        if !self.saved_objects.check_health() {
            error("Kibana is not healthy, aborting backup");
            return None;
        }

        let manifest_indices = match indices {
            Some(list) => list.to_vec(),
            None => self.search.user_indices().unwrap_or_else(|e| {
                warn(&format!("Failed to list indices: {}", e));
                Vec::new()
            }),
        };

        let timestamp = Self::timestamp();
        let scratch_name = format!("elk_backup_{}", timestamp);
        let scratch = self.backup_dir.join(&scratch_name);
        if let Err(e) = fs::create_dir_all(&scratch) {
            error(&format!("Failed to create {}: {}", scratch.display(), e));
            return None;
        }

        let mut components = Vec::new();

        if let Some(name) = self.create_snapshot(Some(&format!("backup_{}", timestamp)), indices) {
            components.push(BackupComponent::ElasticsearchSnapshot {
                snapshot_name: name,
                repository: self.repository.clone(),
            });
        }

        let saved_objects_file = "kibana_saved_objects.ndjson";
        if self.export_to(&scratch.join(saved_objects_file)) {
            components.push(BackupComponent::KibanaSavedObjects {
                file: saved_objects_file.to_string(),
            });
        }

        if let Some(list) = indices {
            let mut mappings = serde_json::Map::new();
            for index in list {
                match self.search.index_mapping(index) {
                    Ok(mapping) => {
                        mappings.insert(index.clone(), mapping);
                    }
                    Err(e) => warn(&format!("Failed to export mapping for {}: {}", index, e)),
                }
            }

            if !mappings.is_empty() {
                let mappings_file = "index_mappings.json";
                match serde_json::to_vec_pretty(&mappings) {
                    Ok(bytes) => match fs::write(scratch.join(mappings_file), bytes) {
                        Ok(()) => components.push(BackupComponent::IndexMappings {
                            file: mappings_file.to_string(),
                        }),
                        Err(e) => warn(&format!("Failed to write index mappings: {}", e)),
                    },
                    Err(e) => warn(&format!("Failed to serialize index mappings: {}", e)),
                }
            }
        }

        let manifest = BackupManifest {
            timestamp: timestamp.clone(),
            elasticsearch_url: self.es_url.clone(),
            kibana_url: self.kibana_url.clone(),
            indices: manifest_indices,
            backup_components: components,
        };

        let write_result: Result<()> = (|| {
            let bytes = serde_json::to_vec_pretty(&manifest)?;
            fs::write(scratch.join("backup_info.json"), bytes)?;
            Ok(())
        })();
        if let Err(e) = write_result {
            error(&format!("Failed to write backup manifest: {}", e));
            let _ = fs::remove_dir_all(&scratch);
            return None;
        }

        let archive_path = self.backup_dir.join(format!("{}.tar.gz", scratch_name));
        if let Err(e) = archive_dir(&scratch, &scratch_name, &archive_path) {
            error(&format!("Failed to create backup archive: {}", e));
            let _ = fs::remove_dir_all(&scratch);
            return None;
        }
        let _ = fs::remove_dir_all(&scratch);

        success(&format!("Full backup completed: {}", archive_path.display()));
        Some(archive_path)
    }
}

/// Compress `dir` into a gzipped tarball rooted at `arcname`
fn archive_dir(dir: &Path, arcname: &str, archive_path: &Path) -> Result<()> {
    let file = fs::File::create(archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(arcname, dir)?;
    builder.into_inner()?.finish()?;
    Ok(())
}
