//! elk-manager: Manage a containerized ELK stack
//!
//! This library backs the `elk-manager` CLI: Docker Compose lifecycle
//! control, readiness polling, and backup/restore of Elasticsearch
//! snapshots and Kibana saved objects.

pub mod api;
pub mod backup;
pub mod compose;
pub mod config;
pub mod console;
pub mod error;
pub mod health;
pub mod types;

pub use backup::BackupManager;
pub use compose::ComposeRunner;
pub use config::Config;
pub use error::{Error, Result};
pub use health::HealthChecker;
pub use types::{BackupComponent, BackupManifest, Service, SnapshotInfo, SnapshotState};
