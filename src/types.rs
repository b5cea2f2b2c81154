//! Core types for ELK stack management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One of the three stack services managed by this tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    Elasticsearch,
    Kibana,
    Logstash,
}

impl Service {
    /// All managed services, in health-check order
    pub const ALL: [Service; 3] = [Service::Elasticsearch, Service::Kibana, Service::Logstash];

    /// Get the service name as used in the compose file
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Elasticsearch => "elasticsearch",
            Service::Kibana => "kibana",
            Service::Logstash => "logstash",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elasticsearch" => Ok(Service::Elasticsearch),
            "kibana" => Ok(Service::Kibana),
            "logstash" => Ok(Service::Logstash),
            _ => Err(format!(
                "Unknown service '{}'. Must be elasticsearch, kibana, or logstash",
                s
            )),
        }
    }
}

/// State of an Elasticsearch snapshot as reported by the snapshot API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotState {
    InProgress,
    Success,
    Failed,
    /// Any state the API may report beyond the three above (e.g. PARTIAL).
    /// Pollers treat it as still in progress.
    #[serde(other)]
    Other,
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SnapshotState::InProgress => "IN_PROGRESS",
            SnapshotState::Success => "SUCCESS",
            SnapshotState::Failed => "FAILED",
            SnapshotState::Other => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// A snapshot entry from the repository listing
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotInfo {
    pub snapshot: String,
    pub state: SnapshotState,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub indices: Vec<String>,
}

/// Manifest written as `backup_info.json` inside every backup archive.
///
/// Invariant: `backup_components` names only files that are actually
/// present next to the manifest in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub timestamp: String,
    pub elasticsearch_url: String,
    pub kibana_url: String,
    pub indices: Vec<String>,
    pub backup_components: Vec<BackupComponent>,
}

/// One component recorded in the backup manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackupComponent {
    ElasticsearchSnapshot {
        snapshot_name: String,
        repository: String,
    },
    KibanaSavedObjects {
        file: String,
    },
    IndexMappings {
        file: String,
    },
}

/// Static readiness-probe configuration for one service
#[derive(Debug, Clone)]
pub struct HealthCheckSpec {
    /// Status endpoint probed with a short-timeout GET
    pub url: String,
    /// Maximum cumulative wait before the service is reported not ready
    pub timeout: Duration,
    /// Sleep between probe attempts
    pub interval: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_parses_known_names_case_insensitively() {
        assert_eq!("elasticsearch".parse::<Service>(), Ok(Service::Elasticsearch));
        assert_eq!("Kibana".parse::<Service>(), Ok(Service::Kibana));
        assert_eq!("LOGSTASH".parse::<Service>(), Ok(Service::Logstash));
    }

    #[test]
    fn service_parse_error_names_the_supported_set() {
        let err = "elastisearch".parse::<Service>().unwrap_err();
        assert!(err.contains("elasticsearch"));
        assert!(err.contains("kibana"));
        assert!(err.contains("logstash"));
    }

    #[test]
    fn snapshot_state_decodes_wire_names() {
        let s: SnapshotState = serde_json::from_str("\"SUCCESS\"").unwrap();
        assert_eq!(s, SnapshotState::Success);
        let s: SnapshotState = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(s, SnapshotState::InProgress);
        // States we don't model explicitly must not fail decoding
        let s: SnapshotState = serde_json::from_str("\"PARTIAL\"").unwrap();
        assert_eq!(s, SnapshotState::Other);
    }

    #[test]
    fn backup_component_serializes_with_type_tag() {
        let c = BackupComponent::ElasticsearchSnapshot {
            snapshot_name: "backup_20240101_120000".to_string(),
            repository: "backup_repo".to_string(),
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["type"], "elasticsearch_snapshot");
        assert_eq!(v["snapshot_name"], "backup_20240101_120000");

        let c = BackupComponent::KibanaSavedObjects {
            file: "kibana_saved_objects.ndjson".to_string(),
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["type"], "kibana_saved_objects");
    }
}
