//! Elasticsearch API client

use crate::api::SearchApi;
use crate::console::{error, info};
use crate::error::Result;
use crate::types::{SnapshotInfo, SnapshotState};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// Snapshot repository location inside the Elasticsearch container. Must
/// match the `path.repo` volume configured in the compose file.
const SNAPSHOT_REPO_LOCATION: &str = "/usr/share/elasticsearch/data/snapshots";

#[derive(Deserialize)]
struct ClusterHealth {
    status: String,
}

#[derive(Deserialize)]
struct CatIndex {
    index: String,
}

#[derive(Deserialize)]
struct SnapshotsResponse {
    snapshots: Vec<SnapshotInfo>,
}

/// Blocking HTTP client for the Elasticsearch REST API
pub struct EsClient {
    base_url: String,
    client: Client,
}

impl EsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        EsClient {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn cluster_status(&self) -> Result<String> {
        let health: ClusterHealth = self
            .client
            .get(self.url("/_cluster/health"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(health.status)
    }
}

/// `indices` scope string for snapshot and restore requests
fn index_selector(indices: Option<&[String]>) -> String {
    match indices {
        Some(list) if !list.is_empty() => list.join(","),
        _ => "*".to_string(),
    }
}

impl SearchApi for EsClient {
    fn check_health(&self) -> bool {
        match self.cluster_status() {
            Ok(status) => {
                info(&format!("Elasticsearch status: {}", status));
                status == "green" || status == "yellow"
            }
            Err(e) => {
                error(&format!("Elasticsearch health check failed: {}", e));
                false
            }
        }
    }

    fn user_indices(&self) -> Result<Vec<String>> {
        let indices: Vec<CatIndex> = self
            .client
            .get(self.url("/_cat/indices?format=json"))
            .send()?
            .error_for_status()?
            .json()?;

        Ok(indices
            .into_iter()
            .map(|entry| entry.index)
            .filter(|name| !name.starts_with('.'))
            .collect())
    }

    fn index_mapping(&self, index: &str) -> Result<Value> {
        let mapping = self
            .client
            .get(self.url(&format!("/{}/_mapping", index)))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(mapping)
    }

    fn ensure_repository(&self, repo: &str) -> Result<()> {
        let config = json!({
            "type": "fs",
            "settings": {
                "location": SNAPSHOT_REPO_LOCATION,
                "compress": true
            }
        });

        self.client
            .put(self.url(&format!("/_snapshot/{}", repo)))
            .json(&config)
            .send()?
            .error_for_status()?;

        info(&format!("Snapshot repository '{}' registered", repo));
        Ok(())
    }

    fn create_snapshot(&self, repo: &str, name: &str, indices: Option<&[String]>) -> Result<()> {
        let config = json!({
            "indices": index_selector(indices),
            "ignore_unavailable": true,
            "include_global_state": true,
            "metadata": {
                "taken_by": "elk-manager",
                "taken_because": "cli_backup"
            }
        });

        self.client
            .put(self.url(&format!("/_snapshot/{}/{}", repo, name)))
            .json(&config)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    fn snapshot_state(&self, repo: &str, name: &str) -> Result<SnapshotState> {
        let response: SnapshotsResponse = self
            .client
            .get(self.url(&format!("/_snapshot/{}/{}", repo, name)))
            .send()?
            .error_for_status()?
            .json()?;

        response
            .snapshots
            .first()
            .map(|snapshot| snapshot.state)
            .ok_or_else(|| {
                crate::error::Error::Other(format!("Snapshot '{}' not found in '{}'", name, repo))
            })
    }

    fn restore_snapshot(&self, repo: &str, name: &str, indices: Option<&[String]>) -> Result<()> {
        let config = json!({
            "indices": index_selector(indices),
            "ignore_unavailable": true,
            "include_global_state": true
        });

        self.client
            .post(self.url(&format!("/_snapshot/{}/{}/_restore", repo, name)))
            .json(&config)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    fn snapshots(&self, repo: &str) -> Result<Vec<SnapshotInfo>> {
        let response: SnapshotsResponse = self
            .client
            .get(self.url(&format!("/_snapshot/{}/_all", repo)))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(response.snapshots)
    }
}
