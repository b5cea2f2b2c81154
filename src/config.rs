//! Process-wide configuration, built once at startup and never mutated

use crate::console::warn;
use crate::error::{Error, Result};
use crate::types::{HealthCheckSpec, Service};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_ES_PORT: &str = "9200";
const DEFAULT_KIBANA_PORT: &str = "5601";
/// Logstash exposes its monitoring API on a fixed port separate from the
/// Beats ingestion port configured in the env file.
const LOGSTASH_MONITORING_PORT: &str = "9600";

const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(10);

/// Resolved configuration for one invocation
#[derive(Debug, Clone)]
pub struct Config {
    pub project_root: PathBuf,
    pub env_file: PathBuf,
    pub compose_file: PathBuf,
    pub backup_dir: PathBuf,
    pub es_url: String,
    pub kibana_url: String,
}

impl Config {
    /// Build a configuration rooted at the given project directory.
    ///
    /// A missing or unreadable `.env` file is not an error here: commands
    /// that require it check explicitly, everything else runs on the
    /// default ports.
    pub fn from_project_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let env_file = project_root.join(".env");
        let compose_file = project_root.join("docker-compose.yml");
        let backup_dir = project_root.join("backups");

        let vars = if env_file.exists() {
            load_env(&env_file).unwrap_or_else(|e| {
                warn(&e.to_string());
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        let get = |key: &str, default: &str| -> String {
            match vars.get(key) {
                Some(v) if !v.is_empty() => v.clone(),
                _ => default.to_string(),
            }
        };

        let es_port = get("ELASTICSEARCH_PORT", DEFAULT_ES_PORT);
        let kibana_port = get("KIBANA_PORT", DEFAULT_KIBANA_PORT);

        Config {
            project_root,
            env_file,
            compose_file,
            backup_dir,
            es_url: format!("http://localhost:{}", es_port),
            kibana_url: format!("http://localhost:{}", kibana_port),
        }
    }

    /// Readiness-probe table for all managed services
    pub fn health_specs(&self) -> HashMap<String, HealthCheckSpec> {
        let mut specs = HashMap::new();
        specs.insert(
            Service::Elasticsearch.as_str().to_string(),
            HealthCheckSpec {
                url: format!("{}/_cluster/health", self.es_url),
                timeout: DEFAULT_HEALTH_TIMEOUT,
                interval: DEFAULT_HEALTH_INTERVAL,
            },
        );
        specs.insert(
            Service::Kibana.as_str().to_string(),
            HealthCheckSpec {
                url: format!("{}/api/status", self.kibana_url),
                timeout: DEFAULT_HEALTH_TIMEOUT,
                interval: DEFAULT_HEALTH_INTERVAL,
            },
        );
        specs.insert(
            Service::Logstash.as_str().to_string(),
            HealthCheckSpec {
                url: format!(
                    "http://localhost:{}/_node/stats",
                    LOGSTASH_MONITORING_PORT
                ),
                timeout: DEFAULT_HEALTH_TIMEOUT,
                interval: DEFAULT_HEALTH_INTERVAL,
            },
        );
        specs
    }

    /// Service data directories. The backup store is deliberately not one
    /// of these: cleanup clears them, and backups must survive cleanup.
    pub fn data_directories(&self) -> Vec<PathBuf> {
        vec![
            self.project_root.join("Volumes/Elasticsearch/data"),
            self.project_root.join("Volumes/Kibana/data"),
            self.project_root.join("Volumes/Logstash/data"),
        ]
    }

    /// Check that the env file supplies the port variables shown in the
    /// endpoint summary after start/restart. Returns (es, kibana, logstash)
    /// ports, or an error naming every missing variable.
    pub fn require_ports(&self) -> Result<(String, String, String)> {
        let vars = if self.env_file.exists() {
            load_env(&self.env_file)?
        } else {
            HashMap::new()
        };

        let required = ["ELASTICSEARCH_PORT", "KIBANA_PORT", "LOGSTASH_PORT"];
        let missing: Vec<&str> = required
            .iter()
            .filter(|key| vars.get(**key).map_or(true, |v| v.is_empty()))
            .copied()
            .collect();

        if !missing.is_empty() {
            return Err(Error::MissingEnvVars(missing.join(", ")));
        }

        Ok((
            vars["ELASTICSEARCH_PORT"].clone(),
            vars["KIBANA_PORT"].clone(),
            vars["LOGSTASH_PORT"].clone(),
        ))
    }
}

/// Read a newline-delimited `KEY=VALUE` env file (`#` comments allowed)
pub fn load_env(path: &Path) -> Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| Error::Other(format!("Failed to read {}: {}", path.display(), e)))?;

    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item
            .map_err(|e| Error::Other(format!("Failed to parse {}: {}", path.display(), e)))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_env_skips_comments_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# ports\nELASTICSEARCH_PORT=9201\n\nKIBANA_PORT=5602\nLOGSTASH_PORT=5044\n",
        )
        .unwrap();

        let vars = load_env(&path).unwrap();
        assert_eq!(vars["ELASTICSEARCH_PORT"], "9201");
        assert_eq!(vars["KIBANA_PORT"], "5602");
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn config_falls_back_to_default_ports() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_project_root(dir.path());
        assert_eq!(config.es_url, "http://localhost:9200");
        assert_eq!(config.kibana_url, "http://localhost:5601");
    }

    #[test]
    fn env_file_ports_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "ELASTICSEARCH_PORT=19200\n").unwrap();
        let config = Config::from_project_root(dir.path());
        assert_eq!(config.es_url, "http://localhost:19200");
        assert_eq!(config.kibana_url, "http://localhost:5601");
    }

    #[test]
    fn require_ports_names_every_missing_variable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "ELASTICSEARCH_PORT=9200\nKIBANA_PORT=\n").unwrap();
        let config = Config::from_project_root(dir.path());

        let err = config.require_ports().unwrap_err().to_string();
        assert!(err.contains("KIBANA_PORT"));
        assert!(err.contains("LOGSTASH_PORT"));
        assert!(!err.contains("ELASTICSEARCH_PORT,"));
    }

    #[test]
    fn health_specs_cover_all_services() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_project_root(dir.path());
        let specs = config.health_specs();
        for service in Service::ALL {
            assert!(specs.contains_key(service.as_str()));
        }
        assert!(specs["elasticsearch"].url.ends_with("/_cluster/health"));
        assert!(specs["logstash"].url.contains(":9600/"));
    }
}
