//! Kibana API client

use crate::api::SavedObjectsApi;
use crate::console::{error, info};
use crate::error::Result;
use reqwest::blocking::{multipart, Client};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Saved-object types included in every export, together with everything
/// they reference
const SAVED_OBJECT_TYPES: [&str; 11] = [
    "dashboard",
    "visualization",
    "search",
    "index-pattern",
    "config",
    "timelion-sheet",
    "graph-workspace",
    "map",
    "lens",
    "canvas-workpad",
    "data-source",
];

/// Anti-forgery header Kibana requires on every mutating API call
const XSRF_HEADER: &str = "kbn-xsrf";

/// Blocking HTTP client for the Kibana saved-objects API
pub struct KibanaClient {
    base_url: String,
    client: Client,
}

impl KibanaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        KibanaClient {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn overall_state(&self) -> Result<String> {
        let status: Value = self
            .client
            .get(self.url("/api/status"))
            .send()?
            .error_for_status()?
            .json()?;

        Ok(status["status"]["overall"]["state"]
            .as_str()
            .unwrap_or("unknown")
            .to_string())
    }
}

impl SavedObjectsApi for KibanaClient {
    fn check_health(&self) -> bool {
        match self.overall_state() {
            Ok(state) => {
                info(&format!("Kibana status: {}", state));
                true
            }
            Err(e) => {
                error(&format!("Kibana health check failed: {}", e));
                false
            }
        }
    }

    fn export_saved_objects(&self, dest: &Path) -> Result<()> {
        let body = json!({
            "type": SAVED_OBJECT_TYPES,
            "includeReferencesDeep": true
        });

        let response = self
            .client
            .post(self.url("/api/saved_objects/_export"))
            .header(XSRF_HEADER, "true")
            .json(&body)
            .send()?
            .error_for_status()?;

        fs::write(dest, response.bytes()?)?;
        Ok(())
    }

    fn import_saved_objects(&self, file: &Path, overwrite: bool) -> Result<String> {
        let mut url = self.url("/api/saved_objects/_import");
        if overwrite {
            url.push_str("?overwrite=true");
        }

        let form = multipart::Form::new().file("file", file)?;
        let response = self
            .client
            .post(url)
            .header(XSRF_HEADER, "true")
            .multipart(form)
            .send()?
            .error_for_status()?;

        Ok(response.text()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn export_writes_the_raw_response_body() {
        let mut server = mockito::Server::new();
        let body = "{\"type\":\"dashboard\",\"id\":\"a\"}\n{\"exportedCount\":1}\n";
        let mock = server
            .mock("POST", "/api/saved_objects/_export")
            .match_header(XSRF_HEADER, "true")
            .match_body(Matcher::PartialJson(json!({
                "includeReferencesDeep": true
            })))
            .with_body(body)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.ndjson");
        KibanaClient::new(server.url())
            .export_saved_objects(&dest)
            .unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), body);
        mock.assert();
    }

    #[test]
    fn import_with_overwrite_sets_the_query_flag_and_is_repeatable() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/saved_objects/_import")
            .match_query(Matcher::UrlEncoded("overwrite".into(), "true".into()))
            .match_header(XSRF_HEADER, "true")
            .with_body(r#"{"success":true,"successCount":3}"#)
            .expect(2)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("export.ndjson");
        fs::write(&file, "{\"type\":\"dashboard\"}\n").unwrap();

        let client = KibanaClient::new(server.url());
        // import-with-overwrite must be accepted twice in a row
        for _ in 0..2 {
            let body = client.import_saved_objects(&file, true).unwrap();
            assert!(body.contains("successCount"));
        }
        mock.assert();
    }

    #[test]
    fn import_without_overwrite_omits_the_query_flag() {
        let mut server = mockito::Server::new();
        let with_flag = server
            .mock("POST", "/api/saved_objects/_import")
            .match_query(Matcher::UrlEncoded("overwrite".into(), "true".into()))
            .with_body("{}")
            .expect(0)
            .create();
        let plain = server
            .mock("POST", "/api/saved_objects/_import")
            .with_body(r#"{"success":true}"#)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("export.ndjson");
        fs::write(&file, "{}\n").unwrap();

        KibanaClient::new(server.url())
            .import_saved_objects(&file, false)
            .unwrap();
        with_flag.assert();
        plain.assert();
    }

    #[test]
    fn health_state_falls_back_to_unknown_on_unexpected_shape() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/status")
            .with_body(r#"{"name":"kibana"}"#)
            .create();

        // reachable but unparseable status detail still counts as healthy
        assert!(KibanaClient::new(server.url()).check_health());
    }

    #[test]
    fn unreachable_status_endpoint_is_unhealthy() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/api/status").with_status(502).create();

        assert!(!KibanaClient::new(server.url()).check_health());
    }
}
