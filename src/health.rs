//! Service readiness polling

use crate::console::{info, success, warn};
use crate::types::{HealthCheckSpec, Service};
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

/// Per-attempt timeout for a single readiness probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Grace period before the first probe, so freshly started containers get
/// a chance to bind their ports
const STARTUP_GRACE: Duration = Duration::from_secs(10);

/// Polls readiness endpoints until success or timeout
pub struct HealthChecker {
    specs: HashMap<String, HealthCheckSpec>,
    client: Client,
}

impl HealthChecker {
    pub fn new(specs: HashMap<String, HealthCheckSpec>) -> Self {
        HealthChecker {
            specs,
            client: Client::new(),
        }
    }

    /// One blocking probe; ready means a non-error HTTP status
    fn probe(&self, url: &str) -> bool {
        self.client
            .get(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    /// Wait until the named service answers its readiness probe.
    ///
    /// Returns false on timeout without raising; the caller treats that as
    /// degraded, not fatal. Names without a probe spec are reported ready
    /// immediately with a warning.
    pub fn wait_for_ready(&self, service: &str) -> bool {
        let spec = match self.specs.get(service) {
            Some(spec) => spec,
            None => {
                warn(&format!("Unknown service: {}", service));
                return true;
            }
        };

        info(&format!("Waiting for {} to become ready...", service));

        let start = Instant::now();
        while start.elapsed() < spec.timeout {
            if self.probe(&spec.url) {
                success(&format!("{} is ready", service));
                return true;
            }

            info(&format!(
                "Still waiting for {}... ({}/{}s)",
                service,
                start.elapsed().as_secs(),
                spec.timeout.as_secs()
            ));
            thread::sleep(spec.interval);
        }

        warn(&format!("Timed out waiting for {} to become ready", service));
        false
    }

    /// Probe every managed service in sequence. All services are checked
    /// even after a failure, so the console shows the full picture.
    pub fn check_all(&self) -> bool {
        info("Checking service health...");
        thread::sleep(STARTUP_GRACE);

        let mut all_ready = true;
        for service in Service::ALL {
            if !self.wait_for_ready(service.as_str()) {
                all_ready = false;
            }
        }
        all_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(url: String, timeout_ms: u64, interval_ms: u64) -> HealthCheckSpec {
        HealthCheckSpec {
            url,
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    #[test]
    fn unknown_service_is_reported_ready() {
        let checker = HealthChecker::new(HashMap::new());
        let start = Instant::now();
        assert!(checker.wait_for_ready("elastisearch"));
        // no polling loop for unknown names
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn ready_on_first_successful_probe() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/_cluster/health")
            .with_status(200)
            .with_body("{\"status\":\"green\"}")
            .create();

        let mut specs = HashMap::new();
        specs.insert(
            "elasticsearch".to_string(),
            spec(format!("{}/_cluster/health", server.url()), 1000, 10),
        );

        assert!(HealthChecker::new(specs).wait_for_ready("elasticsearch"));
        mock.assert();
    }

    #[test]
    fn error_status_is_not_ready() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/status")
            .with_status(503)
            .create();

        let mut specs = HashMap::new();
        specs.insert(
            "kibana".to_string(),
            spec(format!("{}/api/status", server.url()), 100, 20),
        );

        assert!(!HealthChecker::new(specs).wait_for_ready("kibana"));
    }

    #[test]
    fn timeout_terminates_within_timeout_plus_interval() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/_node/stats")
            .with_status(500)
            .expect_at_least(1)
            .create();

        let mut specs = HashMap::new();
        specs.insert(
            "logstash".to_string(),
            spec(format!("{}/_node/stats", server.url()), 150, 30),
        );

        let checker = HealthChecker::new(specs);
        let start = Instant::now();
        assert!(!checker.wait_for_ready("logstash"));
        // bounded by timeout + one trailing interval, with scheduling slack
        assert!(start.elapsed() < Duration::from_millis(150 + 30 + 500));
    }
}
