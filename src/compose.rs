//! Docker Compose process control

use crate::console::{info, success, warn};
use crate::error::{Error, Result};
use crate::types::Service;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

/// The two invocation forms of Compose found in the wild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComposeInvocation {
    /// Legacy standalone `docker-compose` binary
    Standalone,
    /// `docker compose` plugin subcommand
    Plugin,
}

impl ComposeInvocation {
    fn program(&self) -> &'static str {
        match self {
            ComposeInvocation::Standalone => "docker-compose",
            ComposeInvocation::Plugin => "docker",
        }
    }

    fn base_args(&self) -> &'static [&'static str] {
        match self {
            ComposeInvocation::Standalone => &[],
            ComposeInvocation::Plugin => &["compose"],
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            ComposeInvocation::Standalone => "docker-compose",
            ComposeInvocation::Plugin => "docker compose",
        }
    }
}

/// Runs Compose subcommands against the project's compose file
pub struct ComposeRunner {
    project_root: PathBuf,
    invocation: ComposeInvocation,
}

impl ComposeRunner {
    /// Probe both invocation forms with a version query and cache whichever
    /// answers for the lifetime of this runner. Neither answering is a hard
    /// prerequisite failure.
    pub fn detect(project_root: impl Into<PathBuf>) -> Result<Self> {
        let project_root = project_root.into();

        for invocation in [ComposeInvocation::Standalone, ComposeInvocation::Plugin] {
            let responds = Command::new(invocation.program())
                .args(invocation.base_args())
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false);

            if responds {
                return Ok(ComposeRunner {
                    project_root,
                    invocation,
                });
            }
        }

        Err(Error::ComposeNotFound)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.invocation.program());
        cmd.args(self.invocation.base_args());
        cmd.current_dir(&self.project_root);
        cmd
    }

    /// Run a subcommand with captured output
    fn run(&self, args: &[&str]) -> Result<()> {
        let output = self.command().args(args).output()?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                command: format!("{} {}", self.invocation.display_name(), args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }

    /// Bring the service group up, detached. Failure is fatal.
    pub fn up(&self) -> Result<()> {
        info("Starting the ELK stack...");
        self.run(&["up", "-d"])?;
        success("ELK stack containers started");
        Ok(())
    }

    /// Tear the service group down, optionally removing volumes.
    ///
    /// Failure is tolerated: if the containers are already gone, teardown
    /// has achieved its goal.
    pub fn down(&self, remove_volumes: bool) -> bool {
        info("Stopping containers...");

        let mut args = vec!["down"];
        if remove_volumes {
            args.push("-v");
        }

        match self.run(&args) {
            Ok(()) => success("Containers stopped"),
            Err(e) => warn(&format!("Failed to stop containers: {}", e)),
        }
        true
    }

    /// Refresh service images. Stale images are acceptable, so failure is
    /// logged and tolerated.
    pub fn pull(&self) -> bool {
        info("Refreshing service images...");

        match self.run(&["pull"]) {
            Ok(()) => success("Service images refreshed"),
            Err(e) => warn(&format!("Failed to refresh images: {}", e)),
        }
        true
    }

    /// Stream the service status listing to the console
    pub fn ps(&self) -> Result<()> {
        let status = self.command().arg("ps").status()?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Other("Failed to show service status".to_string()))
        }
    }

    /// Stream service logs to the console, inheriting stdio.
    ///
    /// A child terminated by a signal (e.g. Ctrl-C while following) counts
    /// as a clean exit.
    pub fn logs(&self, service: Option<&str>, follow: bool, tail: u32) -> Result<()> {
        let service = service.map(validate_service).transpose()?;

        let mut args: Vec<String> = vec!["logs".to_string()];
        if tail > 0 {
            args.push("--tail".to_string());
            args.push(tail.to_string());
        }
        if follow {
            args.push("-f".to_string());
        }
        if let Some(service) = service {
            args.push(service.as_str().to_string());
        }

        let status = self.command().args(&args).status()?;
        if status.success() {
            return Ok(());
        }
        if interrupted(&status) {
            println!();
            info("Log streaming ended");
            return Ok(());
        }
        Err(Error::Other(format!("Log display failed ({})", status)))
    }
}

/// Check that the Docker engine CLI is available, returning its version line
pub fn check_docker() -> Result<String> {
    let output = Command::new("docker")
        .arg("--version")
        .output()
        .map_err(|_| Error::DockerNotFound)?;

    if !output.status.success() {
        return Err(Error::DockerNotFound);
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn validate_service(name: &str) -> Result<Service> {
    name.parse::<Service>()
        .map_err(|_| Error::UnknownService(name.to_string()))
}

#[cfg(unix)]
fn interrupted(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal().is_some()
}

#[cfg(not(unix))]
fn interrupted(_status: &ExitStatus) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_service_names_validate() {
        assert_eq!(validate_service("kibana").unwrap(), Service::Kibana);
        assert_eq!(
            validate_service("Elasticsearch").unwrap(),
            Service::Elasticsearch
        );
    }

    #[test]
    fn unknown_service_error_names_the_supported_set() {
        let err = validate_service("nginx").unwrap_err().to_string();
        assert!(err.contains("nginx"));
        assert!(err.contains("elasticsearch, logstash, kibana"));
    }
}
