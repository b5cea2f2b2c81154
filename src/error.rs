//! Error types for elk-manager

use thiserror::Error;

/// Result type alias for elk-manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during elk-manager operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Docker is not installed or not on PATH")]
    DockerNotFound,

    #[error("Docker Compose is not installed (tried `docker-compose` and `docker compose`)")]
    ComposeNotFound,

    #[error("Missing required environment variables: {0}")]
    MissingEnvVars(String),

    #[error("Unknown service '{0}'. Available services: elasticsearch, logstash, kibana")]
    UnknownService(String),

    #[error("{title} failed at step: {step}")]
    StepFailed { title: String, step: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("{0}")]
    Other(String),
}
