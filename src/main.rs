//! elk-manager CLI - Manage a containerized ELK stack

use clap::{Parser, Subcommand};
use elk_manager::api::{EsClient, KibanaClient};
use elk_manager::compose::check_docker;
use elk_manager::console::{error, info, success, warn};
use elk_manager::{BackupManager, ComposeRunner, Config, Error, HealthChecker, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "elk-manager")]
#[command(about = "Manage a containerized ELK stack", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run initial setup: prerequisites, directories, image pull
    Setup,

    /// Start the ELK stack and wait for services to become ready
    Start,

    /// Stop the ELK stack
    Stop,

    /// Restart the ELK stack, refreshing images first
    Restart,

    /// Show service logs
    Logs {
        /// Service to show logs for (elasticsearch, kibana, logstash)
        service: Option<String>,
        /// Follow log output
        #[arg(short, long)]
        follow: bool,
        /// Number of lines to show
        #[arg(short, long, default_value_t = 50)]
        tail: u32,
        /// Show service status instead of logs
        #[arg(short, long)]
        status: bool,
    },

    /// Interactively clean up containers, volumes, and data directories
    Cleanup,

    /// Create a full backup (snapshot, saved objects, index mappings)
    Backup {
        /// Back up only these indices
        #[arg(long, num_args = 1..)]
        indices: Option<Vec<String>>,
    },

    /// Restore an Elasticsearch snapshot
    Restore {
        /// Name of the snapshot to restore
        #[arg(long)]
        snapshot_name: Option<String>,
        /// Restore only these indices
        #[arg(long, num_args = 1..)]
        indices: Option<Vec<String>>,
    },

    /// Export Kibana saved objects to a file
    KibanaExportSavedobject {
        /// Output file (relative paths land in the backup directory)
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Import Kibana saved objects from a file
    KibanaImportSavedobject {
        /// Previously exported saved-objects file
        #[arg(long)]
        backup_file: Option<PathBuf>,
        /// Overwrite existing objects on collision
        #[arg(long)]
        overwrite: bool,
    },

    /// List snapshots in the backup repository
    ListSnapshots,
}

/// A named step and its action; multi-step commands stop at the first
/// failed step and report its name.
type Step<'a> = (&'a str, Box<dyn Fn() -> bool + 'a>);

fn run_steps(title: &str, steps: Vec<Step>) -> Result<()> {
    for (name, step) in &steps {
        info(&format!("Running: {}", name));
        if !step() {
            return Err(Error::StepFailed {
                title: title.to_string(),
                step: name.to_string(),
            });
        }
    }
    Ok(())
}

fn logged(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error(&e.to_string());
            false
        }
    }
}

fn check_env_file(config: &Config) -> bool {
    info("Checking the environment file...");
    if !config.env_file.exists() {
        error(&format!(".env file not found: {}", config.env_file.display()));
        error("Create it from .env.template, then run `elk-manager setup`");
        return false;
    }
    info(&format!("Found environment file: {}", config.env_file.display()));
    true
}

fn check_compose_file(config: &Config) -> bool {
    info("Checking the compose file...");
    if !config.compose_file.exists() {
        error(&format!(
            "docker-compose.yml not found: {}",
            config.compose_file.display()
        ));
        error("Create it from docker-compose.yml.template");
        return false;
    }
    info(&format!("Found compose file: {}", config.compose_file.display()));
    true
}

fn check_docker_engine() -> bool {
    match check_docker() {
        Ok(version) => {
            info(&format!("Docker: {}", version));
            true
        }
        Err(e) => {
            error(&e.to_string());
            false
        }
    }
}

fn check_prerequisites(config: &Config) -> bool {
    info("Checking prerequisites...");
    check_env_file(config) && check_compose_file(config) && check_docker_engine()
}

fn create_directories(config: &Config) -> bool {
    info("Creating required directories...");
    let mut dirs = config.data_directories();
    dirs.push(config.backup_dir.clone());

    for dir in dirs {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            error(&format!("Failed to create {}: {}", dir.display(), e));
            return false;
        }
        info(&format!("Created directory: {}", dir.display()));
    }
    true
}

fn clean_data_directories(config: &Config) {
    info("Clearing data directories...");
    for dir in config.data_directories() {
        if !dir.exists() {
            info(&format!("Directory does not exist: {}", dir.display()));
            continue;
        }

        let cleared = std::fs::read_dir(&dir).and_then(|entries| {
            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    std::fs::remove_dir_all(&path)?;
                } else {
                    std::fs::remove_file(&path)?;
                }
            }
            Ok(())
        });

        match cleared {
            Ok(()) => info(&format!("Cleared: {}", dir.display())),
            Err(e) => {
                error(&format!("Failed to clear {}: {}", dir.display(), e));
                warn("This may be a permissions problem; remove the contents manually");
            }
        }
    }
}

fn confirm(message: &str) -> Result<bool> {
    loop {
        print!("{} (y/N): ", message);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "" => return Ok(false),
            _ => println!("Please answer 'y' or 'n'."),
        }
    }
}

/// Print reachable endpoints after a successful start, failing when the
/// env file does not supply the advertised ports.
fn print_endpoints(config: &Config) -> Result<()> {
    let (es_port, kibana_port, logstash_port) = config.require_ports()?;
    info(&format!("Elasticsearch: http://localhost:{}", es_port));
    info(&format!("Kibana: http://localhost:{}", kibana_port));
    info(&format!(
        "Logstash: localhost:{} (Beats), localhost:5000 (TCP/UDP)",
        logstash_port
    ));
    println!();
    info("Check the logs with: elk-manager logs");
    Ok(())
}

fn report_startup(config: &Config, healthy: bool) -> Result<()> {
    print_endpoints(config)?;
    if !healthy {
        warn("Some services may not have started correctly");
        warn("Check the logs: elk-manager logs");
    }
    Ok(())
}

fn backup_manager(config: &Config) -> BackupManager<EsClient, KibanaClient> {
    BackupManager::new(
        EsClient::new(config.es_url.as_str()),
        KibanaClient::new(config.kibana_url.as_str()),
        &config.backup_dir,
        config.es_url.as_str(),
        config.kibana_url.as_str(),
    )
}

fn cmd_setup(config: &Config) -> Result<()> {
    info("=== ELK stack setup ===");
    let compose = ComposeRunner::detect(&config.project_root)?;

    let steps: Vec<Step> = vec![
        ("Docker requirement check", Box::new(check_docker_engine)),
        ("environment file check", Box::new(|| check_env_file(config))),
        ("compose file check", Box::new(|| check_compose_file(config))),
        ("directory creation", Box::new(|| create_directories(config))),
        ("image pull", Box::new(|| compose.pull())),
    ];
    run_steps("Setup", steps)?;

    success("=== Setup complete ===");
    info("Operate the stack with:");
    info("- start:   elk-manager start");
    info("- stop:    elk-manager stop");
    info("- restart: elk-manager restart");
    Ok(())
}

fn cmd_start(config: &Config) -> Result<()> {
    info("=== Starting the ELK stack ===");
    let compose = ComposeRunner::detect(&config.project_root)?;

    let steps: Vec<Step> = vec![
        ("prerequisite check", Box::new(|| check_prerequisites(config))),
        ("service startup", Box::new(|| logged(compose.up()))),
    ];
    run_steps("Start", steps)?;

    let healthy = HealthChecker::new(config.health_specs()).check_all();
    info("=== ELK stack started ===");
    report_startup(config, healthy)
}

fn cmd_stop(config: &Config) -> Result<()> {
    info("=== Stopping the ELK stack ===");
    let compose = ComposeRunner::detect(&config.project_root)?;
    compose.down(false);
    info("=== ELK stack stopped ===");
    Ok(())
}

fn cmd_restart(config: &Config) -> Result<()> {
    info("=== Restarting the ELK stack ===");
    let compose = ComposeRunner::detect(&config.project_root)?;

    let steps: Vec<Step> = vec![
        ("prerequisite check", Box::new(|| check_prerequisites(config))),
        ("container shutdown", Box::new(|| compose.down(false))),
        ("image refresh", Box::new(|| compose.pull())),
        ("service startup", Box::new(|| logged(compose.up()))),
    ];
    run_steps("Restart", steps)?;

    let healthy = HealthChecker::new(config.health_specs()).check_all();
    info("=== Restart complete ===");
    report_startup(config, healthy)
}

fn cmd_logs(
    config: &Config,
    service: Option<&str>,
    follow: bool,
    tail: u32,
    status: bool,
) -> Result<()> {
    let compose = ComposeRunner::detect(&config.project_root)?;
    if status {
        compose.ps()
    } else {
        compose.logs(service, follow, tail)
    }
}

fn cmd_cleanup(config: &Config) -> Result<()> {
    info("=== ELK stack cleanup ===");
    info("The following can be cleaned up:");
    info("1. Stop and remove containers");
    info("2. Remove Docker volumes");
    info("3. Clear service data directories");
    println!();

    if !confirm("Proceed with cleanup?")? {
        info("Cleanup cancelled");
        return Ok(());
    }

    let compose = ComposeRunner::detect(&config.project_root)?;
    let remove_volumes = confirm("Also remove Docker volumes?")?;
    compose.down(remove_volumes);

    if confirm("Also clear the service data directories?")? {
        clean_data_directories(config);
    }

    success("=== Cleanup complete ===");
    Ok(())
}

fn cmd_backup(config: &Config, indices: Option<&[String]>) -> Result<()> {
    info("=== ELK stack backup ===");
    std::fs::create_dir_all(&config.backup_dir)?;

    match backup_manager(config).backup_full(indices) {
        Some(path) => {
            success(&format!("Backup complete: {}", path.display()));
            Ok(())
        }
        None => Err(Error::Other("Backup failed".to_string())),
    }
}

fn cmd_restore(
    config: &Config,
    snapshot_name: Option<String>,
    indices: Option<&[String]>,
) -> Result<()> {
    let name = snapshot_name
        .ok_or_else(|| Error::Other("restore requires --snapshot-name".to_string()))?;

    info("=== Restoring Elasticsearch snapshot ===");
    if backup_manager(config).restore(&name, indices) {
        success(&format!("Snapshot restore initiated: {}", name));
        Ok(())
    } else {
        Err(Error::Other("Snapshot restore failed".to_string()))
    }
}

fn cmd_kibana_export(config: &Config, output_file: Option<PathBuf>) -> Result<()> {
    info("=== Exporting Kibana saved objects ===");
    std::fs::create_dir_all(&config.backup_dir)?;

    match backup_manager(config).export_saved_objects(output_file.as_deref()) {
        Some(path) => {
            success(&format!("Export complete: {}", path.display()));
            Ok(())
        }
        None => Err(Error::Other("Saved-objects export failed".to_string())),
    }
}

fn cmd_kibana_import(
    config: &Config,
    backup_file: Option<PathBuf>,
    overwrite: bool,
) -> Result<()> {
    let file = backup_file.ok_or_else(|| {
        Error::Other("kibana-import-savedobject requires --backup-file".to_string())
    })?;

    info("=== Importing Kibana saved objects ===");
    if backup_manager(config).import_saved_objects(&file, overwrite) {
        success(&format!("Import complete: {}", file.display()));
        Ok(())
    } else {
        Err(Error::Other("Saved-objects import failed".to_string()))
    }
}

fn cmd_list_snapshots(config: &Config) -> Result<()> {
    info("=== Available snapshots ===");
    if backup_manager(config).list_snapshots().is_empty() {
        warn("No snapshots found");
    }
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_project_root(std::env::current_dir()?);

    match cli.command {
        Commands::Setup => cmd_setup(&config),
        Commands::Start => cmd_start(&config),
        Commands::Stop => cmd_stop(&config),
        Commands::Restart => cmd_restart(&config),
        Commands::Logs {
            service,
            follow,
            tail,
            status,
        } => cmd_logs(&config, service.as_deref(), follow, tail, status),
        Commands::Cleanup => cmd_cleanup(&config),
        Commands::Backup { indices } => cmd_backup(&config, indices.as_deref()),
        Commands::Restore {
            snapshot_name,
            indices,
        } => cmd_restore(&config, snapshot_name, indices.as_deref()),
        Commands::KibanaExportSavedobject { output_file } => {
            cmd_kibana_export(&config, output_file)
        }
        Commands::KibanaImportSavedobject {
            backup_file,
            overwrite,
        } => cmd_kibana_import(&config, backup_file, overwrite),
        Commands::ListSnapshots => cmd_list_snapshots(&config),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
